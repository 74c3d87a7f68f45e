//! Reading and writing MOBI e-books.
//!
//! [`MobiWriter`] renders chapters into compressed text records and builds the
//! navigation index; [`MobiReader`] reverses the process.

pub mod chapter;
pub mod compression;
pub mod error;
pub mod exth_header;
pub mod index;
pub mod magic;
pub mod mobi_header;
pub mod mobi_reader;
pub mod mobi_writer;
pub mod palmdoc_header;
mod text;

pub use chapter::{Chapter, Placement, SubChapter};
pub use compression::{Compression, CompressionStrategy};
pub use error::{Error, Result};
pub use exth_header::{EXTHHeader, ExthType, ExthValue};
pub use magic::Magic;
pub use mobi_header::MOBIHeader;
pub use mobi_reader::{MobiReader, NcxEntry};
pub use mobi_writer::{MobiWriter, WriterOptions};
pub use palmdoc_header::PalmDOCHeader;
