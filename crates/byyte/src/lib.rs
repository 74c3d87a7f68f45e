pub mod be;
pub mod counting;
pub mod peek;
pub mod vwi;

pub use be::{ByteReader, ByteWriter};
pub use counting::CountingWriter;
pub use peek::Peek;
