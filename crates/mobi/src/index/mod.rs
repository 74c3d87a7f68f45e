//! Navigation indices: the tag tables, entry encoding and INDX records that
//! make up a book's table of contents.

pub mod cncx;
pub mod decode;
pub mod indx;
pub mod tagx;

pub use cncx::NavigationTable;
pub use decode::{decode_entry, parse_index_record, IndexEntry, IndexRecord, IndexSummary, TagValues};
pub use indx::{build_indx1, build_indx2, navigation_records, IndxHeader, IndxType, INDX_HEADER_LEN};
pub use tagx::{control_bytes, EntryRole, TagEntry, Tagx, TagxEntry};
