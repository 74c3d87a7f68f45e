use crate::magic::Magic;
use palm_database::PDBError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("palm database error: {0}")]
    Pdb(#[from] PDBError),

    #[error("expected {expected} magic, found {found:?}")]
    MagicMismatch { expected: Magic, found: Vec<u8> },

    #[error("TAGX header too short: {0} bytes")]
    TagxTooShort(u32),

    #[error("index record has entries but no TAGX table")]
    MissingTagx,

    #[error("{0} not implemented")]
    NotImplemented(&'static str),

    #[error("records are encrypted")]
    Encrypted,

    #[error("tag {tag}: consumed {consumed} value bytes, {declared} declared")]
    ValueBytesMismatch {
        tag: u8,
        consumed: usize,
        declared: usize,
    },

    #[error("chunk search of {len} bytes outside the 3..=10 range")]
    MalformedChunkRequest { len: usize },

    #[error("tail marker {marker} does not fit a record of {len} bytes")]
    MalformedTail { marker: u8, len: usize },

    #[error("back-reference distance {distance} at output position {position}")]
    InvalidBackReference { distance: usize, position: usize },

    #[error("data ends in the middle of {0}")]
    Truncated(&'static str),

    #[error("{0} does not fit its field")]
    Overflow(&'static str),

    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
