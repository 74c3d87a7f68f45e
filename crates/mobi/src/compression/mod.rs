//! PalmDOC LZ77 compression.
//!
//! Records are compressed one at a time. Each uncompressed record ends with a
//! tail marker byte `t`: the `t` bytes before the marker, and the marker
//! itself, are stored verbatim after the compressed body.

pub mod lz77;
pub mod resolver;

use crate::error::{Error, Result};

pub use lz77::{decompress, pack, unpack};
pub use resolver::{ChunkMatch, LookupResolver, Resolver, TreeResolver};

/// Records hold at most this many bytes of text before their tail.
pub const RECORD_SIZE: usize = 4096;

/// Maximum back-reference distance, limited by the 11-bit offset field.
pub const WINDOW_SIZE: usize = 0x7FF;
pub const MIN_CHUNK_LEN: usize = 3;
pub const MAX_CHUNK_LEN: usize = 10;

/// Text record compression as stored in the PalmDOC header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    None,
    #[default]
    PalmDoc,
    HuffCdic,
}

impl Compression {
    pub fn code(self) -> u16 {
        match self {
            Compression::None => 1,
            Compression::PalmDoc => 2,
            Compression::HuffCdic => 17480,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Compression::None),
            2 => Some(Compression::PalmDoc),
            17480 => Some(Compression::HuffCdic),
            _ => None,
        }
    }
}

/// How back-references are searched for while packing.
///
/// Both strategies produce identical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionStrategy {
    /// Indexes every 3-byte prefix up front. Uses memory proportional to the
    /// record size.
    #[default]
    Fast,
    /// Scans the window backwards for every lookup. No extra memory.
    LowMemory,
}

/// A record buffer whose final byte is a valid tail marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedChunk {
    data: Vec<u8>,
}

impl MarkedChunk {
    /// Appends a marker declaring the last `tail_len` bytes of `body` as the
    /// uncompressed tail.
    pub fn new(mut body: Vec<u8>, tail_len: u8) -> Result<Self> {
        if tail_len as usize > body.len() {
            return Err(Error::MalformedTail {
                marker: tail_len,
                len: body.len() + 1,
            });
        }
        body.push(tail_len);
        Ok(MarkedChunk { data: body })
    }

    /// Wraps a buffer that already carries its marker.
    pub fn from_marked(data: Vec<u8>) -> Result<Self> {
        match data.last() {
            Some(&marker) if (marker as usize) < data.len() => Ok(MarkedChunk { data }),
            Some(&marker) => Err(Error::MalformedTail {
                marker,
                len: data.len(),
            }),
            None => Err(Error::MalformedTail { marker: 0, len: 0 }),
        }
    }

    pub fn tail_len(&self) -> usize {
        self.data[self.data.len() - 1] as usize
    }

    /// Splits into the compressible body and the verbatim tail (marker
    /// included).
    pub fn split(&self) -> (&[u8], &[u8]) {
        self.data.split_at(self.data.len() - 1 - self.tail_len())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_chunk_splits_tail() {
        let chunk = MarkedChunk::new(b"hello world".to_vec(), 3).unwrap();
        assert_eq!(chunk.as_bytes().last(), Some(&3));
        let (body, tail) = chunk.split();
        assert_eq!(body, b"hello wo");
        assert_eq!(tail, b"rld\x03");
    }

    #[test]
    fn unmarked_buffers_are_rejected() {
        assert!(MarkedChunk::new(b"ab".to_vec(), 3).is_err());
        assert!(MarkedChunk::from_marked(vec![]).is_err());
        assert!(MarkedChunk::from_marked(b"ab\x05".to_vec()).is_err());
        assert!(MarkedChunk::from_marked(b"ab\x02".to_vec()).is_ok());
    }

    #[test]
    fn compression_codes() {
        assert_eq!(Compression::default().code(), 2);
        assert_eq!(Compression::from_code(1), Some(Compression::None));
        assert_eq!(Compression::from_code(17480), Some(Compression::HuffCdic));
        assert_eq!(Compression::from_code(3), None);
    }
}
