use crate::error::{Error, Result};
use byyte::Peek;
use std::fmt;
use std::io::{Read, Seek, SeekFrom};

/// Identifiers found at the start of records and sub-records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Magic {
    Mobi,
    Exth,
    Huff,
    Cdic,
    Fdst,
    Idxt,
    Indx,
    Ligt,
    Ordt,
    Tagx,
    Font,
    Audi,
    Vide,
    Resc,
    Boundary,
}

impl Magic {
    pub const ALL: [Magic; 15] = [
        Magic::Mobi,
        Magic::Exth,
        Magic::Huff,
        Magic::Cdic,
        Magic::Fdst,
        Magic::Idxt,
        Magic::Indx,
        Magic::Ligt,
        Magic::Ordt,
        Magic::Tagx,
        Magic::Font,
        Magic::Audi,
        Magic::Vide,
        Magic::Resc,
        Magic::Boundary,
    ];

    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Magic::Mobi => b"MOBI",
            Magic::Exth => b"EXTH",
            Magic::Huff => b"HUFF",
            Magic::Cdic => b"CDIC",
            Magic::Fdst => b"FDST",
            Magic::Idxt => b"IDXT",
            Magic::Indx => b"INDX",
            Magic::Ligt => b"LIGT",
            Magic::Ordt => b"ORDT",
            Magic::Tagx => b"TAGX",
            Magic::Font => b"FONT",
            Magic::Audi => b"AUDI",
            Magic::Vide => b"VIDE",
            Magic::Resc => b"RESC",
            Magic::Boundary => b"BOUNDARY",
        }
    }

    /// Finds the magic `data` starts with, if any.
    pub fn identify(data: &[u8]) -> Option<Magic> {
        Magic::ALL
            .into_iter()
            .find(|magic| data.starts_with(magic.as_bytes()))
    }

    /// Consumes the magic from `reader`, failing with the bytes actually
    /// found when they differ.
    pub fn expect<R: Read + Seek>(self, reader: &mut R) -> Result<()> {
        let expected = self.as_bytes();
        if !reader.match_magic(expected)? {
            return Err(Error::MagicMismatch {
                expected: self,
                found: reader.peek(expected.len())?,
            });
        }
        reader.seek(SeekFrom::Current(expected.len() as i64))?;
        Ok(())
    }
}

impl fmt::Display for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}
