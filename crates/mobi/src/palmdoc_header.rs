use crate::compression::{Compression, RECORD_SIZE};
use crate::error::{Error, Result};
use byyte::be::{ByteReader, ByteWriter};

pub const PALMDOC_HEADER_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalmDOCHeader {
    pub compression: u16,
    pub text_length: u32,
    pub record_count: u16,
    pub record_size: u16,
    pub encryption_type: u16,
}

impl PalmDOCHeader {
    pub fn new(compression: Compression, text_length: u32, record_count: u16) -> Self {
        PalmDOCHeader {
            compression: compression.code(),
            text_length,
            record_count,
            record_size: RECORD_SIZE as u16,
            encryption_type: 0,
        }
    }

    pub fn from_bytes<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let compression = reader.read_u16()?;
        _ = reader.read_u16()?; // Reserved, usually 0
        let text_length = reader.read_u32()?;
        let record_count = reader.read_u16()?;
        let record_size = reader.read_u16()?;
        let encryption_type = reader.read_u16()?;
        _ = reader.read_u16()?; // Reserved, usually 0

        Ok(PalmDOCHeader {
            compression,
            text_length,
            record_count,
            record_size,
            encryption_type,
        })
    }

    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        let mut data = Vec::with_capacity(PALMDOC_HEADER_LEN);
        data.write_u16(self.compression)?;
        data.write_u16(0)?;
        data.write_u32(self.text_length)?;
        data.write_u16(self.record_count)?;
        data.write_u16(self.record_size)?;
        data.write_u16(self.encryption_type)?;
        data.write_u16(0)?;

        Ok(data)
    }

    /// The compression scheme of the text records. Encrypted books are
    /// refused.
    pub fn text_compression(&self) -> Result<Compression> {
        if self.encryption_type != 0 {
            return Err(Error::Encrypted);
        }
        Compression::from_code(self.compression).ok_or(Error::NotImplemented("unknown compression"))
    }
}
