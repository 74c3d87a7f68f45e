use crate::error::{Error, Result};
use crate::magic::Magic;
use byyte::be::{ByteReader, ByteWriter};
use std::io::{Read, Seek, Write};
use tracing::trace;

const EXTH_FIXED_LEN: u32 = 12;
const RECORD_HEADER_LEN: u32 = 8;

/// Known EXTH record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExthType {
    Author,
    Publisher,
    Imprint,
    Description,
    Isbn,
    Subject,
    PublishingDate,
    Review,
    Contributor,
    Rights,
    Source,
    Asin,
    Kf8CoverUri,
    CoverOffset,
    ThumbOffset,
    CreatorSoftware,
    CdeType,
    UpdatedTitle,
    Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExthKind {
    Text,
    Numeric,
}

impl ExthType {
    const ALL: [ExthType; 19] = [
        ExthType::Author,
        ExthType::Publisher,
        ExthType::Imprint,
        ExthType::Description,
        ExthType::Isbn,
        ExthType::Subject,
        ExthType::PublishingDate,
        ExthType::Review,
        ExthType::Contributor,
        ExthType::Rights,
        ExthType::Source,
        ExthType::Asin,
        ExthType::Kf8CoverUri,
        ExthType::CoverOffset,
        ExthType::ThumbOffset,
        ExthType::CreatorSoftware,
        ExthType::CdeType,
        ExthType::UpdatedTitle,
        ExthType::Language,
    ];

    pub fn code(self) -> u32 {
        match self {
            ExthType::Author => 100,
            ExthType::Publisher => 101,
            ExthType::Imprint => 102,
            ExthType::Description => 103,
            ExthType::Isbn => 104,
            ExthType::Subject => 105,
            ExthType::PublishingDate => 106,
            ExthType::Review => 107,
            ExthType::Contributor => 108,
            ExthType::Rights => 109,
            ExthType::Source => 112,
            ExthType::Asin => 113,
            ExthType::Kf8CoverUri => 129,
            ExthType::CoverOffset => 201,
            ExthType::ThumbOffset => 202,
            ExthType::CreatorSoftware => 204,
            ExthType::CdeType => 501,
            ExthType::UpdatedTitle => 503,
            ExthType::Language => 524,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        ExthType::ALL.into_iter().find(|ty| ty.code() == code)
    }

    pub fn kind(self) -> ExthKind {
        match self {
            ExthType::CoverOffset | ExthType::ThumbOffset | ExthType::CreatorSoftware => {
                ExthKind::Numeric
            }
            _ => ExthKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExthValue {
    Text(String),
    Numeric(u32),
    Binary(Vec<u8>),
}

impl ExthValue {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ExthValue::Text(text) => text.as_bytes().to_vec(),
            ExthValue::Numeric(value) => value.to_be_bytes().to_vec(),
            ExthValue::Binary(data) => data.clone(),
        }
    }
}

impl From<&str> for ExthValue {
    fn from(value: &str) -> Self {
        ExthValue::Text(value.to_owned())
    }
}

impl From<String> for ExthValue {
    fn from(value: String) -> Self {
        ExthValue::Text(value)
    }
}

impl From<u32> for ExthValue {
    fn from(value: u32) -> Self {
        ExthValue::Numeric(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExthRecord {
    pub record_type: u32,
    pub data: Vec<u8>,
}

impl ExthRecord {
    pub fn new(record_type: ExthType, value: ExthValue) -> Self {
        ExthRecord {
            record_type: record_type.code(),
            data: value.to_bytes(),
        }
    }

    pub fn record_type(&self) -> Option<ExthType> {
        ExthType::from_code(self.record_type)
    }

    /// Interprets the payload according to the record type. Unknown types and
    /// payloads that do not fit their kind come back as binary.
    pub fn value(&self) -> ExthValue {
        match self.record_type().map(ExthType::kind) {
            Some(ExthKind::Numeric) => match <[u8; 4]>::try_from(self.data.as_slice()) {
                Ok(bytes) => ExthValue::Numeric(u32::from_be_bytes(bytes)),
                Err(_) => ExthValue::Binary(self.data.clone()),
            },
            Some(ExthKind::Text) => match String::from_utf8(self.data.clone()) {
                Ok(text) => ExthValue::Text(text),
                Err(_) => ExthValue::Binary(self.data.clone()),
            },
            None => ExthValue::Binary(self.data.clone()),
        }
    }

    fn len(&self) -> u32 {
        RECORD_HEADER_LEN + self.data.len() as u32
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EXTHHeader {
    pub records: Vec<ExthRecord>,
}

impl EXTHHeader {
    pub fn add(&mut self, record_type: ExthType, value: impl Into<ExthValue>) {
        self.records.push(ExthRecord::new(record_type, value.into()));
    }

    pub fn get(&self, record_type: ExthType) -> Option<&ExthRecord> {
        self.records
            .iter()
            .find(|record| record.record_type == record_type.code())
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Value of the length field: fixed header plus records, without the
    /// alignment padding.
    pub fn header_length(&self) -> u32 {
        EXTH_FIXED_LEN + self.records.iter().map(ExthRecord::len).sum::<u32>()
    }

    fn padding(&self) -> usize {
        (4 - self.header_length() as usize % 4) % 4
    }

    /// Bytes the block occupies in record 0, padding included.
    pub fn padded_len(&self) -> usize {
        self.header_length() as usize + self.padding()
    }

    pub fn from_bytes<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        Magic::Exth.expect(reader)?;

        let header_length = reader.read_u32()?;
        let record_count = reader.read_u32()?;

        let mut records = Vec::with_capacity(record_count as usize);
        for _ in 0..record_count {
            let record_type = reader.read_u32()?;
            let len = reader.read_u32()?;
            let data_len = len
                .checked_sub(RECORD_HEADER_LEN)
                .ok_or(Error::Truncated("EXTH record"))?;
            let data = reader.read_bytes(data_len as usize)?;

            trace!(record_type, len, "EXTH record");
            records.push(ExthRecord { record_type, data });
        }

        let header = EXTHHeader { records };
        if header.header_length() != header_length {
            trace!(
                declared = header_length,
                actual = header.header_length(),
                "EXTH length differs from its records"
            );
        }
        reader.seek_relative(header.padding() as i64)?;
        Ok(header)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(Magic::Exth.as_bytes())?;
        writer.write_u32(self.header_length())?;
        writer.write_u32(self.records.len() as u32)?;
        for record in &self.records {
            writer.write_u32(record.record_type)?;
            writer.write_u32(record.len())?;
            writer.write_all(&record.data)?;
        }
        writer.write_zeros(self.padding())?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(self.padded_len());
        self.write_to(&mut data)?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn layout_is_aligned() {
        let mut exth = EXTHHeader::default();
        exth.add(ExthType::Author, "Ann");
        exth.add(ExthType::CoverOffset, 0u32);

        assert_eq!(exth.header_length(), 12 + 11 + 12);
        assert_eq!(exth.padded_len(), 36);

        let data = exth.to_bytes().unwrap();
        assert_eq!(data.len(), 36);
        assert_eq!(&data[..12], b"EXTH\0\0\0\x23\0\0\0\x02");
        assert_eq!(&data[12..23], b"\0\0\0\x64\0\0\0\x0BAnn");
        assert_eq!(&data[23..35], b"\0\0\0\xC9\0\0\0\x0C\0\0\0\0");
        assert_eq!(data[35], 0);
    }

    #[test]
    fn reads_back_typed_values() {
        let mut exth = EXTHHeader::default();
        exth.add(ExthType::Publisher, "Press");
        exth.add(ExthType::ThumbOffset, 1u32);
        exth.records.push(ExthRecord {
            record_type: 999,
            data: vec![1, 2],
        });

        let mut cursor = Cursor::new(exth.to_bytes().unwrap());
        let read = EXTHHeader::from_bytes(&mut cursor).unwrap();
        assert_eq!(read, exth);
        assert_eq!(cursor.position() as usize, exth.padded_len());

        assert_eq!(
            read.get(ExthType::Publisher).unwrap().value(),
            ExthValue::Text("Press".to_owned())
        );
        assert_eq!(
            read.get(ExthType::ThumbOffset).unwrap().value(),
            ExthValue::Numeric(1)
        );
        assert_eq!(read.records[2].value(), ExthValue::Binary(vec![1, 2]));
        assert!(read.get(ExthType::Author).is_none());
    }

    #[test]
    fn type_codes_round_trip() {
        for ty in ExthType::ALL {
            assert_eq!(ExthType::from_code(ty.code()), Some(ty));
        }
        assert_eq!(ExthType::from_code(1), None);
        assert_eq!(ExthType::Kf8CoverUri.kind(), ExthKind::Text);
    }
}
