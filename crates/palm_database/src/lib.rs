use byyte::{ByteReader, ByteWriter, CountingWriter};
use std::io::{Read, Seek, SeekFrom, Write};
use thiserror::Error;
use timestamp::{from_palm_timestamp, to_palm_timestamp};
use tracing::debug;

pub mod builder;
pub mod timestamp;

pub use builder::PDBBuilder;

/// Size of the fixed database header.
pub const PDB_HEADER_LEN: u32 = 78;
/// Size of one entry in the record offset list.
pub const RECORD_ENTRY_LEN: u32 = 8;
/// Two zero bytes separate the record list from the first record.
pub const RECORD_LIST_GAP: u32 = 2;

#[derive(Debug, Error)]
pub enum PDBError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("missing field: {0}")]
    MissingField(String),
    #[error("database holds no records")]
    NoRecords,
    #[error("record index {index} out of range ({count} records)")]
    RecordOutOfRange { index: usize, count: usize },
}

pub type Result<T> = std::result::Result<T, PDBError>;

#[derive(Debug, Clone, PartialEq)]
pub struct PDBHeader {
    pub name: String,
    pub attributes: u16,
    pub version: u16,
    pub creation_time: chrono::NaiveDateTime,
    pub modification_time: chrono::NaiveDateTime,
    pub last_backup_date: chrono::NaiveDateTime,
    pub modification_number: u32,
    pub app_info_id: u32,
    pub sort_info_id: u32,
    pub type_: String,
    pub creator: String,
    pub unique_id_seed: u32,
    pub next_record_list_id: u32,
    pub number_of_records: u16,
}

impl PDBHeader {
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let name = reader.read_string(32)?;

        let attributes = reader.read_u16()?;
        let version = reader.read_u16()?;
        let creation_time = from_palm_timestamp(reader.read_u32()?)?;
        let modification_time = from_palm_timestamp(reader.read_u32()?)?;
        let last_backup_date = from_palm_timestamp(reader.read_u32()?)?;
        let modification_number = reader.read_u32()?;
        let app_info_id = reader.read_u32()?;
        let sort_info_id = reader.read_u32()?;
        let type_ = reader.read_string(4)?;
        let creator = reader.read_string(4)?;
        let unique_id_seed = reader.read_u32()?;
        let next_record_list_id = reader.read_u32()?;
        let number_of_records = reader.read_u16()?;

        Ok(PDBHeader {
            name,
            attributes,
            version,
            creation_time,
            modification_time,
            last_backup_date,
            modification_number,
            app_info_id,
            sort_info_id,
            type_,
            creator,
            unique_id_seed,
            next_record_list_id,
            number_of_records,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        // The name field is NUL terminated, so at most 31 bytes of it are used.
        writer.write_fixed_str(&self.name, 31)?;
        writer.write_u8(0)?;
        writer.write_u16(self.attributes)?;
        writer.write_u16(self.version)?;
        writer.write_u32(to_palm_timestamp(self.creation_time)?)?;
        writer.write_u32(to_palm_timestamp(self.modification_time)?)?;
        writer.write_u32(to_palm_timestamp(self.last_backup_date)?)?;
        writer.write_u32(self.modification_number)?;
        writer.write_u32(self.app_info_id)?;
        writer.write_u32(self.sort_info_id)?;
        writer.write_fixed_str(&self.type_, 4)?;
        writer.write_fixed_str(&self.creator, 4)?;
        writer.write_u32(self.unique_id_seed)?;
        writer.write_u32(self.next_record_list_id)?;
        writer.write_u16(self.number_of_records)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PDBRecord {
    pub data_offset: u32,
    pub attributes: u8,
    /// Stored on disk as a 24-bit big-endian integer.
    pub unique_id: u32,
}

impl PDBRecord {
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let data_offset = reader.read_u32()?;
        let attributes = reader.read_u8()?;
        let id = reader.read_magic::<3>()?;

        Ok(PDBRecord {
            data_offset,
            attributes,
            unique_id: u32::from_be_bytes([0, id[0], id[1], id[2]]),
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32(self.data_offset)?;
        writer.write_u8(self.attributes)?;
        writer.write_all(&self.unique_id.to_be_bytes()[1..])?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PDB {
    pub header: PDBHeader,
    pub records: Vec<PDBRecord>,
    /// Record payloads, only populated for databases assembled in memory.
    pub record_data: Vec<Vec<u8>>,
    /// Total size of the source file, used to size the last record.
    pub file_len: u64,
}

impl PDB {
    /// Reads the header and the record offset list, leaving the reader
    /// positioned at the start of the first record's area.
    pub fn from_reader<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let header = PDBHeader::from_reader(reader)?;
        if header.number_of_records < 1 {
            return Err(PDBError::NoRecords);
        }

        let mut records = Vec::with_capacity(header.number_of_records as usize);
        for _ in 0..header.number_of_records {
            records.push(PDBRecord::from_reader(reader)?);
        }

        // After the record list there's a 2 byte gap
        let list_end = reader.seek(SeekFrom::Current(RECORD_LIST_GAP as i64))?;
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(list_end))?;

        debug!(
            name = %header.name,
            records = records.len(),
            file_len,
            "read palm database header"
        );

        Ok(PDB {
            header,
            records,
            record_data: vec![],
            file_len,
        })
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Offset of the first record when `count` records are listed.
    pub fn records_start(count: usize) -> u32 {
        PDB_HEADER_LEN + RECORD_ENTRY_LEN * count as u32 + RECORD_LIST_GAP
    }

    /// Byte length of record `index`: the distance to the next record, or to
    /// the end of the file for the last one.
    pub fn record_len(&self, index: usize) -> Result<u32> {
        let record = self.records.get(index).ok_or(PDBError::RecordOutOfRange {
            index,
            count: self.records.len(),
        })?;
        let end = match self.records.get(index + 1) {
            Some(next) => next.data_offset as u64,
            None => self.file_len,
        };
        end.checked_sub(record.data_offset as u64)
            .and_then(|len| u32::try_from(len).ok())
            .ok_or_else(|| PDBError::InvalidData(format!("record {index} has a negative length")))
    }

    /// Positions `reader` at the start of record `index` and returns its length.
    pub fn offset_to_record<R: Seek>(&self, reader: &mut R, index: usize) -> Result<u32> {
        let len = self.record_len(index)?;
        reader.seek(SeekFrom::Start(self.records[index].data_offset as u64))?;
        Ok(len)
    }

    pub fn read_record<R: Read + Seek>(&self, reader: &mut R, index: usize) -> Result<Vec<u8>> {
        let len = self.offset_to_record(reader, index)?;
        Ok(reader.read_bytes(len as usize)?)
    }

    /// Serializes the header, the offset list and every record payload.
    ///
    /// Records are placed at their listed offsets; any space between the end
    /// of one payload and the next offset is zero filled.
    pub fn write_to<W: Write>(&self, writer: &mut CountingWriter<W>) -> Result<u64> {
        if self.records.len() != self.record_data.len() {
            return Err(PDBError::InvalidData(format!(
                "{} offsets listed for {} records",
                self.records.len(),
                self.record_data.len()
            )));
        }

        self.header.write_to(writer)?;
        for record in &self.records {
            record.write_to(writer)?;
        }
        writer.pad(RECORD_LIST_GAP as usize)?;

        for (record, data) in self.records.iter().zip(&self.record_data) {
            writer.seek_forward_to(record.data_offset as u64)?;
            if writer.written() != record.data_offset as u64 {
                return Err(PDBError::InvalidData(format!(
                    "record offset {} already passed",
                    record.data_offset
                )));
            }
            writer.write_all(data)?;
        }

        debug!(
            records = self.records.len(),
            bytes = writer.written(),
            "wrote palm database"
        );
        Ok(writer.written())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn sample() -> PDB {
        PDBBuilder::new()
            .name("sample")
            .type_("BOOK")
            .creator("MOBI")
            .add_record(0, b"first")
            .add_record(0, b"second record")
            .add_record(0, b"x")
            .build()
            .unwrap()
    }

    #[test]
    fn header_is_78_bytes() {
        let mut data = Vec::new();
        sample().header.write_to(&mut data).unwrap();
        assert_eq!(data.len(), PDB_HEADER_LEN as usize);
        assert_eq!(&data[60..68], b"BOOKMOBI");
    }

    #[test]
    fn write_then_read_records() {
        let pdb = sample();
        let mut writer = CountingWriter::new(Vec::new());
        pdb.write_to(&mut writer).unwrap();
        let bytes = writer.into_inner();

        let mut cursor = Cursor::new(bytes);
        let read = PDB::from_reader(&mut cursor).unwrap();
        assert_eq!(read.header, pdb.header);
        assert_eq!(read.records, pdb.records);
        assert_eq!(read.records[0].data_offset, PDB::records_start(3));

        assert_eq!(read.read_record(&mut cursor, 0).unwrap(), b"first");
        assert_eq!(read.read_record(&mut cursor, 1).unwrap(), b"second record");
        assert_eq!(read.offset_to_record(&mut cursor, 2).unwrap(), 1);
        assert_eq!(read.read_record(&mut cursor, 2).unwrap(), b"x");
    }

    #[test]
    fn out_of_range_record_is_reported() {
        let pdb = sample();
        let mut writer = CountingWriter::new(Vec::new());
        pdb.write_to(&mut writer).unwrap();
        let mut cursor = Cursor::new(writer.into_inner());
        let read = PDB::from_reader(&mut cursor).unwrap();
        assert!(matches!(
            read.read_record(&mut cursor, 3),
            Err(PDBError::RecordOutOfRange { index: 3, count: 3 })
        ));
    }

    #[test]
    fn empty_database_is_rejected() {
        let pdb = PDBBuilder::new()
            .name("empty")
            .type_("BOOK")
            .creator("MOBI")
            .build()
            .unwrap();
        let mut data = Vec::new();
        pdb.header.write_to(&mut data).unwrap();
        data.extend_from_slice(&[0, 0]);
        assert!(matches!(
            PDB::from_reader(&mut Cursor::new(data)),
            Err(PDBError::NoRecords)
        ));
    }
}
