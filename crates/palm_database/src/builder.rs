use crate::{PDB, PDBError, PDBHeader, PDBRecord};
use chrono::Timelike;

/// Assembles a database in memory, assigning record offsets and ids.
pub struct PDBBuilder {
    name: Option<String>,
    attributes: u16,
    version: u16,
    creation_time: Option<chrono::NaiveDateTime>,
    modification_time: Option<chrono::NaiveDateTime>,
    modification_number: u32,
    type_: Option<String>,
    creator: Option<String>,
    unique_id_seed: u32,
    records: Vec<(u8, Vec<u8>, usize)>, // (attributes, data, reserved length)
}

impl Default for PDBBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PDBBuilder {
    pub fn new() -> Self {
        PDBBuilder {
            name: None,
            attributes: 0,
            version: 0,
            creation_time: None,
            modification_time: None,
            modification_number: 0,
            type_: None,
            creator: None,
            unique_id_seed: 0,
            records: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn attributes(mut self, attributes: u16) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    pub fn creation_time(mut self, time: chrono::NaiveDateTime) -> Self {
        self.creation_time = Some(time);
        self
    }

    pub fn modification_time(mut self, time: chrono::NaiveDateTime) -> Self {
        self.modification_time = Some(time);
        self
    }

    pub fn type_(mut self, type_: impl Into<String>) -> Self {
        self.type_ = Some(type_.into());
        self
    }

    pub fn creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    pub fn unique_id_seed(mut self, seed: u32) -> Self {
        self.unique_id_seed = seed;
        self
    }

    pub fn add_record(self, attributes: u8, data: &[u8]) -> Self {
        self.add_reserved_record(attributes, data, 0)
    }

    /// Adds a record that occupies at least `reserved` bytes in the file. The
    /// unused part is zero filled.
    pub fn add_reserved_record(mut self, attributes: u8, data: &[u8], reserved: usize) -> Self {
        self.records.push((attributes, data.to_vec(), reserved));
        self
    }

    pub fn build(self) -> Result<PDB, PDBError> {
        let name = self.name.ok_or(PDBError::MissingField("name".to_owned()))?;
        if name.len() > 31 {
            return Err(PDBError::InvalidData(
                "Name must be at most 31 bytes long".to_owned(),
            ));
        }
        let type_ = self.type_.ok_or(PDBError::MissingField("type".to_owned()))?;
        let creator = self.creator.ok_or(PDBError::MissingField("creator".to_owned()))?;
        if type_.len() != 4 || creator.len() != 4 {
            return Err(PDBError::InvalidData(
                "Type and creator must be exactly 4 bytes long".to_owned(),
            ));
        }
        let number_of_records = u16::try_from(self.records.len())
            .map_err(|_| PDBError::InvalidData("Too many records".to_owned()))?;

        // Timestamps are stored with second precision
        let now = chrono::Utc::now().naive_utc();
        let creation_time = self.creation_time.unwrap_or(now);
        let creation_time = creation_time.with_nanosecond(0).unwrap_or(creation_time);
        let modification_time = self.modification_time.unwrap_or(creation_time);
        let modification_time = modification_time
            .with_nanosecond(0)
            .unwrap_or(modification_time);

        let mut offset = PDB::records_start(self.records.len()) as u64;
        let mut records = Vec::with_capacity(self.records.len());
        for (index, (attributes, data, reserved)) in self.records.iter().enumerate() {
            let data_offset = u32::try_from(offset)
                .map_err(|_| PDBError::InvalidData("Database exceeds 4 GiB".to_owned()))?;
            records.push(PDBRecord {
                data_offset,
                attributes: *attributes,
                unique_id: index as u32,
            });
            offset += data.len().max(*reserved) as u64;
        }

        Ok(PDB {
            header: PDBHeader {
                name,
                attributes: self.attributes,
                version: self.version,
                creation_time,
                modification_time,
                last_backup_date: modification_time,
                modification_number: self.modification_number,
                app_info_id: 0,
                sort_info_id: 0,
                type_,
                creator,
                unique_id_seed: self.unique_id_seed,
                next_record_list_id: 0,
                number_of_records,
            },
            records,
            record_data: self.records.into_iter().map(|(_, data, _)| data).collect(),
            file_len: offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdb_builder() {
        let pdb = PDBBuilder::new()
            .name("test".to_owned())
            .attributes(0)
            .version(0)
            .type_("BOOK")
            .creator("MOBI")
            .add_record(0, b"Record 1 data")
            .add_record(1, b"Record 2 data")
            .build()
            .expect("Failed to build PDB");

        assert_eq!(pdb.header.name, "test");
        assert_eq!(pdb.header.number_of_records, 2);
        assert_eq!(pdb.records.len(), 2);
        assert_eq!(pdb.record_data.len(), 2);
        assert_eq!(pdb.record_data[0], b"Record 1 data");
        assert_eq!(pdb.record_data[1], b"Record 2 data");
        assert_eq!(pdb.records[0].data_offset, 78 + 16 + 2);
        assert_eq!(pdb.records[1].data_offset, 78 + 16 + 2 + 13);
        assert_eq!(pdb.records[1].attributes, 1);
        assert_eq!(pdb.records[1].unique_id, 1);
    }

    #[test]
    fn reserved_records_push_later_offsets() {
        let pdb = PDBBuilder::new()
            .name("reserve")
            .type_("BOOK")
            .creator("MOBI")
            .add_reserved_record(0, b"head", 100)
            .add_record(0, b"tail")
            .build()
            .unwrap();
        let start = PDB::records_start(2);
        assert_eq!(pdb.records[1].data_offset, start + 100);
        assert_eq!(pdb.file_len, (start + 104) as u64);
    }

    #[test]
    fn missing_fields_fail() {
        assert!(matches!(
            PDBBuilder::new().type_("BOOK").creator("MOBI").build(),
            Err(PDBError::MissingField(_))
        ));
        assert!(matches!(
            PDBBuilder::new().name("x").type_("BOOKS").creator("MOBI").build(),
            Err(PDBError::InvalidData(_))
        ));
    }
}
