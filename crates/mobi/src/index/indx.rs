use super::cncx::NavigationTable;
use super::tagx::Tagx;
use crate::error::{Error, Result};
use crate::magic::Magic;
use crate::mobi_header::{ENC_UTF8, NULL_INDEX};
use byyte::{ByteReader, ByteWriter};
use std::io::{Read, Write};

pub const INDX_HEADER_LEN: u32 = 192;
const UNKNOWN_BLOCK_LEN: usize = 108;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndxType {
    #[default]
    Normal,
    Inflection,
    Other(u32),
}

impl IndxType {
    pub fn code(self) -> u32 {
        match self {
            IndxType::Normal => 0,
            IndxType::Inflection => 2,
            IndxType::Other(code) => code,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            0 => IndxType::Normal,
            2 => IndxType::Inflection,
            code => IndxType::Other(code),
        }
    }
}

/// The fixed 192-byte header opening every INDX record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndxHeader {
    pub header_len: u32,
    pub unk0: u32,
    pub unk1: u32,
    pub indx_type: IndxType,
    pub idxt_offset: u32,
    pub idxt_count: u32,
    pub encoding: u32,
    pub unk2: u32,
    pub entry_count: u32,
    pub ordt_offset: u32,
    pub ligt_offset: u32,
    pub ligt_count: u32,
    pub cncx_records_count: u32,
    pub ordt_type: u32,
    pub ordt_entries: u32,
    pub ordt1_offset: u32,
    pub ordt2_offset: u32,
    pub tagx_offset: u32,
    pub unk4: u32,
    pub unk5: u32,
}

impl Default for IndxHeader {
    fn default() -> Self {
        IndxHeader {
            header_len: INDX_HEADER_LEN,
            unk0: 0,
            unk1: 0,
            indx_type: IndxType::Normal,
            idxt_offset: 0,
            idxt_count: 0,
            encoding: 0,
            unk2: 0,
            entry_count: 0,
            ordt_offset: 0,
            ligt_offset: 0,
            ligt_count: 0,
            cncx_records_count: 0,
            ordt_type: 0,
            ordt_entries: 0,
            ordt1_offset: 0,
            ordt2_offset: 0,
            tagx_offset: 0,
            unk4: 0,
            unk5: 0,
        }
    }
}

impl IndxHeader {
    /// Reads the header. The reader must be positioned at the magic.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let magic = reader.read_magic::<4>()?;
        if &magic != Magic::Indx.as_bytes() {
            return Err(Error::MagicMismatch {
                expected: Magic::Indx,
                found: magic.to_vec(),
            });
        }

        let header_len = reader.read_u32()?;
        let unk0 = reader.read_u32()?;
        let unk1 = reader.read_u32()?;
        let indx_type = IndxType::from_code(reader.read_u32()?);
        let idxt_offset = reader.read_u32()?;
        let idxt_count = reader.read_u32()?;
        let encoding = reader.read_u32()?;
        let unk2 = reader.read_u32()?;
        let entry_count = reader.read_u32()?;
        let ordt_offset = reader.read_u32()?;
        let ligt_offset = reader.read_u32()?;
        let ligt_count = reader.read_u32()?;
        let cncx_records_count = reader.read_u32()?;
        reader.read_bytes(UNKNOWN_BLOCK_LEN)?;
        let ordt_type = reader.read_u32()?;
        let ordt_entries = reader.read_u32()?;
        let ordt1_offset = reader.read_u32()?;
        let ordt2_offset = reader.read_u32()?;
        let tagx_offset = reader.read_u32()?;
        let unk4 = reader.read_u32()?;
        let unk5 = reader.read_u32()?;

        Ok(IndxHeader {
            header_len,
            unk0,
            unk1,
            indx_type,
            idxt_offset,
            idxt_count,
            encoding,
            unk2,
            entry_count,
            ordt_offset,
            ligt_offset,
            ligt_count,
            cncx_records_count,
            ordt_type,
            ordt_entries,
            ordt1_offset,
            ordt2_offset,
            tagx_offset,
            unk4,
            unk5,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(Magic::Indx.as_bytes())?;
        writer.write_u32(self.header_len)?;
        writer.write_u32(self.unk0)?;
        writer.write_u32(self.unk1)?;
        writer.write_u32(self.indx_type.code())?;
        writer.write_u32(self.idxt_offset)?;
        writer.write_u32(self.idxt_count)?;
        writer.write_u32(self.encoding)?;
        writer.write_u32(self.unk2)?;
        writer.write_u32(self.entry_count)?;
        writer.write_u32(self.ordt_offset)?;
        writer.write_u32(self.ligt_offset)?;
        writer.write_u32(self.ligt_count)?;
        writer.write_u32(self.cncx_records_count)?;
        writer.write_zeros(UNKNOWN_BLOCK_LEN)?;
        writer.write_u32(self.ordt_type)?;
        writer.write_u32(self.ordt_entries)?;
        writer.write_u32(self.ordt1_offset)?;
        writer.write_u32(self.ordt2_offset)?;
        writer.write_u32(self.tagx_offset)?;
        writer.write_u32(self.unk4)?;
        writer.write_u32(self.unk5)?;
        Ok(())
    }
}

/// The summary record: tag table plus the id of the last navigation entry.
pub fn build_indx1(table: &NavigationTable) -> Result<Vec<u8>> {
    let tagx = Tagx::navigation(table.is_deep()).to_bytes()?;
    let last_id = table.last_entry_id();
    let entry_count =
        u16::try_from(table.len()).map_err(|_| Error::Overflow("navigation entry count"))?;

    let padding = (last_id.len() + 2) % 4;
    let idxt_offset = INDX_HEADER_LEN as usize + tagx.len() + last_id.len() + 2 + padding;
    let entry_offset = u16::try_from(INDX_HEADER_LEN as usize + tagx.len())
        .map_err(|_| Error::Overflow("summary entry offset"))?;

    let header = IndxHeader {
        indx_type: IndxType::Inflection,
        idxt_offset: idxt_offset as u32,
        idxt_count: 1,
        encoding: ENC_UTF8,
        unk2: NULL_INDEX,
        entry_count: entry_count as u32,
        cncx_records_count: 1,
        tagx_offset: INDX_HEADER_LEN,
        ..Default::default()
    };

    let mut data = Vec::with_capacity(idxt_offset + 8);
    header.write_to(&mut data)?;
    data.extend_from_slice(&tagx);
    data.extend_from_slice(last_id);
    data.write_u16(entry_count)?;
    data.write_zeros(padding)?;
    data.extend_from_slice(Magic::Idxt.as_bytes());
    data.write_u16(entry_offset)?;
    data.write_zeros(2)?;
    Ok(data)
}

/// The entry record: every navigation entry followed by its offset table.
pub fn build_indx2(table: &NavigationTable) -> Result<Vec<u8>> {
    let idxt_offset = INDX_HEADER_LEN as usize + table.entries.len();
    let header = IndxHeader {
        unk1: 1,
        indx_type: IndxType::Normal,
        idxt_offset: idxt_offset as u32,
        idxt_count: table.len() as u32,
        encoding: NULL_INDEX,
        unk2: NULL_INDEX,
        ..Default::default()
    };

    let mut data = Vec::with_capacity(idxt_offset + 4 + 2 * table.len() + 4);
    header.write_to(&mut data)?;
    data.extend_from_slice(&table.entries);
    data.extend_from_slice(Magic::Idxt.as_bytes());
    for &offset in &table.offsets {
        data.write_u16(offset)?;
    }
    data.write_zeros((table.len() + 4) % 4)?;
    Ok(data)
}

/// Index records in container order: summary, entries, labels.
pub fn navigation_records(table: &NavigationTable) -> Result<[Vec<u8>; 3]> {
    Ok([
        build_indx1(table)?,
        build_indx2(table)?,
        table.labels.clone(),
    ])
}
