use crate::compression::{decompress, unpack, Compression};
use crate::error::{Error, Result};
use crate::exth_header::EXTHHeader;
use crate::index::{parse_index_record, IndexEntry, TagEntry};
use crate::magic::Magic;
use crate::mobi_header::{MOBIHeader, NULL_INDEX};
use crate::palmdoc_header::{PalmDOCHeader, PALMDOC_HEADER_LEN};
use byyte::vwi;
use palm_database::{PDBError, PDB};
use std::io::{Cursor, Read, Seek};
use tracing::debug;

/// Headers before this length carry no extra record data flags.
const EXTRA_FLAGS_MIN_HEADER_LEN: u32 = 0xE4;

/// A table of contents entry with its title resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NcxEntry {
    pub index: usize,
    pub title: String,
    pub offset: u32,
    pub len: u32,
    pub depth: u32,
    pub parent: Option<usize>,
    /// First and last child entry.
    pub children: Option<(usize, usize)>,
}

pub struct MobiReader<R> {
    reader: R,
    pdb: PDB,
    palmdoc_header: PalmDOCHeader,
    header: MOBIHeader,
    exth: Option<EXTHHeader>,
    title: String,
    compression: Compression,
    multibyte: bool,
    trailers: u32,
}

impl<R: Read + Seek> MobiReader<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let pdb = PDB::from_reader(&mut reader)?;
        let first_record = pdb.read_record(&mut reader, 0)?;
        let mut first_record_cursor = Cursor::new(first_record.as_slice());

        let palmdoc_header = PalmDOCHeader::from_bytes(&mut first_record_cursor)?;
        let compression = palmdoc_header.text_compression()?;
        let header = MOBIHeader::from_bytes(&mut first_record_cursor)?;

        let exth = if header.has_exth() {
            first_record_cursor.set_position(PALMDOC_HEADER_LEN as u64 + header.header_length as u64);
            Some(EXTHHeader::from_bytes(&mut first_record_cursor)?)
        } else {
            None
        };

        let start = header.full_name_offset as usize;
        let title = first_record
            .get(start..start + header.full_name_length as usize)
            .ok_or(Error::Truncated("full name"))?;
        let title = String::from_utf8(title.to_vec())?;

        let mut multibyte = false;
        let mut trailers = 0;
        if header.header_length >= EXTRA_FLAGS_MIN_HEADER_LEN {
            let flags = header.extra_record_data_flags & 0xFFFF;
            multibyte = flags & 1 == 1;
            trailers = (flags >> 1).count_ones();
        }

        debug!(
            %title,
            records = pdb.record_count(),
            text_records = palmdoc_header.record_count,
            ?compression,
            "opened book"
        );

        Ok(MobiReader {
            reader,
            pdb,
            palmdoc_header,
            header,
            exth,
            title,
            compression,
            multibyte,
            trailers,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn pdb(&self) -> &PDB {
        &self.pdb
    }

    pub fn palmdoc_header(&self) -> &PalmDOCHeader {
        &self.palmdoc_header
    }

    pub fn header(&self) -> &MOBIHeader {
        &self.header
    }

    pub fn exth(&self) -> Option<&EXTHHeader> {
        self.exth.as_ref()
    }

    /// Raw bytes of any record.
    pub fn record(&mut self, index: usize) -> Result<Vec<u8>> {
        Ok(self.pdb.read_record(&mut self.reader, index)?)
    }

    /// The magic a record starts with, if it is a known one.
    pub fn record_magic(&mut self, index: usize) -> Result<Option<Magic>> {
        Ok(Magic::identify(&self.record(index)?))
    }

    /// Decoded content of text record `n`, counting from 1. Trailing entries
    /// and the multibyte marker are removed.
    pub fn text_record(&mut self, n: usize) -> Result<Vec<u8>> {
        let count = self.palmdoc_header.record_count as usize;
        if n == 0 || n > count {
            return Err(PDBError::RecordOutOfRange { index: n, count }.into());
        }

        let mut bytes = self.record(n)?;
        for _ in 0..self.trailers {
            let (size, _) = vwi::decode(&bytes, false);
            let keep = bytes.len().saturating_sub(size as usize);
            bytes.truncate(keep);
        }

        let mut text = match (self.compression, self.multibyte) {
            (Compression::None, _) => bytes,
            (Compression::PalmDoc, true) => unpack(&bytes)?,
            (Compression::PalmDoc, false) => decompress(&bytes)?,
            (Compression::HuffCdic, _) => return Err(Error::NotImplemented("HUFF/CDIC")),
        };
        if self.multibyte {
            text.pop();
        }
        Ok(text)
    }

    /// The whole book text.
    pub fn text(&mut self) -> Result<String> {
        let mut text = Vec::with_capacity(self.palmdoc_header.text_length as usize);
        for n in 1..=self.palmdoc_header.record_count as usize {
            text.extend(self.text_record(n)?);
        }
        Ok(String::from_utf8(text)?)
    }

    fn index_record_number(&self) -> Option<usize> {
        match self.header.indx_record_offset {
            NULL_INDEX => None,
            offset => Some(offset as usize),
        }
    }

    /// Decoded navigation entries. Books without an index have none.
    pub fn index(&mut self) -> Result<Vec<IndexEntry>> {
        let Some(first) = self.index_record_number() else {
            return Ok(vec![]);
        };
        let summary = parse_index_record(&self.record(first)?, None)?;
        let entries = parse_index_record(&self.record(first + 1)?, summary.tagx.as_ref())?;
        Ok(entries.entries)
    }

    /// Navigation entries with their titles looked up in the label record.
    pub fn table_of_contents(&mut self) -> Result<Vec<NcxEntry>> {
        let Some(first) = self.index_record_number() else {
            return Ok(vec![]);
        };
        let entries = self.index()?;
        let labels = self.record(first + 2)?;

        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let label_offset = entry.value(TagEntry::NameOffset).unwrap_or(0) as usize;
                let children = entry
                    .value(TagEntry::Child1)
                    .zip(entry.value(TagEntry::ChildN))
                    .map(|(first, last)| (first as usize, last as usize));
                Ok(NcxEntry {
                    index,
                    title: read_label(&labels, label_offset)?,
                    offset: entry.value(TagEntry::Pos).unwrap_or(0),
                    len: entry.value(TagEntry::Len).unwrap_or(0),
                    depth: entry.value(TagEntry::Depth).unwrap_or(0),
                    parent: entry.value(TagEntry::Parent).map(|parent| parent as usize),
                    children,
                })
            })
            .collect()
    }
}

fn read_label(labels: &[u8], offset: usize) -> Result<String> {
    let data = labels.get(offset..).ok_or(Error::Truncated("label"))?;
    let (len, consumed) = vwi::decode(data, true);
    let text = data
        .get(consumed..consumed + len as usize)
        .ok_or(Error::Truncated("label"))?;
    Ok(String::from_utf8(text.to_vec())?)
}
