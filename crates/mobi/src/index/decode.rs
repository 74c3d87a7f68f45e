//! Reading INDX records back into tagged entries.

use super::indx::{IndxHeader, IndxType};
use super::tagx::{TagEntry, Tagx};
use crate::error::{Error, Result};
use crate::magic::Magic;
use crate::mobi_header::ENC_UTF16;
use byyte::{vwi, ByteReader};
use std::io::{Cursor, Seek, SeekFrom};
use tracing::{debug, trace};

/// Id and entry count stored after the tag table of a summary record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub id: String,
    pub entry_count: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagValues {
    pub tag: u8,
    pub values: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub label: String,
    pub control_bytes: Vec<u8>,
    pub tags: Vec<TagValues>,
}

impl IndexEntry {
    pub fn values(&self, tag: TagEntry) -> Option<&[u32]> {
        self.tags
            .iter()
            .find(|values| values.tag == tag as u8)
            .map(|values| values.values.as_slice())
    }

    /// First value of `tag`, if the entry carries it.
    pub fn value(&self, tag: TagEntry) -> Option<u32> {
        self.values(tag).and_then(|values| values.first().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub header: IndxHeader,
    pub tagx: Option<Tagx>,
    pub summary: Option<IndexSummary>,
    pub offsets: Vec<u16>,
    pub entries: Vec<IndexEntry>,
}

/// Parses one INDX record.
///
/// Entry records usually carry no tag table of their own; `inherited` is the
/// table of the summary record that precedes them.
pub fn parse_index_record(data: &[u8], inherited: Option<&Tagx>) -> Result<IndexRecord> {
    let mut reader = Cursor::new(data);
    let header = IndxHeader::read_from(&mut reader)?;

    let mut tagx = None;
    let mut summary = None;
    if header.tagx_offset != 0 {
        reader.seek(SeekFrom::Start(header.tagx_offset as u64))?;
        tagx = Some(Tagx::read_from(&mut reader)?);

        if header.cncx_records_count > 0 {
            let len = reader.read_u8()? as usize;
            let id = String::from_utf8(reader.read_bytes(len)?)?;
            let entry_count = reader.read_u16()?;
            summary = Some(IndexSummary { id, entry_count });
        }
    }

    if header.encoding == ENC_UTF16 {
        return Err(Error::NotImplemented("UTF-16 index"));
    }
    if header.ordt_entries > 0 {
        return Err(Error::NotImplemented("ORDT"));
    }
    if header.ligt_count > 0 {
        return Err(Error::NotImplemented("LIGT"));
    }

    let mut offsets = Vec::with_capacity(header.idxt_count as usize);
    if header.idxt_count > 0 {
        reader.seek(SeekFrom::Start(header.idxt_offset as u64))?;
        Magic::Idxt.expect(&mut reader)?;
        for _ in 0..header.idxt_count {
            offsets.push(reader.read_u16()?);
        }
    }

    let mut entries = Vec::new();
    if header.indx_type == IndxType::Normal && !offsets.is_empty() {
        let table = tagx.as_ref().or(inherited).ok_or(Error::MissingTagx)?;
        for (i, &start) in offsets.iter().enumerate() {
            let end = offsets
                .get(i + 1)
                .map_or(header.idxt_offset as usize, |&next| next as usize);
            let slice = data
                .get(start as usize..end)
                .ok_or(Error::Truncated("index entry"))?;
            entries.push(parse_entry(slice, table)?);
        }
    }

    debug!(
        kind = ?header.indx_type,
        entries = entries.len(),
        offsets = offsets.len(),
        "parsed index record"
    );
    Ok(IndexRecord {
        header,
        tagx,
        summary,
        offsets,
        entries,
    })
}

fn parse_entry(slice: &[u8], tagx: &Tagx) -> Result<IndexEntry> {
    let (&len, rest) = slice
        .split_first()
        .ok_or(Error::Truncated("entry label"))?;
    let label = rest
        .get(..len as usize)
        .ok_or(Error::Truncated("entry label"))?;
    let (control_bytes, tags) = decode_entry(&rest[len as usize..], tagx)?;
    Ok(IndexEntry {
        label: String::from_utf8(label.to_vec())?,
        control_bytes,
        tags,
    })
}

/// How many values a tag contributes to one entry.
enum Amount {
    Count(usize),
    Bytes(usize),
}

/// Decodes the control bytes and tagged values of one entry.
pub fn decode_entry(data: &[u8], tagx: &Tagx) -> Result<(Vec<u8>, Vec<TagValues>)> {
    let count = tagx.control_byte_count as usize;
    let control_bytes = data
        .get(..count)
        .ok_or(Error::Truncated("control bytes"))?
        .to_vec();
    let mut data = &data[count..];

    let mut present = Vec::new();
    let mut cb_index = 0;
    for tag in &tagx.tags {
        if tag.is_end() {
            cb_index += 1;
            continue;
        }
        let control = *control_bytes
            .get(cb_index)
            .ok_or(Error::Truncated("control bytes"))?;
        let value = control & tag.mask;
        if value == 0 {
            continue;
        }

        let amount = if value == tag.mask {
            if tag.mask.count_ones() > 1 {
                let (bytes, _) = read_varint(&mut data)?;
                Amount::Bytes(bytes as usize)
            } else {
                Amount::Count(1)
            }
        } else {
            Amount::Count((value >> tag.mask.trailing_zeros()) as usize)
        };
        present.push((tag, amount));
    }

    let mut tags = Vec::with_capacity(present.len());
    for (tag, amount) in present {
        let mut values = Vec::new();
        match amount {
            Amount::Count(count) => {
                for _ in 0..count * tag.num_values as usize {
                    values.push(read_varint(&mut data)?.0);
                }
            }
            Amount::Bytes(declared) => {
                let mut consumed = 0;
                while consumed < declared {
                    let (value, len) = read_varint(&mut data)?;
                    values.push(value);
                    consumed += len;
                }
                if consumed != declared {
                    return Err(Error::ValueBytesMismatch {
                        tag: tag.tag,
                        consumed,
                        declared,
                    });
                }
            }
        }
        trace!(tag = tag.tag, ?values, "tag values");
        tags.push(TagValues {
            tag: tag.tag,
            values,
        });
    }

    Ok((control_bytes, tags))
}

fn read_varint(data: &mut &[u8]) -> Result<(u32, usize)> {
    if data.is_empty() {
        return Err(Error::Truncated("tag value"));
    }
    let (value, len) = vwi::decode(data, true);
    *data = &data[len..];
    Ok((value, len))
}
