//! Navigation entries for the table of contents.
//!
//! Entries are emitted in two passes: every top-level chapter in book order,
//! then the sub-chapters grouped by parent. Parents reference their children
//! by entry index, so this order fixes the child indices.

use super::indx::INDX_HEADER_LEN;
use super::tagx::EntryRole;
use crate::chapter::{Chapter, Placement};
use crate::error::{Error, Result};
use byyte::vwi;
use tracing::trace;

/// Encoded navigation entries together with their offset table and labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationTable {
    /// Concatenated entries, stored after the INDX header of the second index
    /// record.
    pub entries: Vec<u8>,
    /// Start of each entry relative to the start of its INDX record.
    pub offsets: Vec<u16>,
    /// Length prefixed chapter titles, referenced by label offset.
    pub labels: Vec<u8>,
    deep: bool,
}

impl NavigationTable {
    pub fn build(chapters: &[Chapter]) -> Result<Self> {
        let mut table = NavigationTable {
            deep: chapters.iter().any(|c| !c.sub_chapters().is_empty()),
            ..Default::default()
        };

        let top_level = chapters.len();
        let mut children_before = 0;
        for chapter in chapters {
            let children = chapter.sub_chapters().len();
            if children == 0 {
                table.push_entry(
                    EntryRole::Single,
                    chapter.placement(),
                    chapter.title(),
                    &[],
                )?;
            } else {
                let first = top_level + children_before;
                let last = first + children - 1;
                table.push_entry(
                    EntryRole::Parent,
                    chapter.placement(),
                    chapter.title(),
                    &[to_u32(first)?, to_u32(last)?],
                )?;
                children_before += children;
            }
        }

        for (parent, chapter) in chapters.iter().enumerate() {
            for sub in chapter.sub_chapters() {
                table.push_entry(
                    EntryRole::Child,
                    sub.placement(),
                    sub.title(),
                    &[to_u32(parent)?],
                )?;
            }
        }

        Ok(table)
    }

    fn push_entry(
        &mut self,
        role: EntryRole,
        placement: Placement,
        title: &str,
        links: &[u32],
    ) -> Result<()> {
        let index = self.offsets.len();
        let offset = u16::try_from(INDX_HEADER_LEN as usize + self.entries.len())
            .map_err(|_| Error::Overflow("navigation entry offset"))?;
        self.offsets.push(offset);

        let id = format!("{index:03}");
        self.entries.push(id.len() as u8);
        self.entries.extend_from_slice(id.as_bytes());
        self.entries.push(role.control_byte());

        let depth = match role {
            EntryRole::Child => 1,
            _ => 0,
        };
        vwi::encode_into(placement.offset, &mut self.entries);
        vwi::encode_into(placement.len, &mut self.entries);
        vwi::encode_into(to_u32(self.labels.len())?, &mut self.entries);
        vwi::encode_into(depth, &mut self.entries);
        for &link in links {
            vwi::encode_into(link, &mut self.entries);
        }

        vwi::encode_into(to_u32(title.len())?, &mut self.labels);
        self.labels.extend_from_slice(title.as_bytes());

        trace!(index, ?role, title, offset, "navigation entry");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Whether any entry has sub-entries.
    pub fn is_deep(&self) -> bool {
        self.deep
    }

    /// Length byte and id of the last entry.
    pub fn last_entry_id(&self) -> &[u8] {
        let Some(&offset) = self.offsets.last() else {
            return &[];
        };
        let start = offset as usize - INDX_HEADER_LEN as usize;
        let len = self.entries[start] as usize;
        &self.entries[start..start + 1 + len]
    }
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::Overflow("navigation value"))
}
