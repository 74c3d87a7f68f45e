//! Tag tables describing which values an index entry carries and how their
//! presence is packed into control bytes.

use crate::error::{Error, Result};
use crate::magic::Magic;
use byyte::{ByteReader, ByteWriter};
use std::io::{Read, Seek, Write};

/// Fixed part of a TAGX block: magic, header length and control byte count.
pub const TAGX_FIXED_LEN: u32 = 12;

/// Meaning of a tag id in navigation indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TagEntry {
    End = 0,
    Pos = 1,
    Len = 2,
    NameOffset = 3,
    Depth = 4,
    KindOffset = 5,
    PosFid = 6,
    Parent = 21,
    Child1 = 22,
    ChildN = 23,
    ImageIndex = 69,
    DescOffset = 70,
    AuthorOffset = 71,
    ImageCaptionOffset = 72,
    ImgAttrOffset = 73,
}

impl TagEntry {
    pub fn from_u8(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => TagEntry::End,
            1 => TagEntry::Pos,
            2 => TagEntry::Len,
            3 => TagEntry::NameOffset,
            4 => TagEntry::Depth,
            5 => TagEntry::KindOffset,
            6 => TagEntry::PosFid,
            21 => TagEntry::Parent,
            22 => TagEntry::Child1,
            23 => TagEntry::ChildN,
            69 => TagEntry::ImageIndex,
            70 => TagEntry::DescOffset,
            71 => TagEntry::AuthorOffset,
            72 => TagEntry::ImageCaptionOffset,
            73 => TagEntry::ImgAttrOffset,
            _ => return None,
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            TagEntry::End => "End",
            TagEntry::Pos => "Offset",
            TagEntry::Len => "Length",
            TagEntry::NameOffset => "Label",
            TagEntry::Depth => "Depth",
            TagEntry::KindOffset => "Kind",
            TagEntry::PosFid => "Pos:Fid",
            TagEntry::Parent => "Parent",
            TagEntry::Child1 => "First Child",
            TagEntry::ChildN => "Last Child",
            TagEntry::ImageIndex => "Image Index",
            TagEntry::DescOffset => "Description",
            TagEntry::AuthorOffset => "Author",
            TagEntry::ImageCaptionOffset => "Image Caption Offset",
            TagEntry::ImgAttrOffset => "Image Attr Offset",
        }
    }

    /// Descriptor used for this tag by navigation indices, if it has one.
    pub fn descriptor(self) -> Option<TagxEntry> {
        let (num_values, mask, end) = match self {
            TagEntry::Pos => (1, 0x01, 0),
            TagEntry::Len => (1, 0x02, 0),
            TagEntry::NameOffset => (1, 0x04, 0),
            TagEntry::Depth => (1, 0x08, 0),
            TagEntry::Parent => (1, 0x10, 0),
            TagEntry::Child1 => (1, 0x20, 0),
            TagEntry::ChildN => (1, 0x40, 0),
            TagEntry::PosFid => (2, 0x80, 0),
            TagEntry::End => (0, 0, 1),
            _ => return None,
        };
        Some(TagxEntry {
            tag: self as u8,
            num_values,
            mask,
            end,
        })
    }
}

/// One 4-byte descriptor of a TAGX table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagxEntry {
    pub tag: u8,
    pub num_values: u8,
    pub mask: u8,
    /// 1 when this descriptor closes the current control byte.
    pub end: u8,
}

impl TagxEntry {
    pub const END: TagxEntry = TagxEntry {
        tag: 0,
        num_values: 0,
        mask: 0,
        end: 1,
    };

    pub fn is_end(&self) -> bool {
        self.end == 1
    }

    pub fn entry(&self) -> Option<TagEntry> {
        TagEntry::from_u8(self.tag)
    }
}

/// Position of a navigation entry in the chapter tree, which decides the tags
/// it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRole {
    /// A top-level chapter without sub-chapters.
    Single,
    /// A top-level chapter with sub-chapters.
    Parent,
    /// A sub-chapter.
    Child,
}

impl EntryRole {
    pub fn tags(self) -> &'static [TagEntry] {
        use TagEntry::*;
        match self {
            EntryRole::Single => &[Pos, Len, NameOffset, Depth, End],
            EntryRole::Parent => &[Pos, Len, NameOffset, Depth, Child1, ChildN, End],
            EntryRole::Child => &[Pos, Len, NameOffset, Depth, Parent, End],
        }
    }

    pub fn control_byte(self) -> u8 {
        let descriptors: Vec<TagxEntry> = self
            .tags()
            .iter()
            .filter_map(|tag| tag.descriptor())
            .collect();
        control_bytes(&descriptors).first().copied().unwrap_or(0)
    }
}

/// Packs the presence bits for `tags`. Every END descriptor closes the byte
/// being built and starts a new one.
pub fn control_bytes(tags: &[TagxEntry]) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut current = 0u8;
    for tag in tags {
        if tag.is_end() {
            bytes.push(current);
            current = 0;
            continue;
        }
        let count = 1u8.checked_div(tag.num_values).unwrap_or(0);
        current |= tag.mask & (count << tag.mask.trailing_zeros());
    }
    bytes
}

/// A decoded or to-be-written TAGX block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tagx {
    pub control_byte_count: u32,
    pub tags: Vec<TagxEntry>,
}

impl Tagx {
    /// Table for navigation indices. Books with sub-chapters need the parent
    /// and child link tags.
    pub fn navigation(deep: bool) -> Self {
        use TagEntry::*;
        let tags: &[TagEntry] = if deep {
            &[Pos, Len, NameOffset, Depth, Parent, Child1, ChildN, End]
        } else {
            &[Pos, Len, NameOffset, Depth, End]
        };
        Tagx {
            control_byte_count: 1,
            tags: tags.iter().filter_map(|tag| tag.descriptor()).collect(),
        }
    }

    pub fn header_len(&self) -> u32 {
        TAGX_FIXED_LEN + 4 * self.tags.len() as u32
    }

    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        Magic::Tagx.expect(reader)?;
        let header_len = reader.read_u32()?;
        if header_len < TAGX_FIXED_LEN {
            return Err(Error::TagxTooShort(header_len));
        }
        let control_byte_count = reader.read_u32()?;

        let count = (header_len - TAGX_FIXED_LEN) / 4;
        let mut tags = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let [tag, num_values, mask, end] = reader.read_magic::<4>()?;
            tags.push(TagxEntry {
                tag,
                num_values,
                mask,
                end,
            });
        }

        Ok(Tagx {
            control_byte_count,
            tags,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(Magic::Tagx.as_bytes())?;
        writer.write_u32(self.header_len())?;
        writer.write_u32(self.control_byte_count)?;
        for tag in &self.tags {
            writer.write_all(&[tag.tag, tag.num_values, tag.mask, tag.end])?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(self.header_len() as usize);
        self.write_to(&mut data)?;
        Ok(data)
    }
}
