use crate::chapter::{render, Chapter};
use crate::compression::{Compression, CompressionStrategy};
use crate::error::{Error, Result};
use crate::exth_header::{EXTHHeader, ExthType, ExthValue};
use crate::index::{navigation_records, NavigationTable};
use crate::mobi_header::{MOBIHeader, MOBI_HEADER_LEN, NULL_INDEX};
use crate::palmdoc_header::{PalmDOCHeader, PALMDOC_HEADER_LEN};
use crate::text::{encode_records, split_records};
use byyte::be::ByteWriter;
use byyte::CountingWriter;
use palm_database::builder::PDBBuilder;
use rand::random;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Space kept for record 0 so metadata can be edited in place later.
const RECORD0_RESERVED: usize = 10 * 1024;
const EXTH_FLAGS: u32 = 0x50;
const MULTIBYTE_TRAILER: u32 = 1;
const DEFAULT_LOCALE: u32 = 1033;

pub fn fcis(text_length: u32) -> Result<Vec<u8>> {
    let mut data = vec![];
    data.write_all(b"FCIS")?;
    data.write_u32(20)?;
    data.write_u32(16)?;
    data.write_u32(1)?;
    data.write_u32(0)?;
    data.write_u32(text_length)?;
    data.write_u32(0)?;
    data.write_u32(32)?;
    data.write_u32(8)?;
    data.write_u16(1)?;
    data.write_u16(1)?;
    data.write_u32(0)?;
    Ok(data)
}

pub fn flis() -> Result<Vec<u8>> {
    let mut data = vec![];
    data.write_all(b"FLIS")?;
    data.write_u32(8)?;
    data.write_u16(65)?;
    data.write_u16(0)?;
    data.write_u32(0)?;
    data.write_u32(0xFFFFFFFF)?;
    data.write_u16(1)?;
    data.write_u16(3)?;
    data.write_u32(3)?;
    data.write_u32(1)?;
    data.write_u32(0xFFFFFFFF)?;
    Ok(data)
}

pub fn eof() -> Vec<u8> {
    vec![233, 142, 13, 10]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    pub compression: Compression,
    pub strategy: CompressionStrategy,
    /// Creation and modification time of the database. Defaults to now.
    pub timestamp: Option<chrono::NaiveDateTime>,
    /// Seed for the database unique id. Defaults to a random value.
    pub unique_id: Option<u32>,
    pub locale: u32,
    /// Compress text records on worker threads.
    pub parallel: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            compression: Compression::PalmDoc,
            strategy: CompressionStrategy::Fast,
            timestamp: None,
            unique_id: None,
            locale: DEFAULT_LOCALE,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone)]
struct Cover {
    image: Vec<u8>,
    thumbnail: Vec<u8>,
}

/// Assembles a book from chapters and metadata.
#[derive(Debug, Clone)]
pub struct MobiWriter {
    title: String,
    stylesheet: Option<String>,
    options: WriterOptions,
    chapters: Vec<Chapter>,
    exth: EXTHHeader,
    cover: Option<Cover>,
}

impl MobiWriter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            stylesheet: None,
            options: WriterOptions::default(),
            chapters: vec![],
            exth: EXTHHeader::default(),
            cover: None,
        }
    }

    pub fn title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = title.into();
        self
    }

    pub fn stylesheet(&mut self, css: impl Into<String>) -> &mut Self {
        self.stylesheet = Some(css.into());
        self
    }

    pub fn compression(&mut self, compression: Compression) -> &mut Self {
        self.options.compression = compression;
        self
    }

    pub fn strategy(&mut self, strategy: CompressionStrategy) -> &mut Self {
        self.options.strategy = strategy;
        self
    }

    pub fn options(&mut self, options: WriterOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Loads the cover and its thumbnail from disk.
    pub fn add_cover(&mut self, cover: impl AsRef<Path>, thumbnail: impl AsRef<Path>) -> Result<&mut Self> {
        let image = std::fs::read(cover)?;
        let thumbnail = std::fs::read(thumbnail)?;
        Ok(self.add_cover_bytes(image, thumbnail))
    }

    pub fn add_cover_bytes(&mut self, image: Vec<u8>, thumbnail: Vec<u8>) -> &mut Self {
        self.cover = Some(Cover { image, thumbnail });
        self
    }

    /// Appends a top-level chapter. Sub-chapters are added through the
    /// returned handle.
    ///
    /// Titles and payloads are UTF-8 text; the book is always written with
    /// the UTF-8 encoding, so byte payloads in other encodings are not
    /// accepted here.
    pub fn new_chapter(&mut self, title: impl Into<String>, html: impl Into<String>) -> &mut Chapter {
        let id = self.chapters.len();
        self.chapters.push(Chapter::new(id, title, html));
        &mut self.chapters[id]
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn add_exth(&mut self, record_type: ExthType, value: impl Into<ExthValue>) -> &mut Self {
        self.exth.add(record_type, value);
        self
    }

    /// Serializes the book. Returns the number of bytes written.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<u64> {
        let mut chapters = self.chapters.clone();
        let html = render(&mut chapters, self.stylesheet.as_deref());
        let text_length =
            u32::try_from(html.len()).map_err(|_| Error::Overflow("book text length"))?;

        let chunks = split_records(html.as_bytes())?;
        let text_record_count =
            u16::try_from(chunks.len()).map_err(|_| Error::Overflow("text record count"))?;
        let mut records = encode_records(
            chunks,
            self.options.compression,
            self.options.strategy,
            self.options.parallel,
        )?;
        // Record 0 is assembled last, once every index is known
        records.insert(0, Vec::new());

        let seed = self.options.unique_id.unwrap_or_else(random);
        let mut header = MOBIHeader::new(seed.wrapping_add(1));
        header.locale = self.options.locale;
        header.extra_record_data_flags = MULTIBYTE_TRAILER;
        header.exth_flags = EXTH_FLAGS;

        records.push(vec![0, 0]);
        header.first_non_book_index = records.len() as u32;

        if !chapters.is_empty() {
            let table = NavigationTable::build(&chapters)?;
            header.indx_record_offset = records.len() as u32;
            records.extend(navigation_records(&table)?);
        }

        let mut exth = self.exth.clone();
        match &self.cover {
            Some(cover) => {
                header.first_image_index = records.len() as u32;
                records.push(cover.image.clone());
                records.push(cover.thumbnail.clone());
                exth.add(ExthType::Kf8CoverUri, "kindle:embed:0001");
                exth.add(ExthType::CoverOffset, 0u32);
                exth.add(ExthType::ThumbOffset, 1u32);
            }
            None => header.first_image_index = NULL_INDEX,
        }

        let last_content = records.len() - 1;
        header.last_content_record_number =
            u16::try_from(last_content).map_err(|_| Error::Overflow("record count"))?;
        header.flis_record_number = records.len() as u32;
        records.push(flis()?);
        header.fcis_record_number = records.len() as u32;
        records.push(fcis(text_length)?);
        records.push(eof());

        header.full_name_offset = (PALMDOC_HEADER_LEN + MOBI_HEADER_LEN as usize + exth.padded_len()) as u32;
        header.full_name_length = self.title.len() as u32;

        let palmdoc = PalmDOCHeader::new(self.options.compression, text_length, text_record_count);
        let mut record0 = Vec::with_capacity(RECORD0_RESERVED);
        record0.write_all(&palmdoc.to_bytes()?)?;
        record0.write_all(&header.to_bytes()?)?;
        exth.write_to(&mut record0)?;
        record0.write_all(self.title.as_bytes())?;
        let extra = record0.len() % 4;
        record0.write_zeros(4 - extra)?;
        records[0] = record0;

        let timestamp = self
            .options
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().naive_utc());
        let mut builder = PDBBuilder::new()
            .name(database_name(&self.title))
            .creation_time(timestamp)
            .modification_time(timestamp)
            .type_("BOOK")
            .creator("MOBI")
            .unique_id_seed(seed);
        for (index, record) in records.iter().enumerate() {
            builder = if index == 0 {
                builder.add_reserved_record(0, record, RECORD0_RESERVED)
            } else {
                builder.add_record(0, record)
            };
        }
        let pdb = builder.build()?;

        debug!(
            title = %self.title,
            chapters = chapters.len(),
            text_records = text_record_count,
            records = records.len(),
            "writing book"
        );
        let mut output = CountingWriter::new(writer);
        Ok(pdb.write_to(&mut output)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.write_to(&mut data)?;
        Ok(data)
    }
}

/// Database names are limited to 31 bytes of letters, digits and dashes.
fn database_name(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .take(31)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mobi_header::EXTH_PRESENT;
    use palm_database::PDB;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn options() -> WriterOptions {
        WriterOptions {
            timestamp: chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
                .and_then(|date| date.and_hms_opt(12, 0, 0)),
            unique_id: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn fixed_records() {
        assert_eq!(flis().unwrap().len(), 36);
        assert_eq!(fcis(10).unwrap().len(), 44);
        assert_eq!(&fcis(10).unwrap()[20..24], [0, 0, 0, 10]);
        assert_eq!(eof(), [0xE9, 0x8E, 0x0D, 0x0A]);
    }

    #[test]
    fn database_names_are_sanitized() {
        assert_eq!(database_name("My Book: Vol. 2"), "My_Book__Vol__2");
        assert_eq!(database_name(&"x".repeat(40)).len(), 31);
    }

    #[test]
    fn record_layout_without_chapters() {
        let mut writer = MobiWriter::new("Empty");
        writer.options(options());
        let data = writer.to_bytes().unwrap();

        let mut cursor = Cursor::new(data);
        let pdb = PDB::from_reader(&mut cursor).unwrap();
        // record 0, one text record, filler, FLIS, FCIS, EOF
        assert_eq!(pdb.record_count(), 6);
        assert_eq!(pdb.header.name, "Empty");
        assert_eq!(pdb.header.unique_id_seed, 7);
        assert_eq!(pdb.record_len(0).unwrap() as usize, RECORD0_RESERVED);

        let record0 = pdb.read_record(&mut cursor, 0).unwrap();
        let mut reader = Cursor::new(&record0);
        let palmdoc = PalmDOCHeader::from_bytes(&mut reader).unwrap();
        assert_eq!(palmdoc.record_count, 1);
        let header = MOBIHeader::from_bytes(&mut reader).unwrap();
        assert_eq!(header.unique_id, 8);
        assert_eq!(header.indx_record_offset, NULL_INDEX);
        assert_eq!(header.first_image_index, NULL_INDEX);
        assert_eq!(header.first_non_book_index, 3);
        assert_eq!(header.last_content_record_number, 2);
        assert_eq!(header.flis_record_number, 3);
        assert_eq!(header.fcis_record_number, 4);
        assert_ne!(header.exth_flags & EXTH_PRESENT, 0);

        let name = header.full_name_offset as usize;
        assert_eq!(&record0[name..name + 5], b"Empty");
        assert_eq!(pdb.read_record(&mut cursor, 5).unwrap(), eof());
    }

    #[test]
    fn cover_adds_image_records_and_metadata() {
        let mut writer = MobiWriter::new("Covered");
        writer
            .options(options())
            .add_cover_bytes(b"cover".to_vec(), b"thumb".to_vec());
        writer.new_chapter("One", "<p>1</p>");
        let data = writer.to_bytes().unwrap();

        let mut cursor = Cursor::new(data);
        let pdb = PDB::from_reader(&mut cursor).unwrap();
        let record0 = pdb.read_record(&mut cursor, 0).unwrap();
        let mut reader = Cursor::new(&record0[PALMDOC_HEADER_LEN..]);
        let header = MOBIHeader::from_bytes(&mut reader).unwrap();
        let exth = EXTHHeader::from_bytes(&mut reader).unwrap();

        // text, filler, three index records
        assert_eq!(header.indx_record_offset, 3);
        assert_eq!(header.first_image_index, 6);
        assert_eq!(pdb.read_record(&mut cursor, 6).unwrap(), b"cover");
        assert_eq!(pdb.read_record(&mut cursor, 7).unwrap(), b"thumb");
        assert_eq!(
            exth.get(ExthType::Kf8CoverUri).map(|r| r.value()),
            Some(ExthValue::Text("kindle:embed:0001".to_owned()))
        );
        assert_eq!(
            exth.get(ExthType::ThumbOffset).map(|r| r.value()),
            Some(ExthValue::Numeric(1))
        );
    }
}
