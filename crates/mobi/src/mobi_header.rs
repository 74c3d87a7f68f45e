use crate::error::Result;
use crate::magic::Magic;
use byyte::be::{ByteReader, ByteWriter};
use std::io::{Cursor, Read, Seek, Write};

pub const NULL_INDEX: u32 = 0xFFFFFFFF;
pub const MOBI_HEADER_LEN: u32 = 232;

pub const ENC_CP1252: u32 = 1252;
pub const ENC_UTF8: u32 = 65001;
pub const ENC_UTF16: u32 = 65002;

/// Set in `exth_flags` when an EXTH block follows the MOBI header.
pub const EXTH_PRESENT: u32 = 0x40;

const MOBI_TYPE_BOOK: u32 = 2;
const FILE_VERSION: u32 = 6;
const DEFAULT_LOCALE: u32 = 1033;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MOBIHeader {
    pub header_length: u32,
    pub mobi_type: u32,
    pub text_encoding: u32,
    pub unique_id: u32,
    pub file_version: u32,
    pub orthographic_index: u32,
    pub inflection_index: u32,
    pub index_names: u32,
    pub index_keys: u32,
    pub extra_index0: u32,
    pub extra_index1: u32,
    pub extra_index2: u32,
    pub extra_index3: u32,
    pub extra_index4: u32,
    pub extra_index5: u32,
    pub first_non_book_index: u32,
    pub full_name_offset: u32,
    pub full_name_length: u32,
    pub locale: u32,
    pub input_language: u32,
    pub output_language: u32,
    pub min_version: u32,
    pub first_image_index: u32,
    pub huffman_record_offset: u32,
    pub huffman_record_count: u32,
    pub huffman_table_offset: u32,
    pub huffman_table_length: u32,
    pub exth_flags: u32,
    pub drm_offset: u32,
    pub drm_count: u32,
    pub drm_size: u32,
    pub drm_flags: u32,
    pub first_content_record_number: u16,
    pub last_content_record_number: u16,
    pub fcis_record_number: u32,
    pub flis_record_number: u32,
    pub extra_record_data_flags: u32,
    pub indx_record_offset: u32,
}

impl MOBIHeader {
    /// A book header with every index and record pointer unset.
    pub fn new(unique_id: u32) -> Self {
        MOBIHeader {
            header_length: MOBI_HEADER_LEN,
            mobi_type: MOBI_TYPE_BOOK,
            text_encoding: ENC_UTF8,
            unique_id,
            file_version: FILE_VERSION,
            orthographic_index: NULL_INDEX,
            inflection_index: NULL_INDEX,
            index_names: NULL_INDEX,
            index_keys: NULL_INDEX,
            extra_index0: NULL_INDEX,
            extra_index1: NULL_INDEX,
            extra_index2: NULL_INDEX,
            extra_index3: NULL_INDEX,
            extra_index4: NULL_INDEX,
            extra_index5: NULL_INDEX,
            first_non_book_index: NULL_INDEX,
            full_name_offset: 0,
            full_name_length: 0,
            locale: DEFAULT_LOCALE,
            input_language: 0,
            output_language: 0,
            min_version: FILE_VERSION,
            first_image_index: NULL_INDEX,
            huffman_record_offset: 0,
            huffman_record_count: 0,
            huffman_table_offset: 0,
            huffman_table_length: 0,
            exth_flags: 0,
            drm_offset: NULL_INDEX,
            drm_count: NULL_INDEX,
            drm_size: 0,
            drm_flags: 0,
            first_content_record_number: 1,
            last_content_record_number: 0,
            fcis_record_number: NULL_INDEX,
            flis_record_number: NULL_INDEX,
            extra_record_data_flags: 0,
            indx_record_offset: NULL_INDEX,
        }
    }

    /// Reads a header of any declared length. Fields past the end of a short
    /// header read as unset.
    pub fn from_bytes<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        Magic::Mobi.expect(reader)?;
        let header_length = reader.read_u32()?;

        let mut body = reader.read_bytes(header_length.saturating_sub(8) as usize)?;
        let full = (MOBI_HEADER_LEN - 8) as usize;
        if body.len() < full {
            body.resize(full, 0xFF);
        }
        let reader = &mut Cursor::new(body);

        let mobi_type = reader.read_u32()?;
        let text_encoding = reader.read_u32()?;
        let unique_id = reader.read_u32()?;
        let file_version = reader.read_u32()?;
        let orthographic_index = reader.read_u32()?;
        let inflection_index = reader.read_u32()?;
        let index_names = reader.read_u32()?;
        let index_keys = reader.read_u32()?;
        let extra_index0 = reader.read_u32()?;
        let extra_index1 = reader.read_u32()?;
        let extra_index2 = reader.read_u32()?;
        let extra_index3 = reader.read_u32()?;
        let extra_index4 = reader.read_u32()?;
        let extra_index5 = reader.read_u32()?;
        let first_non_book_index = reader.read_u32()?;
        let full_name_offset = reader.read_u32()?;
        let full_name_length = reader.read_u32()?;
        let locale = reader.read_u32()?;
        let input_language = reader.read_u32()?;
        let output_language = reader.read_u32()?;
        let min_version = reader.read_u32()?;
        let first_image_index = reader.read_u32()?;
        let huffman_record_offset = reader.read_u32()?;
        let huffman_record_count = reader.read_u32()?;
        let huffman_table_offset = reader.read_u32()?;
        let huffman_table_length = reader.read_u32()?;
        let exth_flags = reader.read_u32()?;

        reader.seek_relative(32)?;
        reader.seek_relative(4)?;
        let drm_offset = reader.read_u32()?;
        let drm_count = reader.read_u32()?;
        let drm_size = reader.read_u32()?;
        let drm_flags = reader.read_u32()?;
        reader.seek_relative(8)?;
        let first_content_record_number = reader.read_u16()?;
        let last_content_record_number = reader.read_u16()?;
        reader.seek_relative(4)?;
        let fcis_record_number = reader.read_u32()?;
        reader.seek_relative(4)?;
        let flis_record_number = reader.read_u32()?;
        reader.seek_relative(4)?;
        reader.seek_relative(8)?;
        reader.seek_relative(4)?;
        reader.seek_relative(8)?; // First compilation data section count and number
        reader.seek_relative(4)?;
        let extra_record_data_flags = reader.read_u32()?;
        let indx_record_offset = reader.read_u32()?;

        Ok(MOBIHeader {
            header_length,
            mobi_type,
            text_encoding,
            unique_id,
            file_version,
            orthographic_index,
            inflection_index,
            index_names,
            index_keys,
            extra_index0,
            extra_index1,
            extra_index2,
            extra_index3,
            extra_index4,
            extra_index5,
            first_non_book_index,
            full_name_offset,
            full_name_length,
            locale,
            input_language,
            output_language,
            min_version,
            first_image_index,
            huffman_record_offset,
            huffman_record_count,
            huffman_table_offset,
            huffman_table_length,
            exth_flags,
            drm_offset,
            drm_count,
            drm_size,
            drm_flags,
            first_content_record_number,
            last_content_record_number,
            fcis_record_number,
            flis_record_number,
            extra_record_data_flags,
            indx_record_offset,
        })
    }

    pub fn has_exth(&self) -> bool {
        self.exth_flags & EXTH_PRESENT != 0
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(MOBI_HEADER_LEN as usize);
        data.write_all(Magic::Mobi.as_bytes())?;
        data.write_u32(MOBI_HEADER_LEN)?;
        data.write_u32(self.mobi_type)?;
        data.write_u32(self.text_encoding)?;
        data.write_u32(self.unique_id)?;
        data.write_u32(self.file_version)?;
        data.write_u32(self.orthographic_index)?;
        data.write_u32(self.inflection_index)?;
        data.write_u32(self.index_names)?;
        data.write_u32(self.index_keys)?;
        data.write_u32(self.extra_index0)?;
        data.write_u32(self.extra_index1)?;
        data.write_u32(self.extra_index2)?;
        data.write_u32(self.extra_index3)?;
        data.write_u32(self.extra_index4)?;
        data.write_u32(self.extra_index5)?;
        data.write_u32(self.first_non_book_index)?;
        data.write_u32(self.full_name_offset)?;
        data.write_u32(self.full_name_length)?;
        data.write_u32(self.locale)?;
        data.write_u32(self.input_language)?;
        data.write_u32(self.output_language)?;
        data.write_u32(self.min_version)?;
        data.write_u32(self.first_image_index)?;
        data.write_u32(self.huffman_record_offset)?;
        data.write_u32(self.huffman_record_count)?;
        data.write_u32(self.huffman_table_offset)?;
        data.write_u32(self.huffman_table_length)?;
        data.write_u32(self.exth_flags)?;

        data.write_zeros(32)?; // Unknown
        data.write_u32(NULL_INDEX)?; // Unknown

        data.write_u32(self.drm_offset)?;
        data.write_u32(self.drm_count)?;
        data.write_u32(self.drm_size)?;
        data.write_u32(self.drm_flags)?;

        data.write_u32(0)?; // Bytes to end of header? docs say to use 0
        data.write_u32(0)?;

        data.write_u16(self.first_content_record_number)?;
        data.write_u16(self.last_content_record_number)?;

        data.write_u32(1)?; // Unknown
        data.write_u32(self.fcis_record_number)?;
        data.write_u32(1)?; // Unknown
        data.write_u32(self.flis_record_number)?;
        data.write_u32(1)?;

        data.write_u32(0)?; // Unknown
        data.write_u32(0)?;
        data.write_u32(NULL_INDEX)?;
        data.write_u32(0)?;
        data.write_u32(NULL_INDEX)?;
        data.write_u32(NULL_INDEX)?;
        data.write_u32(self.extra_record_data_flags)?;
        data.write_u32(self.indx_record_offset)?;

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> MOBIHeader {
        let mut header = MOBIHeader::new(42);
        header.full_name_offset = 16 + 232 + 24;
        header.full_name_length = 5;
        header.exth_flags = 0x50;
        header.first_non_book_index = 4;
        header.last_content_record_number = 3;
        header.fcis_record_number = 9;
        header.flis_record_number = 8;
        header.extra_record_data_flags = 1;
        header.indx_record_offset = 5;
        header
    }

    #[test]
    fn header_is_232_bytes() {
        let data = sample().to_bytes().unwrap();
        assert_eq!(data.len(), MOBI_HEADER_LEN as usize);
        assert_eq!(&data[..8], b"MOBI\0\0\0\xE8");
        assert_eq!(&data[176..178], [0, 1]);
        assert_eq!(&data[184..188], [0, 0, 0, 9]);
        assert_eq!(&data[192..196], [0, 0, 0, 8]);
        assert_eq!(&data[224..228], [0, 0, 0, 1]);
        assert_eq!(&data[228..232], [0, 0, 0, 5]);
    }

    #[test]
    fn reads_back_written_header() {
        let header = sample();
        let read = MOBIHeader::from_bytes(&mut Cursor::new(header.to_bytes().unwrap())).unwrap();
        assert_eq!(read, header);
        assert!(read.has_exth());
    }

    #[test]
    fn longer_headers_are_skipped() {
        let mut data = sample().to_bytes().unwrap();
        data[4..8].copy_from_slice(&264u32.to_be_bytes());
        data.extend_from_slice(&[0xAA; 32]);
        data.extend_from_slice(b"EXTH");

        let mut cursor = Cursor::new(data);
        let read = MOBIHeader::from_bytes(&mut cursor).unwrap();
        assert_eq!(read.header_length, 264);
        assert_eq!(read.indx_record_offset, 5);
        assert_eq!(cursor.position(), 264);
    }

    #[test]
    fn short_headers_leave_fields_unset() {
        let mut data = sample().to_bytes().unwrap();
        data.truncate(116);
        data[4..8].copy_from_slice(&116u32.to_be_bytes());

        let read = MOBIHeader::from_bytes(&mut Cursor::new(data)).unwrap();
        assert_eq!(read.exth_flags, 0x50);
        assert_eq!(read.indx_record_offset, NULL_INDEX);
        assert_eq!(read.fcis_record_number, NULL_INDEX);
    }

    #[test]
    fn rejects_other_magic() {
        let mut data = sample().to_bytes().unwrap();
        data[..4].copy_from_slice(b"BOOK");
        assert!(MOBIHeader::from_bytes(&mut Cursor::new(data)).is_err());
    }
}
