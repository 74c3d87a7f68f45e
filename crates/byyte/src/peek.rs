use std::io::{Read, Result, Seek, SeekFrom};

/// Non-destructive lookahead for seekable sources.
pub trait Peek: Read + Seek {
    /// Reads up to `n` bytes and restores the position. The result is shorter
    /// than `n` only when the source ends first.
    fn peek(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(n);
        Read::take(&mut *self, n as u64).read_to_end(&mut buf)?;
        self.seek(SeekFrom::Current(-(buf.len() as i64)))?;
        Ok(buf)
    }

    /// Checks whether the next bytes equal `magic` without consuming them.
    fn match_magic(&mut self, magic: &[u8]) -> Result<bool> {
        Ok(self.peek(magic.len())? == magic)
    }
}

impl<R: Read + Seek + ?Sized> Peek for R {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn peek_restores_position() {
        let mut cursor = Cursor::new(b"INDXrest".to_vec());
        assert_eq!(cursor.peek(4).unwrap(), b"INDX");
        assert_eq!(cursor.position(), 0);
        assert!(cursor.match_magic(b"INDX").unwrap());
        assert!(!cursor.match_magic(b"TAGX").unwrap());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn peek_past_end_is_short() {
        let mut cursor = Cursor::new(b"ab".to_vec());
        cursor.set_position(1);
        assert_eq!(cursor.peek(4).unwrap(), b"b");
        assert_eq!(cursor.position(), 1);
        assert!(!cursor.match_magic(b"bcde").unwrap());
    }

    #[test]
    fn peeks_through_trait_object() {
        trait Source: Read + Seek {}
        impl<T: Read + Seek> Source for T {}

        let mut cursor = Cursor::new(b"EXTHbody".to_vec());
        let source: &mut dyn Source = &mut cursor;
        assert_eq!(source.peek(4).unwrap(), b"EXTH");
        assert!(source.match_magic(b"EXTH").unwrap());
        assert_eq!(source.stream_position().unwrap(), 0);
    }
}
