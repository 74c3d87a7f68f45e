use std::io;
use std::io::Result;

pub trait ByteReader: io::Read {
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }
    fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }
    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; length];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_magic<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads a fixed-width, zero padded string field.
    fn read_string(&mut self, length: usize) -> Result<String> {
        let buf = self.read_bytes(length)?;
        let string = String::from_utf8(buf)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Invalid UTF-8 string"))?;
        Ok(string.trim_end_matches('\0').to_string())
    }
}

impl<R: io::Read + ?Sized> ByteReader for R {}

pub trait ByteWriter: io::Write {
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }
    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }
    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    fn write_zeros(&mut self, count: usize) -> Result<()> {
        self.write_all(&vec![0u8; count])
    }

    /// Writes `string` into a field of exactly `width` bytes, truncating or
    /// zero padding as needed.
    fn write_fixed_str(&mut self, string: &str, width: usize) -> Result<()> {
        let bytes = string.as_bytes();
        let len = bytes.len().min(width);
        self.write_all(&bytes[..len])?;
        self.write_zeros(width - len)
    }
}

impl<W: io::Write + ?Sized> ByteWriter for W {}
