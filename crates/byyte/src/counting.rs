use std::io;
use std::io::{Result, Write};

/// An append-only sink that keeps track of how many bytes went through it.
///
/// Container formats address their records by absolute offset, so the writer
/// never seeks backwards. Gaps are filled with zeros instead.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Total number of bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Writes `count` zero bytes.
    pub fn pad(&mut self, count: usize) -> Result<()> {
        const ZEROS: [u8; 512] = [0u8; 512];
        let mut remaining = count;
        while remaining > 0 {
            let step = remaining.min(ZEROS.len());
            self.write_all(&ZEROS[..step])?;
            remaining -= step;
        }
        Ok(())
    }

    /// Pads with zeros until exactly `offset` bytes have been written.
    ///
    /// Does nothing when the writer is already at or past `offset`. Returns
    /// the number of padding bytes emitted.
    pub fn seek_forward_to(&mut self, offset: u64) -> Result<u64> {
        if offset <= self.written {
            return Ok(0);
        }
        let gap = offset - self.written;
        let gap_usize = usize::try_from(gap)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Seek distance too large"))?;
        self.pad(gap_usize)?;
        Ok(gap)
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}
