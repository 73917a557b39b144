//! Offset-tracking sink.

use std::io::{self, Write};

/// Pass-through writer counting bytes accepted by the inner sink.
///
/// The count only advances by what the inner sink actually accepted, so it
/// matches what a reader of the final output will observe. It is monotone
/// non-decreasing for the life of the writer.
pub struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    /// Total bytes written to the inner sink so far.
    pub fn bytes_written(&self) -> u64 {
        self.count
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_written_bytes() {
        let mut writer = CountingWriter::new(Vec::new());
        writer.write_all(b"hello").unwrap();
        writer.write_all(b" world").unwrap();
        assert_eq!(writer.bytes_written(), 11);
        assert_eq!(writer.into_inner(), b"hello world");
    }

    #[test]
    fn test_counts_short_writes_exactly() {
        // A sink that accepts at most 3 bytes per call.
        struct Throttled(Vec<u8>);
        impl Write for Throttled {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                let n = buf.len().min(3);
                self.0.extend_from_slice(&buf[..n]);
                Ok(n)
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut writer = CountingWriter::new(Throttled(Vec::new()));
        writer.write_all(b"0123456789").unwrap();
        assert_eq!(writer.bytes_written(), 10);
        assert_eq!(writer.get_ref().0, b"0123456789");
    }
}
