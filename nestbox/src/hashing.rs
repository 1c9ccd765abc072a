//! CRC-32 over data as it is read.

use std::io::{Read, Result};

/// A reader wrapper that updates a CRC-32 while data is read through it.
pub struct HashingReader<R> {
    inner: R,
    hasher: crc32fast::Hasher,
    bytes_read: u64,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
            bytes_read: 0,
        }
    }

    /// Total number of bytes read through this reader.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn finalize(self) -> u32 {
        self.hasher.finalize()
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.hasher.update(&buf[..n]);
            self.bytes_read += n as u64;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_what_passes_through() {
        let data = b"hello world";
        let mut hashing = HashingReader::new(&data[..]);
        let mut output = Vec::new();
        hashing.read_to_end(&mut output).unwrap();

        assert_eq!(output, data);
        assert_eq!(hashing.bytes_read(), 11);
        assert_eq!(hashing.finalize(), crc32fast::hash(data));
    }
}
