use std::io::{self, Read};

use super::CompressorFormat;
use crate::error::{DecodeFailure, FormatMismatch};

pub mod magic {
    pub const GZIP: &[u8] = &[0x1f, 0x8b];
    pub const BZIP2: &[u8] = b"BZh";
    pub const XZ: &[u8] = &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];
    pub const ZSTD: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];
}

/// Turns a decoder's failure into a [`FormatMismatch`].
///
/// Decoders report a missing trailer as `UnexpectedEof` and undecodable bytes
/// as `InvalidData` or `InvalidInput`. Neither says on its own whether the
/// file was damaged or was never of that format. Counting the bytes produced
/// tells the two apart.
pub struct Diagnosing<R> {
    inner: R,
    format: &'static str,
    produced: u64,
}

impl<R> Diagnosing<R> {
    pub fn new(format: &'static str, inner: R) -> Self {
        Self {
            inner,
            format,
            produced: 0,
        }
    }

    fn mismatch(&self, failure: DecodeFailure) -> io::Error {
        FormatMismatch {
            format: self.format.to_string(),
            produced: self.produced,
            failure,
        }
        .as_io_error()
    }
}

impl<R: Read> Read for Diagnosing<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Ok(n) => {
                self.produced += n as u64;
                Ok(n)
            }
            // Already diagnosed by a decoder further in.
            Err(e) if FormatMismatch::in_io_error(&e).is_some() => Err(e),
            Err(e) => match e.kind() {
                io::ErrorKind::UnexpectedEof => Err(self.mismatch(DecodeFailure::EndOfInput)),
                io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
                    Err(self.mismatch(DecodeFailure::Invalid(e.to_string())))
                }
                _ => Err(e),
            },
        }
    }
}

#[inline(always)]
fn diagnosed<'a, R: Read + 'a>(format: &'static str, reader: R) -> Box<dyn Read + 'a> {
    Box::new(Diagnosing::new(format, reader))
}

/// Most output a trial decode of a peeked header may produce.
const TRIAL_OUTPUT_LIMIT: u64 = 64 * 1024;

/// Decodes the peeked `header` as far as it goes.
///
/// Running out of input is expected, since the header usually ends
/// mid-stream. Any other failure means the bytes are not `format` after all.
pub(crate) fn decodes_prefix<F>(format: &F, header: &[u8]) -> bool
where
    F: CompressorFormat + ?Sized,
{
    let decoder = match format.decompress(Box::new(header)) {
        Ok(decoder) => decoder,
        Err(_) => return false,
    };

    match io::copy(&mut decoder.take(TRIAL_OUTPUT_LIMIT), &mut io::sink()) {
        Ok(_) => true,
        Err(error) => match FormatMismatch::in_io_error(&error) {
            Some(mismatch) => mismatch.ended_early(),
            None => error.kind() == io::ErrorKind::UnexpectedEof,
        },
    }
}

#[cfg(feature = "gzip")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Gzip;

#[cfg(feature = "gzip")]
impl CompressorFormat for Gzip {
    fn name(&self) -> &str {
        "gzip"
    }

    fn sniff(&self, header: &[u8]) -> bool {
        header.starts_with(magic::GZIP)
    }

    fn decompress<'a>(&self, stream: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>> {
        Ok(diagnosed("gzip", flate2::read::MultiGzDecoder::new(stream)))
    }
}

#[cfg(feature = "bzip2")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Bzip2;

#[cfg(feature = "bzip2")]
impl CompressorFormat for Bzip2 {
    fn name(&self) -> &str {
        "bzip2"
    }

    fn sniff(&self, header: &[u8]) -> bool {
        // "BZh" followed by the block size digit.
        header.starts_with(magic::BZIP2)
            && header
                .get(magic::BZIP2.len())
                .map_or(false, |b| (b'1'..=b'9').contains(b))
    }

    fn decompress<'a>(&self, stream: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>> {
        Ok(diagnosed("bzip2", bzip2::read::MultiBzDecoder::new(stream)))
    }
}

#[cfg(feature = "xz")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Xz;

#[cfg(feature = "xz")]
impl CompressorFormat for Xz {
    fn name(&self) -> &str {
        "xz"
    }

    fn sniff(&self, header: &[u8]) -> bool {
        header.starts_with(magic::XZ)
    }

    fn decompress<'a>(&self, stream: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>> {
        Ok(diagnosed("xz", xz2::read::XzDecoder::new_multi_decoder(stream)))
    }
}

#[cfg(feature = "zstd")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Zstd;

#[cfg(feature = "zstd")]
impl CompressorFormat for Zstd {
    fn name(&self) -> &str {
        "zstd"
    }

    fn sniff(&self, header: &[u8]) -> bool {
        header.starts_with(magic::ZSTD)
    }

    fn decompress<'a>(&self, stream: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>> {
        Ok(diagnosed("zstd", zstd::stream::read::Decoder::new(stream)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ProcessError};
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn read_all(format: &dyn CompressorFormat, data: Vec<u8>) -> std::result::Result<Vec<u8>, ProcessError> {
        let mut reader = format.decompress(Box::new(io::Cursor::new(data)))?;
        let mut out = Vec::new();
        reader.read_to_end(&mut out)?;
        Ok(out)
    }

    #[test]
    fn gzip_round_trip() {
        let data = gzip(b"hello gzip");
        assert!(Gzip.sniff(&data));
        assert_eq!(read_all(&Gzip, data).unwrap(), b"hello gzip");
    }

    #[test]
    fn truncated_gzip_is_diagnosed() {
        let payload = vec![b'x'; 64 * 1024];
        let mut data = gzip(&payload);
        // Drop the CRC/ISIZE trailer.
        data.truncate(data.len() - 8);

        let error = read_all(&Gzip, data).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::FormatMismatch);
        match error {
            ProcessError::FormatMismatch(mismatch) => {
                assert_eq!(mismatch.format, "gzip");
                assert!(!mismatch.is_misdetection());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn bad_gzip_header_is_a_misdetection() {
        let error = read_all(&Gzip, b"\x1f\x8b\xff\xff not really gzip".to_vec()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::FormatMismatch);
        match error {
            ProcessError::FormatMismatch(mismatch) => {
                assert!(mismatch.is_misdetection());
                assert!(!mismatch.ended_early());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn bzip2_magic_in_text_is_a_misdetection() {
        let error = read_all(&Bzip2, b"BZh9 is the header of bzip2 files".to_vec()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::FormatMismatch);
        assert!(error.to_string().contains("misdetected"));
    }

    #[test]
    fn prefixes_of_real_streams_decode() {
        let data = gzip(&vec![b'x'; 64 * 1024]);
        assert!(decodes_prefix(&Gzip, &data[..20]));
        assert!(decodes_prefix(&Gzip, &data));
        assert!(decodes_prefix(&Gzip, &data[..2]));

        let mut bz = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        bz.write_all(&vec![b'y'; 64 * 1024]).unwrap();
        let bz = bz.finish().unwrap();
        assert!(decodes_prefix(&Bzip2, &bz[..bz.len().min(512)]));
    }

    #[test]
    fn text_behind_magic_does_not_decode() {
        assert!(!decodes_prefix(&Gzip, b"\x1f\x8b\xff\xff not really gzip"));
        assert!(!decodes_prefix(&Bzip2, b"BZh9 is the header of bzip2 files"));
        assert!(!decodes_prefix(&Zstd, b"\x28\xb5\x2f\xfd\xff\xff\xff\xff\xff\xff\xff\xff text"));
    }

    #[test]
    fn bzip2_needs_block_size() {
        assert!(Bzip2.sniff(b"BZh91AY&SY"));
        assert!(!Bzip2.sniff(b"BZhx"));
        assert!(!Bzip2.sniff(b"BZ"));
    }

    #[test]
    fn xz_and_zstd_round_trip() {
        let mut xz = xz2::write::XzEncoder::new(Vec::new(), 6);
        xz.write_all(b"hello xz").unwrap();
        let xz = xz.finish().unwrap();
        assert!(Xz.sniff(&xz));
        assert_eq!(read_all(&Xz, xz).unwrap(), b"hello xz");

        let zst = zstd::stream::encode_all(&b"hello zstd"[..], 3).unwrap();
        assert!(Zstd.sniff(&zst));
        assert_eq!(read_all(&Zstd, zst).unwrap(), b"hello zstd");
    }
}
