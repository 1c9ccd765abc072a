//! Presenting a compressed stream as an archive with one unnamed entry.

use std::io::Read;

use tracing::trace;

use crate::content::{Content, ContentHandler, Opener};
use crate::error::Result;
use crate::format::CompressorFormat;
use crate::path::decompressed_path;

pub struct CompressorAdapter<'a, T> {
    pub format: &'a dyn CompressorFormat,
    pub handler: &'a dyn ContentHandler<T>,
}

impl<T> CompressorAdapter<'_, T> {
    /// Decompresses `stream` and hands it to the handler exactly once, as
    /// `path%`. The handler's result is passed through as is.
    pub fn adapt(&self, path: &str, stream: &mut dyn Read, reopen: &dyn Opener) -> Result<Option<T>> {
        let path = decompressed_path(path);
        let mut decompressed = self.format.decompress(Box::new(stream))?;

        let opener = DecompressedOpener {
            format: self.format,
            compressed: reopen,
        };

        // No codec here reports its uncompressed size up front, and none
        // carries a checksum of the payload that is known before reading it.
        self.handler
            .process(&path, &mut decompressed, &Content::default(), &opener)
    }
}

/// Reproduces decompressed content by reopening the compressed stream and
/// decompressing it again.
pub struct DecompressedOpener<'a> {
    format: &'a dyn CompressorFormat,
    compressed: &'a dyn Opener,
}

impl Opener for DecompressedOpener<'_> {
    fn open(&self) -> Result<Box<dyn Read>> {
        trace!(format = self.format.name(), "reopening compressed stream");
        let compressed = self.compressed.open()?;
        Ok(self.format.decompress(compressed)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::handler;
    use crate::format::Gzip;
    use std::cell::Cell;
    use std::io::Write;
    use std::rc::Rc;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn single_pseudo_entry() {
        let compressed: &'static [u8] = Box::leak(gzip(b"payload").into_boxed_slice());
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let read = handler(move |path, stream, content, opener| {
            counter.set(counter.get() + 1);
            assert_eq!(path, "data.gz%");
            assert_eq!(content, &Content::default());

            let mut live = String::new();
            stream.read_to_string(&mut live)?;
            let mut again = String::new();
            opener.open()?.read_to_string(&mut again)?;
            assert_eq!(live, again);
            Ok(Some(live))
        });

        let adapter = CompressorAdapter {
            format: &Gzip,
            handler: read.as_ref(),
        };
        let reopen = move || -> Result<Box<dyn Read>> { Ok(Box::new(compressed)) };
        let result = adapter
            .adapt("data.gz", &mut &compressed[..], &reopen)
            .unwrap();

        assert_eq!(result.as_deref(), Some("payload"));
        assert_eq!(calls.get(), 1);
    }
}
