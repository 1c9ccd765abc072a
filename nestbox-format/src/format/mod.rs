//! Archive and compression formats, and the registry that orders them.
//!
//! The engine knows formats only through the two traits here: it sniffs a
//! peeked header, then either enumerates entries or wraps the stream in a
//! decompressor. Which codecs exist is decided by the [`Registry`].

use std::fmt;
use std::io::{self, Read};
use std::ops::ControlFlow;

use chrono::{DateTime, Utc};

use crate::error::Result;

mod compression;
#[cfg(feature = "tar")]
mod tar;
#[cfg(feature = "zip")]
mod zip;

pub use self::compression::Diagnosing;
#[cfg(feature = "bzip2")]
pub use self::compression::Bzip2;
#[cfg(feature = "gzip")]
pub use self::compression::Gzip;
#[cfg(feature = "xz")]
pub use self::compression::Xz;
#[cfg(feature = "zstd")]
pub use self::compression::Zstd;
#[cfg(feature = "tar")]
pub use self::tar::Tar;
#[cfg(feature = "zip")]
pub use self::zip::Zip;

/// Metadata of one archive entry, as reported by its codec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryRecord {
    /// The name exactly as stored in the archive.
    pub name: String,
    pub is_dir: bool,
    pub size: Option<u64>,
    /// `None` when the codec keeps no content checksum.
    pub checksum: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Called once per entry, in archive order, with the entry's content.
///
/// The content stream is only valid for the duration of the call.
pub type EntryVisitor<'v> = dyn FnMut(&EntryRecord, &mut dyn Read) -> Result<ControlFlow<()>> + 'v;

/// A container format with multiple named entries.
pub trait ArchiveFormat {
    /// Canonical name, used in `"<format>:<path>"` look-into keys.
    fn name(&self) -> &str;

    /// Whether `header`, the first bytes of a stream, looks like this format.
    fn sniff(&self, header: &[u8]) -> bool;

    /// Whether a sniffed `header` also opens as this format.
    ///
    /// Called only after [`sniff`](Self::sniff) matched. `header` may end
    /// anywhere inside the archive.
    fn confirm(&self, _header: &[u8]) -> bool {
        true
    }

    /// Reads `stream` as an archive, handing every entry to `visit` until the
    /// archive ends or `visit` breaks.
    fn entries(&self, stream: &mut dyn Read, visit: &mut EntryVisitor<'_>) -> Result<()>;
}

/// A format wrapping a single payload.
pub trait CompressorFormat {
    fn name(&self) -> &str;

    fn sniff(&self, header: &[u8]) -> bool;

    /// Whether a sniffed `header` also decodes as this format, as far as it
    /// goes.
    fn confirm(&self, header: &[u8]) -> bool {
        compression::decodes_prefix(self, header)
    }

    fn decompress<'a>(&self, stream: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>>;
}

/// Ordered lists of known formats. Earlier formats take precedence.
pub struct Registry {
    archives: Vec<Box<dyn ArchiveFormat>>,
    compressors: Vec<Box<dyn CompressorFormat>>,
}

impl Registry {
    pub fn empty() -> Registry {
        Registry {
            archives: vec![],
            compressors: vec![],
        }
    }

    pub fn with_archive<F: ArchiveFormat + 'static>(mut self, format: F) -> Registry {
        self.archives.push(Box::new(format));
        self
    }

    pub fn with_compressor<F: CompressorFormat + 'static>(mut self, format: F) -> Registry {
        self.compressors.push(Box::new(format));
        self
    }

    #[inline(always)]
    pub fn archives(&self) -> impl Iterator<Item = &dyn ArchiveFormat> {
        self.archives.iter().map(|f| f.as_ref())
    }

    #[inline(always)]
    pub fn compressors(&self) -> impl Iterator<Item = &dyn CompressorFormat> {
        self.compressors.iter().map(|f| f.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty() && self.compressors.is_empty()
    }
}

impl Default for Registry {
    /// Every format compiled in: zip, tar; gzip, bzip2, xz, zstd.
    #[allow(unused_mut)]
    fn default() -> Self {
        let mut registry = Registry::empty();
        #[cfg(feature = "zip")]
        {
            registry = registry.with_archive(Zip);
        }
        #[cfg(feature = "tar")]
        {
            registry = registry.with_archive(Tar);
        }
        #[cfg(feature = "gzip")]
        {
            registry = registry.with_compressor(Gzip);
        }
        #[cfg(feature = "bzip2")]
        {
            registry = registry.with_compressor(Bzip2);
        }
        #[cfg(feature = "xz")]
        {
            registry = registry.with_compressor(Xz);
        }
        #[cfg(feature = "zstd")]
        {
            registry = registry.with_compressor(Zstd);
        }
        registry
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("archives", &self.archives().map(|a| a.name()).collect::<Vec<_>>())
            .field(
                "compressors",
                &self.compressors().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_precedence() {
        let registry = Registry::default();
        let archives: Vec<_> = registry.archives().map(|f| f.name().to_string()).collect();
        let compressors: Vec<_> = registry
            .compressors()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(archives, ["zip", "tar"]);
        assert_eq!(compressors, ["gzip", "bzip2", "xz", "zstd"]);
    }

    #[test]
    fn empty_registry() {
        assert!(Registry::empty().is_empty());
        assert!(!Registry::default().is_empty());
    }
}
