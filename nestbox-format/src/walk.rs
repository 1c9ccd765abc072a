//! Walking the entries of one archive.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom};
use std::ops::ControlFlow;

use tempfile::SpooledTempFile;
use tracing::{debug, trace};

use crate::combine::Combiner;
use crate::content::{Content, ContentHandler, Opener};
use crate::error::{ProcessError, Result};
use crate::format::ArchiveFormat;
use crate::path::{entry_path, normalize_entry_name};
use crate::policy::ExceptionPolicy;

/// Feeds every non-directory entry of an archive to a handler, one at a
/// time and in archive order, then combines the results.
pub struct ArchiveWalker<'a, T> {
    pub format: &'a dyn ArchiveFormat,
    pub handler: &'a dyn ContentHandler<T>,
    pub combiner: &'a dyn Combiner<T>,
    pub policy: &'a dyn ExceptionPolicy,
    /// Bytes an entry reproducer keeps in memory before spilling to disk.
    pub spool_threshold: usize,
}

impl<'a, T> ArchiveWalker<'a, T> {
    /// Walks `stream`, an archive at `archive_path` that `reopen` can
    /// reproduce.
    ///
    /// A failing entry is handed to the exception policy; if the policy lets
    /// it go the entry is left out of the combined results and the walk goes
    /// on. If the policy returns an error, the walk stops there and nothing
    /// is combined.
    pub fn walk(
        &self,
        archive_path: &str,
        stream: &mut dyn Read,
        reopen: &dyn Opener,
    ) -> Result<Option<T>> {
        let mut results = Vec::new();
        let mut occurrences: HashMap<String, usize> = HashMap::new();

        self.format.entries(stream, &mut |record, entry| {
            if record.is_dir {
                trace!(archive = archive_path, entry = %record.name, "skipping directory");
                return Ok(ControlFlow::Continue(()));
            }

            let path = entry_path(archive_path, &normalize_entry_name(&record.name));
            let occurrence = {
                let seen = occurrences.entry(record.name.clone()).or_insert(0);
                *seen += 1;
                *seen - 1
            };

            let opener = EntryOpener {
                format: self.format,
                archive_path,
                archive: reopen,
                name: &record.name,
                occurrence,
                spool_threshold: self.spool_threshold,
            };
            let content = Content {
                size: record.size,
                checksum: record.checksum,
                last_modified: record.last_modified,
            };

            match self.handler.process(&path, entry, &content, &opener) {
                Ok(result) => results.push(result),
                Err(error) => {
                    self.policy.on_error(&path, error)?;
                    debug!(path = %path, "entry skipped after failure");
                }
            }

            Ok(ControlFlow::Continue(()))
        })?;

        Ok(self.combiner.combine(archive_path, results))
    }
}

/// Reproduces one archive entry by reopening the archive and scanning for it.
///
/// Entries are matched by their stored name and by how many earlier entries
/// carried the same name, so duplicates each reproduce their own bytes. The
/// matched content is copied into a spooled buffer, since a codec's entry
/// stream cannot outlive the codec.
pub struct EntryOpener<'a> {
    format: &'a dyn ArchiveFormat,
    archive_path: &'a str,
    archive: &'a dyn Opener,
    name: &'a str,
    occurrence: usize,
    spool_threshold: usize,
}

impl Opener for EntryOpener<'_> {
    fn open(&self) -> Result<Box<dyn Read>> {
        trace!(
            archive = self.archive_path,
            entry = self.name,
            "reopening archive to reproduce entry"
        );

        let mut archive = self.archive.open()?;
        let mut skip = self.occurrence;
        let mut found = None;

        self.format.entries(&mut archive, &mut |record, entry| {
            if record.is_dir || record.name != self.name {
                return Ok(ControlFlow::Continue(()));
            }
            if skip > 0 {
                skip -= 1;
                return Ok(ControlFlow::Continue(()));
            }

            found = Some(spool(entry, self.spool_threshold)?);
            Ok(ControlFlow::Break(()))
        })?;

        // The reopened archive is closed here whether or not the entry was
        // found.
        drop(archive);

        match found {
            Some(spooled) => Ok(Box::new(spooled)),
            None => Err(ProcessError::EntryVanished {
                archive: self.archive_path.to_string(),
                entry: self.name.to_string(),
            }),
        }
    }
}

fn spool(entry: &mut dyn Read, threshold: usize) -> io::Result<SpooledTempFile> {
    let mut spooled = SpooledTempFile::new(threshold);
    io::copy(entry, &mut spooled)?;
    spooled.seek(SeekFrom::Start(0))?;
    Ok(spooled)
}
