//! Feeding files on disk to a handler.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::content::{Content, ContentHandler, Opener};
use crate::error::Result;

/// Reopens a file from disk.
#[derive(Debug, Clone)]
pub struct FileOpener {
    path: PathBuf,
}

impl FileOpener {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileOpener {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Opener for FileOpener {
    fn open(&self) -> Result<Box<dyn Read>> {
        Ok(Box::new(BufReader::new(File::open(&self.path)?)))
    }
}

/// Size and modification time from file-system metadata.
pub fn content_of(meta: &std::fs::Metadata) -> Content {
    Content {
        size: Some(meta.len()),
        checksum: None,
        last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
    }
}

/// Runs `handler` over the file at `path`, named by its display form.
///
/// Errors opening or reading the file itself are not attributed to a path;
/// the caller knows which file it asked for.
pub fn process_file<T, P>(handler: &dyn ContentHandler<T>, path: P) -> Result<Option<T>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let opener = FileOpener::new(path);
    let file = File::open(path)?;
    let content = content_of(&file.metadata()?);
    let mut stream = BufReader::new(file);

    handler.process(&path.display().to_string(), &mut stream, &content, &opener)
}
