use std::io::{self, Read, Seek, SeekFrom, Write};
use std::ops::ControlFlow;

use ::zip::read::ZipFile;
use ::zip::result::ZipError;
use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tempfile::SpooledTempFile;
use tracing::debug;

use super::{ArchiveFormat, EntryRecord, EntryVisitor};
use crate::error::Result;

const LOCAL_FILE_HEADER: u32 = 0x0403_4b50;
const END_OF_CENTRAL_DIRECTORY: u32 = 0x0605_4b50;
const LOCAL_FILE_HEADER_LEN: usize = 30;
const END_OF_CENTRAL_DIRECTORY_LEN: usize = 22;
/// Highest compression method number in the application note.
const MAX_METHOD: u16 = 99;
const SPOOL_THRESHOLD: usize = 8 * 1024 * 1024;

/// Zip archives, read front to back from their local file headers.
///
/// Streaming writers (`jar`, `ZipOutputStream`) record an entry's sizes in a
/// data descriptor after its content, out of reach of a front-to-back reader.
/// Everything read is therefore kept in a spool; when such an entry turns up
/// the rest of the archive is spooled too and the remaining entries are
/// taken from the central directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct Zip;

impl ArchiveFormat for Zip {
    fn name(&self) -> &str {
        "zip"
    }

    fn sniff(&self, header: &[u8]) -> bool {
        if header.len() < 4 {
            return false;
        }
        matches!(
            LittleEndian::read_u32(header),
            LOCAL_FILE_HEADER | END_OF_CENTRAL_DIRECTORY
        )
    }

    /// The header after the signature must be complete and name a
    /// compression method.
    fn confirm(&self, header: &[u8]) -> bool {
        if header.len() < 4 {
            return false;
        }
        match LittleEndian::read_u32(header) {
            END_OF_CENTRAL_DIRECTORY => header.len() >= END_OF_CENTRAL_DIRECTORY_LEN,
            _ => {
                header.len() >= LOCAL_FILE_HEADER_LEN
                    && LittleEndian::read_u16(&header[8..]) <= MAX_METHOD
            }
        }
    }

    fn entries(&self, stream: &mut dyn Read, visit: &mut EntryVisitor<'_>) -> Result<()> {
        let mut copy = SpooledTempFile::new(SPOOL_THRESHOLD);

        let mut tee = Tee {
            inner: &mut *stream,
            copy: &mut copy,
        };
        let visited = match stream_entries(&mut tee, visit)? {
            Streamed::Done => return Ok(()),
            Streamed::Stuck { visited, reason } => {
                debug!(visited, reason, "zip entry not streamable, reading central directory");
                visited
            }
        };

        io::copy(stream, &mut copy)?;
        copy.seek(SeekFrom::Start(0))?;
        let mut archive = ::zip::ZipArchive::new(copy).map_err(io::Error::from)?;

        for index in visited..archive.len() {
            let mut file = archive.by_index(index).map_err(io::Error::from)?;
            if let ControlFlow::Break(()) = visit(&record(&file), &mut file)? {
                break;
            }
        }

        Ok(())
    }
}

enum Streamed {
    Done,
    /// The local headers stopped making sense after `visited` entries.
    Stuck {
        visited: usize,
        reason: &'static str,
    },
}

fn stream_entries(stream: &mut Tee<'_>, visit: &mut EntryVisitor<'_>) -> Result<Streamed> {
    let mut visited = 0;

    loop {
        let mut file = match ::zip::read::read_zipfile_from_stream(&mut *stream) {
            Ok(Some(file)) => file,
            Ok(None) => return Ok(Streamed::Done),
            Err(ZipError::UnsupportedArchive(reason)) | Err(ZipError::InvalidArchive(reason)) => {
                return Ok(Streamed::Stuck { visited, reason })
            }
            Err(error) => return Err(io::Error::from(error).into()),
        };
        visited += 1;

        if let ControlFlow::Break(()) = visit(&record(&file), &mut file)? {
            return Ok(Streamed::Done);
        }
    }
}

fn record(file: &ZipFile<'_>) -> EntryRecord {
    EntryRecord {
        name: file.name().to_string(),
        is_dir: file.is_dir(),
        size: Some(file.size()),
        checksum: Some(u64::from(file.crc32())),
        last_modified: dos_time(file.last_modified()),
    }
}

/// Copies everything read through it into `copy`.
struct Tee<'a> {
    inner: &'a mut dyn Read,
    copy: &'a mut SpooledTempFile,
}

impl Read for Tee<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.copy.write_all(&buf[..n])?;
        Ok(n)
    }
}

/// Zip stores local wall-clock time without a zone; it is reported as UTC.
fn dos_time(time: ::zip::DateTime) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(
        i32::from(time.year()),
        u32::from(time.month()),
        u32::from(time.day()),
    )?
    .and_hms_opt(
        u32::from(time.hour()),
        u32::from(time.minute()),
        u32::from(time.second()),
    )?;
    Some(Utc.from_utc_datetime(&naive))
}
