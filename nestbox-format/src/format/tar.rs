use std::io::Read;
use std::ops::ControlFlow;

use chrono::{TimeZone, Utc};

use super::{ArchiveFormat, EntryRecord, EntryVisitor};
use crate::error::Result;

const USTAR_MAGIC: &[u8] = b"ustar";
const USTAR_MAGIC_OFFSET: usize = 257;
const BLOCK_SIZE: usize = 512;
const CHECKSUM_FIELD: std::ops::Range<usize> = 148..156;

/// POSIX ustar and GNU tar archives.
///
/// Pre-POSIX (v7) archives carry no magic and are not detected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tar;

impl ArchiveFormat for Tar {
    fn name(&self) -> &str {
        "tar"
    }

    fn sniff(&self, header: &[u8]) -> bool {
        header
            .get(USTAR_MAGIC_OFFSET..USTAR_MAGIC_OFFSET + USTAR_MAGIC.len())
            .map_or(false, |magic| magic == USTAR_MAGIC)
    }

    /// The first header block must carry a valid checksum.
    fn confirm(&self, header: &[u8]) -> bool {
        let block = match header.get(..BLOCK_SIZE) {
            Some(block) => block,
            None => return false,
        };
        let stored = match ::tar::Header::from_byte_slice(block).cksum() {
            Ok(stored) => stored,
            Err(_) => return false,
        };
        stored == checksum(block)
    }

    fn entries(&self, stream: &mut dyn Read, visit: &mut EntryVisitor<'_>) -> Result<()> {
        let mut archive = ::tar::Archive::new(stream);

        for entry in archive.entries()? {
            let mut entry = entry?;
            let header = entry.header();

            let record = EntryRecord {
                name: String::from_utf8_lossy(&entry.path_bytes()).into_owned(),
                is_dir: header.entry_type().is_dir(),
                size: header.size().ok(),
                checksum: None,
                last_modified: header
                    .mtime()
                    .ok()
                    .and_then(|secs| Utc.timestamp_opt(secs as i64, 0).single()),
            };

            if let ControlFlow::Break(()) = visit(&record, &mut entry)? {
                break;
            }
        }

        Ok(())
    }
}

/// Unsigned sum of the block with the checksum field read as spaces.
fn checksum(block: &[u8]) -> u32 {
    block
        .iter()
        .enumerate()
        .map(|(i, b)| {
            if CHECKSUM_FIELD.contains(&i) {
                u32::from(b' ')
            } else {
                u32::from(*b)
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = ::tar::Builder::new(Vec::new());
        for (name, data) in files {
            let mut header = ::tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(1_600_000_000);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn sniffs_ustar_magic() {
        let data = archive(&[("a.txt", b"a")]);
        assert!(Tar.sniff(&data));
        assert!(!Tar.sniff(b"not a tar"));
    }

    #[test]
    fn confirms_only_checksummed_headers() {
        let data = archive(&[("a.txt", b"a")]);
        assert!(Tar.confirm(&data[..512]));

        let mut forged = vec![b' '; 512];
        forged[257..262].copy_from_slice(b"ustar");
        assert!(Tar.sniff(&forged));
        assert!(!Tar.confirm(&forged));
        assert!(!Tar.confirm(&data[..300]));
    }

    #[test]
    fn enumerates_in_order() {
        let data = archive(&[("one.txt", b"1"), ("dir/two.txt", b"22")]);
        let mut seen = vec![];
        Tar.entries(&mut &data[..], &mut |record, stream| {
            let mut body = String::new();
            stream.read_to_string(&mut body)?;
            seen.push((record.name.clone(), record.size, body));
            assert_eq!(record.last_modified.map(|t| t.timestamp()), Some(1_600_000_000));
            Ok(ControlFlow::Continue(()))
        })
        .unwrap();

        assert_eq!(
            seen,
            vec![
                ("one.txt".to_string(), Some(1), "1".to_string()),
                ("dir/two.txt".to_string(), Some(2), "22".to_string()),
            ]
        );
    }

    #[test]
    fn break_stops_enumeration() {
        let data = archive(&[("one.txt", b"1"), ("two.txt", b"2")]);
        let mut count = 0;
        Tar.entries(&mut &data[..], &mut |_, _| {
            count += 1;
            Ok(ControlFlow::Break(()))
        })
        .unwrap();
        assert_eq!(count, 1);
    }
}
