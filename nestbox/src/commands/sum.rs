use std::io;
use std::path::PathBuf;

use nestbox_format::{fs::process_file, handler, recursive, Concat};
use serde::Serialize;
use tracing::warn;

use crate::driver::Driver;
use crate::error::Result;
use crate::hashing::HashingReader;
use crate::util::print_json;

#[derive(Debug, Serialize)]
pub struct Sum {
    path: String,
    crc32: String,
    size: u64,
}

pub fn run(driver: &Driver, paths: &[PathBuf], json: bool) -> Result<()> {
    let sums = collect(driver, paths)?;

    if json {
        return print_json(&sums);
    }

    for sum in sums.iter() {
        println!("{} {:>12} {}", sum.crc32, sum.size, sum.path);
    }

    Ok(())
}

fn collect(driver: &Driver, paths: &[PathBuf]) -> Result<Vec<Sum>> {
    let summed = driver.run(paths, |path| {
        let crc = handler(|path, stream, content, _| {
            let mut hashing = HashingReader::new(stream);
            io::copy(&mut hashing, &mut io::sink())?;
            let size = hashing.bytes_read();
            let crc32 = hashing.finalize();

            match content.checksum {
                Some(declared) if declared != u64::from(crc32) => {
                    warn!(path, declared, actual = crc32, "checksum mismatch");
                }
                _ => {}
            }

            Ok(Some(vec![Sum {
                path: path.to_string(),
                crc32: format!("{:08x}", crc32),
                size,
            }]))
        });
        let walker = recursive(driver.config().combiner(Concat), driver.include(crc));
        Ok(process_file(walker.as_ref(), path)?.unwrap_or_default())
    })?;

    Ok(summed.into_iter().flat_map(|(_, sums)| sums).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    #[test]
    fn sums_every_leaf() {
        let (_dir, path) = fixtures::release();
        let sums = collect(&fixtures::driver(&[]), &[path]).unwrap();

        assert_eq!(sums.len(), 2);
        assert_eq!(
            sums[0].crc32,
            format!("{:08x}", crc32fast::hash(b"alpha\nbeta\ngamma beta\n"))
        );
        assert_eq!(sums[0].size, 22);
        assert_eq!(sums[1].crc32, format!("{:08x}", crc32fast::hash(b"\x7fELF\x02\x01\x01\x00")));
    }

    #[test]
    fn plain_files_are_summed_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        std::fs::write(&path, "just text").unwrap();

        let sums = collect(&fixtures::driver(&[]), &[path.clone()]).unwrap();
        assert_eq!(sums.len(), 1);
        assert_eq!(sums[0].path, path.display().to_string());
        assert_eq!(sums[0].crc32, format!("{:08x}", crc32fast::hash(b"just text")));
    }
}
