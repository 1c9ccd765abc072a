use std::io;
use std::path::PathBuf;

use nestbox_format::{fs::process_file, handler, recursive, Concat};
use serde::Serialize;

use crate::driver::Driver;
use crate::error::Result;
use crate::util::{format_size, format_time, print_json};

#[derive(Debug, Serialize)]
pub struct Row {
    path: String,
    size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<String>,
}

pub fn run(driver: &Driver, paths: &[PathBuf], json: bool) -> Result<()> {
    let rows = collect(driver, paths)?;

    if json {
        return print_json(&rows);
    }

    println!("{:>12}  {:>8}  {:<20}  Path", "Size", "CRC-32", "Modified");
    println!("{}", "-".repeat(60));
    for row in rows.iter() {
        println!(
            "{:>12}  {:>8}  {:<20}  {}",
            format_size(row.size),
            row.checksum
                .map(|c| format!("{:08x}", c))
                .unwrap_or_else(|| "-".into()),
            row.modified.as_deref().unwrap_or("-"),
            row.path,
        );
    }

    Ok(())
}

fn collect(driver: &Driver, paths: &[PathBuf]) -> Result<Vec<Row>> {
    let listed = driver.run(paths, |path| {
        let rows = handler(|path, stream, content, _| {
            // Declared sizes are advisory and unknown for decompressed streams.
            let size = io::copy(stream, &mut io::sink())?;
            Ok(Some(vec![Row {
                path: path.to_string(),
                size,
                checksum: content.checksum,
                modified: format_time(content.last_modified.as_ref()),
            }]))
        });
        let walker = recursive(driver.config().combiner(Concat), driver.include(rows));
        Ok(process_file(walker.as_ref(), path)?.unwrap_or_default())
    })?;

    Ok(listed.into_iter().flat_map(|(_, rows)| rows).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    #[test]
    fn lists_every_leaf() {
        let (_dir, path) = fixtures::release();
        let rows = collect(&fixtures::driver(&[]), &[path.clone()]).unwrap();

        let prefix = format!("{}%!", path.display());
        let names: Vec<_> = rows
            .iter()
            .map(|r| r.path.strip_prefix(&prefix).unwrap())
            .collect();
        assert_eq!(names, ["notes.txt", "bin/tool"]);
        assert_eq!(rows[0].size, 22);
        assert_eq!(rows[0].modified.as_deref(), Some("2020-09-13T12:26:40Z"));
        assert_eq!(rows[1].checksum, None);
    }

    #[test]
    fn include_narrows_the_listing() {
        let (_dir, path) = fixtures::release();
        let rows = collect(&fixtures::driver(&["*.txt"]), &[path]).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].path.ends_with("!notes.txt"));
    }
}
