use std::cell::RefCell;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::rc::Rc;

use nestbox_format::{fs::process_file, handler, recursive, Sum};
use serde::Serialize;
use tracing::debug;

use crate::driver::Driver;
use crate::error::Result;
use crate::util::print_json;

#[derive(Debug, Serialize)]
pub struct Match {
    path: String,
    line: u64,
    text: String,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    total: u64,
    matches: &'a [Match],
}

pub fn run(driver: &Driver, paths: &[PathBuf], needle: &str, json: bool) -> Result<()> {
    let (matches, total) = collect(driver, paths, needle)?;

    if json {
        return print_json(&Report {
            total,
            matches: &matches,
        });
    }

    for m in matches.iter() {
        println!("{}:{}:{}", m.path, m.line, m.text);
    }

    Ok(())
}

/// Longest stretch read as one line; longer lines are searched in pieces.
const MAX_LINE: u64 = 64 * 1024;

/// Like grep, a NUL in the first buffer marks the leaf as binary.
fn looks_binary(reader: &mut dyn BufRead) -> std::io::Result<bool> {
    Ok(reader.fill_buf()?.contains(&0))
}

/// Reads up to the next newline, but never more than [`MAX_LINE`] bytes.
fn read_line(reader: &mut dyn BufRead, line: &mut Vec<u8>) -> std::io::Result<usize> {
    line.clear();
    reader.take(MAX_LINE).read_until(b'\n', line)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

fn collect(driver: &Driver, paths: &[PathBuf], needle: &str) -> Result<(Vec<Match>, u64)> {
    let searched = driver.run(paths, |path| {
        let found = Rc::new(RefCell::new(Vec::new()));
        let sink = found.clone();
        let needle = needle.as_bytes().to_vec();

        let search = handler(move |path, stream, _, _| {
            let mut reader = BufReader::new(stream);
            if looks_binary(&mut reader)? {
                debug!(path, "skipping binary leaf");
                return Ok(Some(0));
            }

            let mut line = Vec::new();
            let mut number = 0;
            let mut count = 0;
            let mut starts_line = true;

            loop {
                if read_line(&mut reader, &mut line)? == 0 {
                    break;
                }
                // Pieces of an overlong line share its number.
                if starts_line {
                    number += 1;
                }
                starts_line = line.ends_with(b"\n");
                if contains(&line, &needle) {
                    count += 1;
                    sink.borrow_mut().push(Match {
                        path: path.to_string(),
                        line: number,
                        text: String::from_utf8_lossy(&line).trim_end().to_string(),
                    });
                }
            }

            Ok(Some(count))
        });

        let walker = recursive(driver.config().combiner(Sum), driver.include(search));
        let total = process_file(walker.as_ref(), path)?.unwrap_or(0);
        let matches = found.take();
        Ok((matches, total))
    })?;

    let mut all = Vec::new();
    let mut total = 0;
    for (_, (matches, count)) in searched {
        all.extend(matches);
        total += count;
    }

    Ok((all, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    #[test]
    fn finds_lines_inside_nested_files() {
        let (_dir, path) = fixtures::release();
        let (matches, total) = collect(&fixtures::driver(&[]), &[path], "beta").unwrap();

        assert_eq!(total, 2);
        let lines: Vec<_> = matches.iter().map(|m| (m.line, m.text.as_str())).collect();
        assert_eq!(lines, [(2, "beta"), (3, "gamma beta")]);
        assert!(matches[0].path.ends_with("release.tar.gz%!notes.txt"));
    }

    #[test]
    fn no_match_is_not_an_error() {
        let (_dir, path) = fixtures::release();
        let (matches, total) = collect(&fixtures::driver(&[]), &[path], "delta").unwrap();
        assert!(matches.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn binary_leaves_are_skipped() {
        let (_dir, path) = fixtures::release();
        // Matches inside the binary `bin/tool` only.
        let (matches, total) = collect(&fixtures::driver(&[]), &[path], "ELF").unwrap();
        assert!(matches.is_empty());
        assert_eq!(total, 0);

        assert!(looks_binary(&mut &b"\x7fELF\x00\x00"[..]).unwrap());
        assert!(!looks_binary(&mut &b"alpha\nbeta\n"[..]).unwrap());
    }

    #[test]
    fn lines_are_read_in_bounded_pieces() {
        let long = vec![b'a'; MAX_LINE as usize + 10];
        let mut reader = &long[..];
        let mut line = Vec::new();

        assert_eq!(read_line(&mut reader, &mut line).unwrap(), MAX_LINE as usize);
        assert_eq!(read_line(&mut reader, &mut line).unwrap(), 10);
        assert_eq!(line.len(), 10);
        assert_eq!(read_line(&mut reader, &mut line).unwrap(), 0);
    }

    #[test]
    fn literal_search() {
        assert!(contains(b"a.b", b"."));
        assert!(!contains(b"ab", b"."));
        assert!(contains(b"anything", b""));
    }
}
