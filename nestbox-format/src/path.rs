//! Stream identities.
//!
//! A nested stream's path is always its container's path plus a delimiter,
//! so the nesting depth can be read back by counting delimiters:
//!
//! - `archive!entry` names a member of an archive,
//! - `stream%` names the decompressed content of a compressed stream.

use relative_path::RelativePath;

/// Separates an archive's path from the name of one of its entries.
pub const ARCHIVE_SEP: char = '!';

/// Appended to a compressed stream's path to name its decompressed content.
pub const DECOMPRESSED_SUFFIX: char = '%';

/// Separates a format name from a path in look-into predicate keys.
pub const FORMAT_SEP: char = ':';

pub fn entry_path(archive: &str, entry: &str) -> String {
    let mut path = String::with_capacity(archive.len() + entry.len() + 1);
    path.push_str(archive);
    path.push(ARCHIVE_SEP);
    path.push_str(entry);
    path
}

pub fn decompressed_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    out.push_str(path);
    out.push(DECOMPRESSED_SUFFIX);
    out
}

/// The key a look-into predicate is asked about: `"<format>:<path>"`.
pub fn format_key(format: &str, path: &str) -> String {
    format!("{}{}{}", format, FORMAT_SEP, path)
}

/// Normalizes an archive entry name into the form used in entry paths.
///
/// Backslashes become slashes, leading slashes are dropped and `.`/`..`
/// components are resolved.
pub fn normalize_entry_name(name: &str) -> String {
    let name = name.replace('\\', "/");
    RelativePath::new(name.trim_start_matches('/'))
        .normalize()
        .into_string()
}

/// Number of containers enclosing `path`.
pub fn depth(path: &str) -> usize {
    path.chars()
        .filter(|c| *c == ARCHIVE_SEP || *c == DECOMPRESSED_SUFFIX)
        .count()
}
