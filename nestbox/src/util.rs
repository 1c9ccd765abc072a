use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use humansize::{file_size_opts as options, FileSize};
use serde::Serialize;

pub fn format_size(size: u64) -> String {
    size.file_size(options::BINARY)
        .unwrap_or_else(|_| size.to_string())
}

pub fn format_time(time: Option<&DateTime<Utc>>) -> Option<String> {
    time.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Pretty-prints `value` as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> crate::error::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
