//! Looks into archives and compressed streams, recursively.
//!
//! Give [`recursive`] a terminal [`ContentHandler`] and it returns a handler
//! that sniffs every stream it is handed: archives are walked entry by entry,
//! compressed streams are decompressed, and each of those is sniffed again,
//! to any depth. Whatever is neither ends up at the terminal handler, named
//! by a path recording how it was reached (`outer.zip!inner.tar.gz%!leaf`).
//!
//! ```no_run
//! use nestbox_format::{handler, recursive, Count, DispatchConfig};
//!
//! let sizes = handler(|path, stream, _, _| {
//!     let size = std::io::copy(stream, &mut std::io::sink())?;
//!     println!("{} {}", size, path);
//!     Ok(Some(1u64))
//! });
//! let walker = recursive(DispatchConfig::new().combiner(Count), sizes);
//! nestbox_format::fs::process_file(walker.as_ref(), "release.tar.gz").unwrap();
//! ```

pub mod combine;
mod compressor;
mod content;
mod dispatch;
mod error;
pub mod format;
pub mod fs;
pub mod path;
mod peek;
pub mod policy;
mod recursive;
mod select;
mod walk;

pub use combine::{Combiner, Concat, Count, Discard, Sum};
pub use compressor::{CompressorAdapter, DecompressedOpener};
pub use content::{handler, skip, Content, ContentHandler, Handler, Opener};
pub use dispatch::{DispatchConfig, Detected, Dispatcher, ProcessOptions};
pub use error::{DecodeFailure, ErrorKind, FormatMismatch, ProcessError, Result};
pub use format::{ArchiveFormat, CompressorFormat, EntryRecord, Registry};
pub use policy::{ExceptionPolicy, Ignore, LogAndContinue, Propagate, Shared};
pub use recursive::{recursive, Knot};
pub use select::{select, PathPredicate};
pub use walk::{ArchiveWalker, EntryOpener};
