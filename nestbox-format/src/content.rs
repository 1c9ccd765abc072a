//! The handler contract every stage of the engine speaks.

use std::io::Read;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::error::Result;

/// Advisory metadata travelling with a stream.
///
/// The engine never validates any of it; it is passed through unchanged to
/// whichever handler ends up consuming the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Content {
    pub size: Option<u64>,
    pub checksum: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Reproduces a stream from its first byte.
///
/// Every call returns a fresh, independently positioned stream yielding the
/// same bytes. Calling it may have side effects (opening files, re-scanning
/// an outer archive), but never changes the content.
pub trait Opener {
    fn open(&self) -> Result<Box<dyn Read>>;
}

impl<F> Opener for F
where
    F: Fn() -> Result<Box<dyn Read>>,
{
    fn open(&self) -> Result<Box<dyn Read>> {
        self()
    }
}

/// Consumes a named stream and optionally yields a value for it.
///
/// Implementations read from `stream` for as long as they like but do not own
/// it; the caller decides its lifetime. `Ok(None)` means "no result for this
/// path". Errors carry no path: attributing one is the caller's job.
pub trait ContentHandler<T> {
    fn process(
        &self,
        path: &str,
        stream: &mut dyn Read,
        content: &Content,
        opener: &dyn Opener,
    ) -> Result<Option<T>>;
}

impl<T, F> ContentHandler<T> for F
where
    F: Fn(&str, &mut dyn Read, &Content, &dyn Opener) -> Result<Option<T>>,
{
    #[inline(always)]
    fn process(
        &self,
        path: &str,
        stream: &mut dyn Read,
        content: &Content,
        opener: &dyn Opener,
    ) -> Result<Option<T>> {
        self(path, stream, content, opener)
    }
}

/// Shared handle to a content handler.
pub type Handler<T> = Rc<dyn ContentHandler<T>>;

/// Boxes a closure as a [`Handler`].
pub fn handler<T, F>(f: F) -> Handler<T>
where
    F: Fn(&str, &mut dyn Read, &Content, &dyn Opener) -> Result<Option<T>> + 'static,
{
    Rc::new(f)
}

/// A handler that leaves the stream untouched and yields nothing.
pub fn skip<T>() -> Handler<T> {
    handler(|_, _, _, _| Ok(None))
}
