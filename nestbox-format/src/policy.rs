//! What happens when one archive entry fails.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{trace, warn};

use crate::error::{ProcessError, Result};

/// Decides the fate of an archive entry whose handler failed.
///
/// Returning `Ok(())` skips the entry and the walk goes on with the next one;
/// returning an error aborts the walk of the enclosing archive.
///
/// The engine itself is single-threaded and asks for no `Sync` bound. A
/// policy shared between drivers running on different threads must be
/// `Sync` itself; wrap it in an [`Arc`] and hand each driver a [`Shared`].
pub trait ExceptionPolicy {
    fn on_error(&self, path: &str, error: ProcessError) -> Result<()>;
}

impl<F> ExceptionPolicy for F
where
    F: Fn(&str, ProcessError) -> Result<()>,
{
    fn on_error(&self, path: &str, error: ProcessError) -> Result<()> {
        self(path, error)
    }
}

/// A policy shared between drivers on different threads.
#[derive(Debug)]
pub struct Shared<P: ?Sized>(pub Arc<P>);

impl<P: ExceptionPolicy + Sync + ?Sized> ExceptionPolicy for Shared<P> {
    fn on_error(&self, path: &str, error: ProcessError) -> Result<()> {
        self.0.on_error(path, error)
    }
}

/// Aborts on the first failure, naming the entry that failed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Propagate;

impl ExceptionPolicy for Propagate {
    fn on_error(&self, path: &str, error: ProcessError) -> Result<()> {
        Err(error.at(path))
    }
}

/// Silently skips failing entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ignore;

impl ExceptionPolicy for Ignore {
    fn on_error(&self, path: &str, error: ProcessError) -> Result<()> {
        trace!(path, %error, "ignoring failed entry");
        Ok(())
    }
}

/// Logs failing entries as warnings, counts them and carries on.
#[derive(Debug, Default)]
pub struct LogAndContinue {
    failures: AtomicUsize,
}

impl LogAndContinue {
    pub fn new() -> LogAndContinue {
        LogAndContinue::default()
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }
}

impl ExceptionPolicy for LogAndContinue {
    fn on_error(&self, path: &str, error: ProcessError) -> Result<()> {
        self.failures.fetch_add(1, Ordering::Relaxed);
        warn!(path, kind = ?error.kind(), "skipping entry: {}", report(&error));
        Ok(())
    }
}

/// Formats an error with its chain of causes, `a: b: c`.
pub fn report(error: &(dyn std::error::Error + 'static)) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io;

    fn failure() -> ProcessError {
        io::Error::new(io::ErrorKind::Other, "disk on fire").into()
    }

    #[test]
    fn propagate_attributes_path() {
        let error = Propagate.on_error("a.zip!b.txt", failure()).unwrap_err();
        assert_eq!(error.path(), Some("a.zip!b.txt"));
        assert_eq!(error.kind(), ErrorKind::Stream);
    }

    #[test]
    fn log_and_continue_counts() {
        let policy = Arc::new(LogAndContinue::new());
        let first = Shared(policy.clone());
        let second = Shared(policy.clone());
        first.on_error("a", failure()).unwrap();
        second.on_error("b", failure()).unwrap();
        assert_eq!(policy.failures(), 2);
    }

    #[test]
    fn report_includes_causes() {
        let error = failure().at("x.tar!y");
        let text = report(&error);
        assert!(text.starts_with("Cannot process `x.tar!y`"));
        assert!(text.ends_with("disk on fire"));
    }
}
