use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, ProcessError>;

/// Coarse classification of a [`ProcessError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reading or reopening a stream failed.
    Stream,
    /// A stream was detected as some format but could not be decoded as one.
    FormatMismatch,
    /// A reproducer could not find content it had already seen once.
    ProtocolViolation,
    /// A content handler failed for its own reasons.
    Handler,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("I/O failure while reading stream")]
    Stream(#[source] io::Error),

    #[error(transparent)]
    FormatMismatch(#[from] FormatMismatch),

    #[error("entry `{entry}` vanished when `{archive}` was reopened")]
    EntryVanished { archive: String, entry: String },

    #[error("Cannot process `{path}`")]
    Path {
        path: String,
        #[source]
        source: Box<ProcessError>,
    },

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ProcessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessError::Stream(_) => ErrorKind::Stream,
            ProcessError::FormatMismatch(_) => ErrorKind::FormatMismatch,
            ProcessError::EntryVanished { .. } => ErrorKind::ProtocolViolation,
            ProcessError::Path { source, .. } => source.kind(),
            ProcessError::Other(_) => ErrorKind::Handler,
        }
    }

    /// Wraps a handler-defined failure.
    pub fn other<E>(error: E) -> ProcessError
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        ProcessError::Other(error.into())
    }

    /// Attributes this error to `path`.
    ///
    /// An error that already names a path is returned as is: the innermost
    /// path is always an extension of the outer ones.
    pub fn at(self, path: &str) -> ProcessError {
        match self {
            ProcessError::Path { .. } => self,
            error => ProcessError::Path {
                path: path.to_string(),
                source: Box::new(error),
            },
        }
    }

    /// The path this error was attributed to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            ProcessError::Path { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl From<io::Error> for ProcessError {
    fn from(error: io::Error) -> Self {
        // Codec readers can only fail with `io::Error`, so diagnostics raised
        // inside `Read::read` travel wrapped in one.
        if let Some(mismatch) = FormatMismatch::in_io_error(&error) {
            return ProcessError::FormatMismatch(mismatch.clone());
        }

        ProcessError::Stream(error)
    }
}

/// How a decoder gave up on a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    /// The input ended before the stream was complete.
    EndOfInput,
    /// The decoder rejected the bytes it was given.
    Invalid(String),
}

/// A decompressor could not decode a stream that was sniffed as its format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatMismatch {
    pub format: String,
    pub produced: u64,
    pub failure: DecodeFailure,
}

impl FormatMismatch {
    /// No output at all means the magic bytes matched by accident.
    pub fn is_misdetection(&self) -> bool {
        self.produced == 0
    }

    pub fn ended_early(&self) -> bool {
        self.failure == DecodeFailure::EndOfInput
    }

    pub fn as_io_error(&self) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, self.clone())
    }

    /// The mismatch carried inside `error`, if there is one.
    pub fn in_io_error(error: &io::Error) -> Option<&FormatMismatch> {
        error
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<FormatMismatch>())
    }
}

impl std::error::Error for FormatMismatch {}

impl fmt::Display for FormatMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failure {
            DecodeFailure::EndOfInput => write!(f, "unexpected end of {} stream", self.format)?,
            DecodeFailure::Invalid(detail) => {
                write!(f, "invalid {} data ({})", self.format, detail)?
            }
        }

        if self.is_misdetection() {
            write!(
                f,
                " before any data was decompressed; \
                 the input is probably not {} at all (misdetected)",
                self.format
            )
        } else if self.ended_early() {
            write!(
                f,
                " after {} decompressed bytes; the {} stream is truncated",
                self.produced, self.format
            )
        } else {
            write!(
                f,
                " after {} decompressed bytes; the {} stream is corrupt",
                self.produced, self.format
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_survives_io_error_round_trip() {
        let mismatch = FormatMismatch {
            format: "gzip".into(),
            produced: 0,
            failure: DecodeFailure::EndOfInput,
        };
        let error = ProcessError::from(mismatch.as_io_error());
        assert_eq!(error.kind(), ErrorKind::FormatMismatch);
        assert!(error.to_string().contains("misdetected"));
    }

    #[test]
    fn truncated_message() {
        let mismatch = FormatMismatch {
            format: "gzip".into(),
            produced: 42,
            failure: DecodeFailure::EndOfInput,
        };
        assert!(!mismatch.is_misdetection());
        assert!(mismatch.to_string().contains("truncated"));
    }

    #[test]
    fn invalid_data_names_the_decoder_complaint() {
        let early = FormatMismatch {
            format: "bzip2".into(),
            produced: 0,
            failure: DecodeFailure::Invalid("bad magic".into()),
        };
        assert!(!early.ended_early());
        assert_eq!(
            early.to_string(),
            "invalid bzip2 data (bad magic) before any data was decompressed; \
             the input is probably not bzip2 at all (misdetected)"
        );

        let late = FormatMismatch {
            produced: 7,
            ..early
        };
        assert!(late.to_string().ends_with("the bzip2 stream is corrupt"));
    }

    #[test]
    fn plain_io_error_is_stream() {
        let error = ProcessError::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(error.kind(), ErrorKind::Stream);
    }

    #[test]
    fn at_keeps_innermost_path() {
        let error = ProcessError::EntryVanished {
            archive: "a.zip".into(),
            entry: "b".into(),
        }
        .at("a.zip!b")
        .at("a.zip");
        assert_eq!(error.path(), Some("a.zip!b"));
        assert_eq!(error.kind(), ErrorKind::ProtocolViolation);
    }
}
