//! Deciding what a stream is and sending it to the matching handler.

use std::fmt;
use std::io::Read;
use std::rc::Rc;

use tracing::debug;

use crate::combine::{Combiner, Discard};
use crate::compressor::CompressorAdapter;
use crate::content::{Content, ContentHandler, Handler, Opener};
use crate::error::Result;
use crate::format::{ArchiveFormat, CompressorFormat, Registry};
use crate::path::format_key;
use crate::peek::Rewound;
use crate::policy::{ExceptionPolicy, Propagate};
use crate::select::PathPredicate;
use crate::walk::ArchiveWalker;

/// Tunables of the engine.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Bytes read ahead for format sniffing and trial opening. Tar needs a
    /// full 512-byte header block.
    pub peek_len: usize,
    /// Bytes an entry reproducer buffers in memory before spilling to a
    /// temporary file.
    pub spool_threshold: usize,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        ProcessOptions {
            peek_len: 512,
            spool_threshold: 8 * 1024 * 1024,
        }
    }
}

/// Everything a [`Dispatcher`] needs besides its three delegates.
pub struct DispatchConfig<T> {
    pub registry: Rc<Registry>,
    /// Asked about `"<format>:<path>"` before a stream is treated as that
    /// format. Rejected formats are not tried.
    pub look_into: PathPredicate,
    pub combiner: Rc<dyn Combiner<T>>,
    pub policy: Rc<dyn ExceptionPolicy>,
    pub options: ProcessOptions,
}

impl<T> DispatchConfig<T> {
    /// Every registered format, results discarded, first failure aborts.
    pub fn new() -> Self {
        DispatchConfig {
            registry: Rc::new(Registry::default()),
            look_into: PathPredicate::Always,
            combiner: Rc::new(Discard),
            policy: Rc::new(Propagate),
            options: ProcessOptions::default(),
        }
    }

    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Rc::new(registry);
        self
    }

    pub fn look_into(mut self, look_into: PathPredicate) -> Self {
        self.look_into = look_into;
        self
    }

    pub fn combiner<C: Combiner<T> + 'static>(mut self, combiner: C) -> Self {
        self.combiner = Rc::new(combiner);
        self
    }

    pub fn policy<P: ExceptionPolicy + 'static>(mut self, policy: P) -> Self {
        self.policy = Rc::new(policy);
        self
    }

    pub fn options(mut self, options: ProcessOptions) -> Self {
        self.options = options;
        self
    }
}

impl<T> Default for DispatchConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for DispatchConfig<T> {
    fn clone(&self) -> Self {
        DispatchConfig {
            registry: self.registry.clone(),
            look_into: self.look_into.clone(),
            combiner: self.combiner.clone(),
            policy: self.policy.clone(),
            options: self.options.clone(),
        }
    }
}

/// What a stream turned out to be.
pub enum Detected<'r> {
    Archive(&'r dyn ArchiveFormat),
    Compressor(&'r dyn CompressorFormat),
    Normal,
}

impl fmt::Debug for Detected<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Detected::Archive(format) => write!(f, "Archive({})", format.name()),
            Detected::Compressor(format) => write!(f, "Compressor({})", format.name()),
            Detected::Normal => f.write_str("Normal"),
        }
    }
}

/// Routes a stream to one of three handlers: archive entries go to
/// `archives` one by one, decompressed content goes to `compressors`, and
/// anything else goes to `normal` untouched.
pub struct Dispatcher<T> {
    config: DispatchConfig<T>,
    archives: Handler<T>,
    compressors: Handler<T>,
    normal: Handler<T>,
}

impl<T> Dispatcher<T> {
    pub fn new(
        config: DispatchConfig<T>,
        archives: Handler<T>,
        compressors: Handler<T>,
        normal: Handler<T>,
    ) -> Self {
        Dispatcher {
            config,
            archives,
            compressors,
            normal,
        }
    }

    /// Classifies a stream from its first bytes.
    ///
    /// Archive formats are tried before compressors, each list in registry
    /// order. The first format accepted by the look-into predicate whose
    /// magic is in `header` and which also opens on `header` wins; a format
    /// that sniffs but fails to open passes the stream on to the next one.
    pub fn detect(&self, path: &str, header: &[u8]) -> Detected<'_> {
        let look_into = &self.config.look_into;

        for format in self.config.registry.archives() {
            if look_into.test(&format_key(format.name(), path))
                && format.sniff(header)
                && confirmed(path, format.name(), format.confirm(header))
            {
                return Detected::Archive(format);
            }
        }

        for format in self.config.registry.compressors() {
            if look_into.test(&format_key(format.name(), path))
                && format.sniff(header)
                && confirmed(path, format.name(), format.confirm(header))
            {
                return Detected::Compressor(format);
            }
        }

        Detected::Normal
    }
}

fn confirmed(path: &str, format: &str, opened: bool) -> bool {
    if !opened {
        debug!(path, format, "magic matched but the stream does not open as it");
    }
    opened
}

impl<T> ContentHandler<T> for Dispatcher<T> {
    fn process(
        &self,
        path: &str,
        stream: &mut dyn Read,
        content: &Content,
        opener: &dyn Opener,
    ) -> Result<Option<T>> {
        if self.config.look_into.is_never() || self.config.registry.is_empty() {
            return self.normal.process(path, stream, content, opener);
        }

        let mut stream = Rewound::new(stream, self.config.options.peek_len)?;

        match self.detect(path, stream.header()) {
            Detected::Archive(format) => {
                debug!(path, format = format.name(), "walking archive");
                ArchiveWalker {
                    format,
                    handler: self.archives.as_ref(),
                    combiner: self.config.combiner.as_ref(),
                    policy: self.config.policy.as_ref(),
                    spool_threshold: self.config.options.spool_threshold,
                }
                .walk(path, &mut stream, opener)
            }
            Detected::Compressor(format) => {
                debug!(path, format = format.name(), "decompressing");
                CompressorAdapter {
                    format,
                    handler: self.compressors.as_ref(),
                }
                .adapt(path, &mut stream, opener)
            }
            Detected::Normal => self.normal.process(path, &mut stream, content, opener),
        }
    }
}
