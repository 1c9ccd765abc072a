//! Runs a command over every file named on the command line.
//!
//! The engine is single-threaded, so each worker builds its own handler
//! chain for the file it is given. Only the failure counter is shared.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use nestbox_format::{
    select, skip, DispatchConfig, ExceptionPolicy, Handler, LogAndContinue, Shared,
};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{Error, Result};
use crate::filter::Filters;

pub struct Driver {
    filters: Filters,
    keep_going: bool,
    jobs: Option<usize>,
    failures: Arc<LogAndContinue>,
}

impl Driver {
    pub fn new(filters: Filters, keep_going: bool, jobs: Option<usize>) -> Driver {
        Driver {
            filters,
            keep_going,
            jobs,
            failures: Arc::new(LogAndContinue::new()),
        }
    }

    /// Engine configuration for the calling thread.
    pub fn config<T>(&self) -> DispatchConfig<T> {
        let config = DispatchConfig::new().look_into(self.filters.look_into());
        if self.keep_going {
            config.policy(Shared(self.failures.clone()))
        } else {
            config
        }
    }

    /// Puts the include patterns in front of `terminal`.
    pub fn include<T: 'static>(&self, terminal: Handler<T>) -> Handler<T> {
        select(self.filters.include(), terminal, skip())
    }

    /// Calls `per_file` for every file under `paths`, in parallel, and
    /// returns the results in walk order.
    ///
    /// With `--keep-going` a failing file is logged, counted and left out;
    /// otherwise the first failure in walk order is returned.
    pub fn run<R, F>(&self, paths: &[PathBuf], per_file: F) -> Result<Vec<(PathBuf, R)>>
    where
        R: Send,
        F: Fn(&Path) -> nestbox_format::Result<R> + Sync,
    {
        let files = expand(paths)?;
        debug!(files = files.len(), "processing");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs.unwrap_or(0))
            .build()?;
        let results: Vec<_> = pool.install(|| {
            files
                .into_par_iter()
                .map(|path| {
                    let result = per_file(&path);
                    (path, result)
                })
                .collect()
        });

        let mut done = Vec::with_capacity(results.len());
        for (path, result) in results {
            match result {
                Ok(value) => done.push((path, value)),
                Err(source) if self.keep_going => {
                    self.failures
                        .on_error(&path.display().to_string(), source)
                        .map_err(|source| Error::ProcessFile {
                            path: path.clone(),
                            source,
                        })?;
                }
                Err(source) => return Err(Error::ProcessFile { path, source }),
            }
        }

        Ok(done)
    }

    /// Fails if anything was skipped along the way.
    pub fn finish(&self) -> Result<()> {
        match self.failures.failures() {
            0 => Ok(()),
            count => Err(Error::Failures { count }),
        }
    }
}

/// Replaces directories with the files below them, sorted by name.
fn expand(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        for entry in jwalk::WalkDir::new(path).sort(true) {
            let entry = entry.map_err(|source| Error::Walk {
                path: path.clone(),
                source: source.into(),
            })?;
            if entry.file_type().is_file() {
                files.push(entry.path());
            }
        }
    }

    Ok(files)
}
