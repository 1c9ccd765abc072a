use std::path::PathBuf;

use nestbox_format::ProcessError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot walk directory `{}`", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Cannot process file `{}`", .path.display())]
    ProcessFile {
        path: PathBuf,
        #[source]
        source: ProcessError,
    },

    #[error("Invalid pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Invalid look-into rule `{0}`, expected FORMAT:GLOB")]
    InvalidRule(String),

    #[error("Cannot start worker threads")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Cannot write output")]
    Output(#[from] std::io::Error),

    #[error("Cannot encode output")]
    Json(#[from] serde_json::Error),

    #[error("{count} file(s) or entries could not be processed")]
    Failures { count: usize },
}
