use std::path::PathBuf;

use thiserror::Error;

/// Failures that terminate the enclosing operation (a bulk build or a single update).
///
/// Per-document extraction problems are reported separately as [`ExtractionFailure`]
/// because they never abort the surrounding scan or update loop.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A directory under the corpus root could not be read. Aborts the bulk build
    /// before anything is written. `path` is the entry that failed, which `source`
    /// already names in its message.
    #[error("corpus scan failed: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },

    /// The corpus root itself cannot be resolved, so there is nothing to watch.
    #[error("corpus root {} is not accessible: {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The artifact exists but is not something `save` could have produced.
    #[error("search index {} is corrupt: {reason}", path.display())]
    StoreCorrupt { path: PathBuf, reason: String },

    /// The artifact exists but could not be read at all.
    #[error("failed to read search index {}: {source}", path.display())]
    StoreUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing or renaming the new artifact failed; the previous artifact is untouched.
    #[error("failed to persist search index to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown text encoding label `{0}`")]
    UnknownEncoding(String),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type IndexResult<T> = Result<T, IndexError>;

/// A single document that could not be turned into a record.
#[derive(Debug, Error)]
#[error("failed to extract {}: {cause}", path.display())]
pub struct ExtractionFailure {
    pub path: PathBuf,
    #[source]
    pub cause: ExtractionCause,
}

#[derive(Debug, Error)]
pub enum ExtractionCause {
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),

    #[error("content is not valid {encoding}")]
    Decode { encoding: &'static str },
}
