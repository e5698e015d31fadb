/// What happened to an indexed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    /// Deleted, or renamed to somewhere it is no longer indexed under this path.
    Removed,
    /// A path that may have been a directory left the corpus: the record at the path
    /// and every record beneath it are gone.
    RemovedTree,
}

/// A classified change to one document, already filtered to indexable files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Record key: root-relative, `/`-separated. For `RemovedTree` a key prefix.
    pub path: String,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}
