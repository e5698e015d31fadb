use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IndexError, IndexResult};

/// Returns true if the file name ends with `.{extension}`.
///
/// This is the one predicate deciding what is indexable; the corpus walk and the
/// change watcher both go through it.
pub fn has_indexed_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(extension))
        .is_some_and(|stem| stem.ends_with('.'))
}

/// Walk `root` and collect the root-relative paths of every regular file whose name
/// ends with `.{extension}`.
///
/// Nothing is skipped: hidden files and `.gitignore`d paths are part of the corpus.
/// Entries are visited in file-name order within each directory, so the result is
/// deterministic for an unchanged tree.
///
/// An unreadable directory aborts the walk with [`IndexError::Scan`].
pub fn scan_corpus(root: &Path, extension: &str) -> IndexResult<Vec<PathBuf>> {
    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = result.map_err(|source| IndexError::Scan {
            path: failed_path(&source).unwrap_or(root).to_path_buf(),
            source,
        })?;

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        if !has_indexed_extension(path, extension) {
            continue;
        }

        // The walker only yields paths under `root`.
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };

        debug!("found {}", relative.display());
        files.push(relative.to_path_buf());
    }

    Ok(files)
}

/// The path an `ignore` walk error is about, looking through its depth and line wrappers.
fn failed_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path),
        ignore::Error::Loop { child, .. } => Some(child),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            failed_path(err)
        }
        _ => None,
    }
}
