//! The on-disk search index: a single JavaScript statement
//! `const searchIndex = <JSON array>;\n` that a browser can load with a `<script>` tag.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{IndexError, IndexResult};
use crate::record::DocumentRecord;

/// Everything before the JSON array.
pub const ARTIFACT_PREFIX: &str = "const searchIndex = ";
/// Everything after the JSON array.
pub const ARTIFACT_SUFFIX: &str = ";\n";

/// Owns the artifact at one output path.
#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current records.
    ///
    /// A missing artifact is an empty index. An artifact that exists but cannot be read
    /// or parsed is an error, never an empty index, so a later `save` cannot silently
    /// wipe out what was there.
    pub fn load(&self) -> IndexResult<Vec<DocumentRecord>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                return Err(self.corrupt("artifact is not valid UTF-8"));
            }
            Err(source) => {
                return Err(IndexError::StoreUnreadable {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        parse_artifact(&contents).map_err(|reason| self.corrupt(reason))
    }

    /// Replace the artifact with `records`.
    ///
    /// The new contents go to a temp file in the same directory which is then renamed
    /// over the target, so readers see either the old artifact or the new one. On any
    /// failure the old artifact is left as it was.
    pub fn save(&self, records: &[DocumentRecord]) -> IndexResult<()> {
        let rendered = render_artifact(records).map_err(|err| self.persist_error(err.into()))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|err| self.persist_error(err))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|err| self.persist_error(err))?;
        tmp.write_all(rendered.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|err| self.persist_error(err))?;
        self.match_permissions(tmp.as_file())
            .map_err(|err| self.persist_error(err))?;
        tmp.persist(&self.path)
            .map_err(|err| self.persist_error(err.error))?;

        Ok(())
    }

    /// Temp files are created owner-only; the artifact is served to browsers, so give the
    /// replacement the old artifact's mode, or 0644 for a fresh one.
    #[cfg(unix)]
    fn match_permissions(&self, file: &std::fs::File) -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let mode = std::fs::metadata(&self.path)
            .map(|meta| meta.permissions().mode())
            .unwrap_or(0o644);
        file.set_permissions(std::fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    fn match_permissions(&self, _file: &std::fs::File) -> std::io::Result<()> {
        Ok(())
    }

    fn corrupt(&self, reason: impl Into<String>) -> IndexError {
        IndexError::StoreCorrupt {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn persist_error(&self, source: std::io::Error) -> IndexError {
        IndexError::Persist {
            path: self.path.clone(),
            source,
        }
    }
}

/// Render records as the artifact text: two-space indented JSON, non-ASCII characters
/// written literally.
pub fn render_artifact(records: &[DocumentRecord]) -> serde_json::Result<String> {
    let json = serde_json::to_string_pretty(records)?;
    Ok(format!("{ARTIFACT_PREFIX}{json}{ARTIFACT_SUFFIX}"))
}

/// Recover the records from artifact text. The trailing `;` and newline are optional.
pub fn parse_artifact(contents: &str) -> Result<Vec<DocumentRecord>, String> {
    let json = contents
        .strip_prefix(ARTIFACT_PREFIX)
        .ok_or_else(|| format!("missing `{}` prefix", ARTIFACT_PREFIX.trim_end()))?;
    let json = json.trim_end();
    let json = json.strip_suffix(';').unwrap_or(json);

    serde_json::from_str(json).map_err(|err| format!("invalid JSON array: {err}"))
}

/// Insert-or-replace by `path`: drop any record with the same path, then append
/// `record`. Untouched records keep their relative order.
pub fn upsert(records: Vec<DocumentRecord>, record: DocumentRecord) -> Vec<DocumentRecord> {
    let mut updated: Vec<DocumentRecord> = records
        .into_iter()
        .filter(|existing| existing.path != record.path)
        .collect();
    updated.push(record);
    updated
}

/// Drop every record with `path`. Returns the remaining records and whether anything
/// was removed.
pub fn remove(records: Vec<DocumentRecord>, path: &str) -> (Vec<DocumentRecord>, bool) {
    let before = records.len();
    let remaining: Vec<DocumentRecord> = records
        .into_iter()
        .filter(|existing| existing.path != path)
        .collect();
    let removed = remaining.len() != before;
    (remaining, removed)
}

/// Drop the record at `prefix` and every record whose path lies beneath it
/// (`prefix/...`). Returns the remaining records and how many were removed.
pub fn remove_tree(records: Vec<DocumentRecord>, prefix: &str) -> (Vec<DocumentRecord>, usize) {
    let before = records.len();
    let nested = format!("{prefix}/");
    let remaining: Vec<DocumentRecord> = records
        .into_iter()
        .filter(|existing| existing.path != prefix && !existing.path.starts_with(&nested))
        .collect();
    let removed = before - remaining.len();
    (remaining, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn record(path: &str, body: &str) -> DocumentRecord {
        DocumentRecord {
            title: format!("Title of {path}"),
            headings: String::new(),
            meta_tags: String::new(),
            body: body.to_string(),
            path: path.to_string(),
        }
    }

    fn paths(records: &[DocumentRecord]) -> Vec<&str> {
        records.iter().map(|r| r.path.as_str()).collect()
    }

    #[test]
    fn test_load_missing_artifact_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("search_index.js"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("search_index.js"));
        let records = vec![record("a.html", "Привет, мир"), record("sub/b.html", "World")];

        store.save(&records).unwrap();
        assert_eq!(store.load().unwrap(), records);

        // save(load(x)) leaves the file byte-identical
        let first = fs::read(store.path()).unwrap();
        store.save(&store.load().unwrap()).unwrap();
        assert_eq!(fs::read(store.path()).unwrap(), first);
    }

    #[test]
    fn test_artifact_format_is_exact() {
        let rendered = render_artifact(&[record("ü.html", "Grüße")]).unwrap();
        let expected = "const searchIndex = [\n  {\n    \"title\": \"Title of ü.html\",\n    \"headings\": \"\",\n    \"meta_tags\": \"\",\n    \"body\": \"Grüße\",\n    \"path\": \"ü.html\"\n  }\n];\n";
        assert_eq!(rendered, expected);
        assert_eq!(render_artifact(&[]).unwrap(), "const searchIndex = [];\n");
    }

    #[test]
    fn test_parse_tolerates_missing_terminator() {
        let with = "const searchIndex = [];\n";
        let without_newline = "const searchIndex = [];";
        let bare = "const searchIndex = []";
        for text in [with, without_newline, bare] {
            assert!(parse_artifact(text).unwrap().is_empty(), "{text:?}");
        }
    }

    #[test]
    fn test_load_corrupt_artifact_is_distinct_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search_index.js");
        let store = IndexStore::new(&path);

        fs::write(&path, "const searchIndex = [{\"title\": ").unwrap();
        assert!(matches!(store.load(), Err(IndexError::StoreCorrupt { .. })));

        fs::write(&path, "var other = [];\n").unwrap();
        assert!(matches!(store.load(), Err(IndexError::StoreCorrupt { .. })));

        fs::write(&path, [0xffu8, 0xfe, 0x00]).unwrap();
        assert!(matches!(store.load(), Err(IndexError::StoreCorrupt { .. })));
    }

    #[test]
    fn test_load_rejects_records_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search_index.js");
        fs::write(&path, "const searchIndex = [{\"path\": \"a.html\"}];\n").unwrap();
        let store = IndexStore::new(&path);
        assert!(matches!(store.load(), Err(IndexError::StoreCorrupt { .. })));
    }

    #[test]
    fn test_failed_save_keeps_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search_index.js");
        let store = IndexStore::new(&path);
        store.save(&[record("a.html", "old")]).unwrap();
        let before = fs::read(&path).unwrap();

        // A directory where the parent should be makes the temp file creation fail.
        let blocked = IndexStore::new(path.join("nested.js"));
        let err = blocked.save(&[record("b.html", "new")]).unwrap_err();
        assert!(matches!(err, IndexError::Persist { .. }));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_save_creates_missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("assets/js/search_index.js"));
        store.save(&[record("a.html", "x")]).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_save_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("search_index.js"));
        store.save(&[record("a.html", "x")]).unwrap();
        store.save(&[record("b.html", "y")]).unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_artifact_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("search_index.js"));
        store.save(&[]).unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_upsert_replaces_and_moves_to_end() {
        let records = vec![record("a.html", "1"), record("b.html", "2"), record("c.html", "3")];
        let updated = upsert(records, record("a.html", "new"));
        assert_eq!(paths(&updated), vec!["b.html", "c.html", "a.html"]);
        assert_eq!(updated[2].body, "new");
    }

    #[test]
    fn test_upsert_appends_new_path() {
        let updated = upsert(vec![record("a.html", "1")], record("b.html", "2"));
        assert_eq!(paths(&updated), vec!["a.html", "b.html"]);
    }

    #[test]
    fn test_upsert_collapses_duplicates() {
        // Even a sequence that already violates uniqueness ends with exactly one record.
        let records = vec![record("a.html", "1"), record("b.html", "2"), record("a.html", "3")];
        let updated = upsert(records, record("a.html", "4"));
        assert_eq!(updated.iter().filter(|r| r.path == "a.html").count(), 1);
        assert_eq!(paths(&updated), vec!["b.html", "a.html"]);
    }

    #[test]
    fn test_upsert_twice_equals_last_upsert() {
        let base = vec![record("a.html", "1"), record("b.html", "2")];
        let twice = upsert(upsert(base.clone(), record("a.html", "n1")), record("a.html", "n2"));
        let once = upsert(base, record("a.html", "n2"));
        assert_eq!(twice, once);
    }

    #[test]
    fn test_remove() {
        let records = vec![record("a.html", "1"), record("b.html", "2"), record("c.html", "3")];
        let (remaining, removed) = remove(records, "b.html");
        assert!(removed);
        assert_eq!(paths(&remaining), vec!["a.html", "c.html"]);

        let (unchanged, removed) = remove(remaining, "zzz.html");
        assert!(!removed);
        assert_eq!(unchanged.len(), 2);
    }

    #[test]
    fn test_remove_tree_matches_whole_components() {
        let records = vec![
            record("old/x.html", "1"),
            record("older.html", "2"),
            record("old/deep/y.html", "3"),
            record("oldies/z.html", "4"),
        ];
        let (remaining, removed) = remove_tree(records, "old");
        assert_eq!(removed, 2);
        assert_eq!(paths(&remaining), vec!["older.html", "oldies/z.html"]);

        let (remaining, removed) = remove_tree(remaining, "older.html");
        assert_eq!(removed, 1);
        assert_eq!(paths(&remaining), vec!["oldies/z.html"]);

        let (unchanged, removed) = remove_tree(remaining, "missing");
        assert_eq!(removed, 0);
        assert_eq!(unchanged.len(), 1);
    }
}
