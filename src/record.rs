use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

/// One indexed document. Field order is the order the browser consumer sees in the
/// artifact, so keep it stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub title: String,
    pub headings: String,
    pub meta_tags: String,
    pub body: String,
    /// Root-relative, `/`-separated. Unique within an index.
    pub path: String,
}

/// Build the record key for a root-relative path: components joined with `/` on every
/// platform, with `.` components dropped.
///
/// Returns `None` if the path escapes the root or is absolute.
pub fn record_key(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
