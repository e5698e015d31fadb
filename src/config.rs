use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use serde::Deserialize;
use tracing::warn;

use crate::error::{IndexError, IndexResult};

/// Artifact written when no output path is given.
pub const DEFAULT_OUTPUT: &str = "search_index.js";
/// Encoding every document in the corpus is read with unless overridden.
pub const DEFAULT_ENCODING: &str = "windows-1251";
/// File extension (without the dot) of indexable documents.
pub const DEFAULT_EXTENSION: &str = "html";
/// Optional settings file looked up in the corpus root.
pub const CONFIG_FILE: &str = "search-index.toml";

/// Settings loaded from `search-index.toml` at the corpus root.
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Output artifact path.
    pub output: Option<PathBuf>,
    /// Encoding label, e.g. `utf-8` or `windows-1251`.
    pub encoding: Option<String>,
}

impl FileConfig {
    /// Load `search-index.toml` from the given root directory.
    ///
    /// Returns a default (empty) configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    warn!("failed to parse {CONFIG_FILE}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                warn!("failed to read {CONFIG_FILE}: {err}. Using defaults.");
                Self::default()
            }
        }
    }
}

/// Everything a component needs to know about the run. Passed explicitly; there is
/// no global state.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub root: PathBuf,
    pub output: PathBuf,
    pub encoding: &'static Encoding,
    pub extension: String,
}

impl IndexerConfig {
    /// Resolve the final configuration: CLI values win over `search-index.toml`, which
    /// wins over the built-in defaults.
    pub fn resolve(
        root: PathBuf,
        output: Option<PathBuf>,
        encoding: Option<String>,
    ) -> IndexResult<Self> {
        let file = FileConfig::load(&root);

        let output = output
            .or(file.output)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        let label = encoding
            .or(file.encoding)
            .unwrap_or_else(|| DEFAULT_ENCODING.to_string());

        Ok(Self {
            root,
            output,
            encoding: resolve_encoding(&label)?,
            extension: DEFAULT_EXTENSION.to_string(),
        })
    }
}

/// Map a WHATWG encoding label to an encoding.
pub fn resolve_encoding(label: &str) -> IndexResult<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| IndexError::UnknownEncoding(label.to_string()))
}
