//! Bake file discovery, loading and format detection.
//!
//! When no files are named explicitly, a directory is searched for the default
//! files in priority-ascending order (later files override earlier ones):
//!
//! 1. `bake.toml`
//! 2. `bake.json`
//! 3. `bake.override.toml`
//! 4. `bake.override.json`
//!
//! Missing defaults are skipped. Files named explicitly must exist.
//!
//! The format follows the extension: `.toml` or `.json`. Any other name is tried
//! as TOML first, then as JSON, and both failures are reported if neither fits.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BakeError;
use crate::types::Config;
use crate::validate;

/// Default bake file names, lowest priority first.
pub const DEFAULT_FILES: &[&str] = &[
    "bake.toml",
    "bake.json",
    "bake.override.toml",
    "bake.override.json",
];

/// Default files present in `dir`, in priority order.
pub fn discover(dir: &Path) -> Vec<PathBuf> {
    DEFAULT_FILES
        .iter()
        .map(|name| dir.join(name))
        .filter(|path| path.is_file())
        .collect()
}

/// Read every file in order. Any missing or unreadable file is an error.
pub fn read_files(paths: &[PathBuf]) -> Result<Vec<(PathBuf, String)>, BakeError> {
    paths
        .iter()
        .map(|path| {
            debug!(path = %path.display(), "reading bake file");
            std::fs::read_to_string(path)
                .map(|content| (path.clone(), content))
                .map_err(|e| BakeError::IoError {
                    path: path.clone(),
                    source: e,
                })
        })
        .collect()
}

/// Parse one file's content, choosing the format from its extension.
pub fn parse_config(path: &Path, content: &str, strict: bool) -> Result<Config, BakeError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("toml") => validate::deserialize_toml(content, path, strict),
        Some("json") => validate::deserialize_json(content, path, strict),
        _ => parse_unknown_format(path, content, strict),
    }
}

fn parse_unknown_format(path: &Path, content: &str, strict: bool) -> Result<Config, BakeError> {
    let toml_err = match validate::deserialize_toml(content, path, strict) {
        Err(BakeError::ParseError { source, .. }) => source,
        other => return other,
    };
    let json_err = match validate::deserialize_json(content, path, strict) {
        Err(BakeError::JsonError { source, .. }) => source,
        other => return other,
    };
    Err(BakeError::UnrecognizedFormat {
        path: path.to_path_buf(),
        toml: toml_err.to_string(),
        json: json_err.to_string(),
    })
}
