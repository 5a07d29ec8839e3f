//! Deserialize bake files while detecting keys the data model does not know.
//!
//! Uses `serde_ignored` to capture any key that [`Config`] doesn't consume. In
//! strict mode each one is reported with its file path and best-effort line
//! number; otherwise they are logged and dropped.

use std::path::Path;

use tracing::debug;

use crate::error::BakeError;
use crate::types::Config;

/// Parse TOML content into a [`Config`].
pub fn deserialize_toml(content: &str, path: &Path, strict: bool) -> Result<Config, BakeError> {
    let mut unknown_keys: Vec<String> = Vec::new();

    let deserializer = toml::Deserializer::new(content);
    let config: Config = serde_ignored::deserialize(deserializer, |ignored_path| {
        unknown_keys.push(ignored_path.to_string());
    })
    .map_err(|e| BakeError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    check_unknown(unknown_keys, path, strict, |key| find_key_line(content, key))?;
    Ok(config)
}

/// Parse JSON content into a [`Config`].
pub fn deserialize_json(content: &str, path: &Path, strict: bool) -> Result<Config, BakeError> {
    let mut unknown_keys: Vec<String> = Vec::new();
    let json_error = |e| BakeError::JsonError {
        path: path.to_path_buf(),
        source: e,
    };

    let mut deserializer = serde_json::Deserializer::from_str(content);
    let config: Config = serde_ignored::deserialize(&mut deserializer, |ignored_path| {
        unknown_keys.push(ignored_path.to_string());
    })
    .map_err(json_error)?;
    deserializer.end().map_err(json_error)?;

    check_unknown(unknown_keys, path, strict, |key| {
        find_json_key_line(content, key)
    })?;
    Ok(config)
}

fn check_unknown(
    unknown_keys: Vec<String>,
    path: &Path,
    strict: bool,
    line_of: impl Fn(&str) -> usize,
) -> Result<(), BakeError> {
    if unknown_keys.is_empty() {
        return Ok(());
    }
    if !strict {
        for key in &unknown_keys {
            debug!(%key, path = %path.display(), "ignoring unknown key");
        }
        return Ok(());
    }

    let errors: Vec<BakeError> = unknown_keys
        .into_iter()
        .map(|key| {
            let line = line_of(&key);
            BakeError::UnknownKey {
                key,
                path: path.to_path_buf(),
                line,
            }
        })
        .collect();

    Err(BakeError::UnknownKeys(errors))
}

/// Find the 1-indexed line number for a dotted key in TOML content.
///
/// `dotted_key` is the path `serde_ignored` reports, segments joined with `.`
/// and unquoted. Each line is mapped to its own full path the same way, so
/// quoted target names (`[target."web.app"]`) and dotted keys
/// (`args.VERSION = "1"`) line up. A table header whose path starts with the
/// key also counts, which locates unknown tables. Inline tables and arrays of
/// tables are not followed. Returns 0 if the key cannot be located.
fn find_key_line(content: &str, dotted_key: &str) -> usize {
    let mut section: Vec<String> = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if trimmed.starts_with("[[") {
            section.clear();
            continue;
        }
        if let Some(header) = trimmed.strip_prefix('[') {
            let header = header.split_once(']').map_or(header, |(h, _)| h);
            section = key_segments(header);
            let joined = section.join(".");
            if joined == dotted_key || is_under(&joined, dotted_key) {
                return i + 1;
            }
            continue;
        }

        let parts = split_unquoted(trimmed, '=');
        let &[key, _] = parts.as_slice() else {
            continue;
        };
        let mut full = section.clone();
        full.extend(key_segments(key));
        let joined = full.join(".");
        if joined == dotted_key || is_under(&joined, dotted_key) {
            return i + 1;
        }
    }
    0
}

/// `path` lies inside the table named `key`.
fn is_under(path: &str, key: &str) -> bool {
    path.strip_prefix(key).is_some_and(|rest| rest.starts_with('.'))
}

/// Unquoted segments of a TOML key or table header.
fn key_segments(key: &str) -> Vec<String> {
    split_unquoted(key, '.')
        .into_iter()
        .map(|s| {
            let s = s.trim();
            s.strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .or_else(|| s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
                .unwrap_or(s)
                .to_string()
        })
        .collect()
}

/// Split on `sep` wherever it is not inside a quoted string. Stops after the
/// first split when `sep` is `=`, so values are returned whole.
fn split_unquoted(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (at, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == sep => {
                parts.push(&s[start..at]);
                start = at + c.len_utf8();
                if sep == '=' {
                    break;
                }
            }
            None => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// First line where the leaf of `dotted_key` appears as a JSON object key, or 0.
fn find_json_key_line(content: &str, dotted_key: &str) -> usize {
    let leaf = dotted_key.rsplit('.').next().unwrap_or(dotted_key);
    let quoted = format!("\"{leaf}\"");

    content
        .lines()
        .position(|line| {
            line.match_indices(&quoted).any(|(at, _)| {
                line[at + quoted.len()..].trim_start().starts_with(':')
            })
        })
        .map_or(0, |i| i + 1)
}
