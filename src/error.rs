use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BakeError {
    #[error("failed to find target {0}")]
    TargetNotFound(String),

    #[error("could not find any target matching '{pattern}'")]
    PatternNoMatch { pattern: String },

    #[error("invalid override key '{key}', expected {expected}")]
    InvalidOverrideKey { key: String, expected: &'static str },

    #[error("unknown override key: {0}")]
    UnknownOverrideField(String),

    #[error("invalid value {value} for boolean key {field}")]
    InvalidBooleanValue { field: String, value: String },

    #[error("could not match targets with '{pattern}': {source}")]
    InvalidGlobPattern {
        pattern: String,
        source: globset::Error,
    },

    #[error("target inheritance cycle: {}", chain.join(" -> "))]
    InheritanceCycle { chain: Vec<String> },

    #[error("group cycle: {}", chain.join(" -> "))]
    GroupCycle { chain: Vec<String> },

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    JsonError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to parse {path}: parsing toml: {toml}, parsing json: {json}")]
    UnrecognizedFormat {
        path: PathBuf,
        toml: String,
        json: String,
    },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unknown key '{key}' in {path} (line {line})")]
    UnknownKey {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Unknown keys in config file")]
    UnknownKeys(Vec<BakeError>),

    #[error("No bake files found in {0}")]
    NoConfigFiles(PathBuf),

    #[error("Failed to render definition: {0}")]
    RenderError(#[from] serde_json::Error),
}
