//! Core data model and the knobs that control resolution.
//!
//! A [`Config`] is what one bake file parses into, and also what all files
//! fold into. Every [`Target`] field is optional so that layering can tell a
//! field that was never mentioned (`None`) from one that was deliberately set
//! to an empty value (`Some(vec![])`).
//!
//! # File shape
//!
//! ```toml
//! [group.default]
//! targets = ["webapp", "db"]
//!
//! [target.base]
//! args = { GO_VERSION = "1.22" }
//!
//! [target.webapp]
//! inherits = ["base"]
//! dockerfile = "Dockerfile.webapp"
//! tags = ["registry/webapp:latest"]
//! ```
//!
//! The same structure is accepted as JSON.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Groups and targets, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub group: BTreeMap<String, Group>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub target: BTreeMap<String, Target>,
}

/// An ordered list of member names. Members may be targets or other groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub targets: Vec<String>,
}

impl Group {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }
}

/// A partially specified build target.
///
/// How each field layers over another is defined in [`merge`](crate::merge).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Target {
    /// Names of targets whose fields this one starts from. Never set by overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_map",
        skip_serializing_if = "Option::is_none"
    )]
    pub args: Option<BTreeMap<String, String>>,
    #[serde(
        default,
        deserialize_with = "string_map",
        skip_serializing_if = "Option::is_none"
    )]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_from: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_to: Option<Vec<String>>,
    /// Build stage to stop at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, rename = "secret", skip_serializing_if = "Option::is_none")]
    pub secrets: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<String>>,
    #[serde(default, rename = "output", skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_cache: Option<bool>,
}

/// Build-arg and label values may be written as any scalar; they are stored as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => f.write_str(s),
            Scalar::Integer(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Boolean(b) => write!(f, "{b}"),
        }
    }
}

fn string_map<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Scalar>::deserialize(deserializer)?;
    Ok(Some(
        raw.into_iter().map(|(k, v)| (k, v.to_string())).collect(),
    ))
}

/// What to do when an override pattern matches no known target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnmatchedPattern {
    /// Abort resolution with [`BakeError::PatternNoMatch`](crate::BakeError::PatternNoMatch).
    #[default]
    Error,
    /// Log a warning and drop the override.
    Skip,
}

/// What to do when a target inherits itself or a group contains itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CyclePolicy {
    /// Stop expanding at the repeated name and keep whatever was gathered so far.
    #[default]
    Truncate,
    /// Fail with an error naming the cycle.
    Error,
}

/// Policies applied by the resolution engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    pub on_unmatched: UnmatchedPattern,
    pub on_cycle: CyclePolicy,
}

/// An operation on a set of bake files, independent of any CLI framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BakeAction {
    /// Resolve the requested targets and render them as JSON.
    Print,
    /// List the groups and targets the merged files define.
    List,
}
