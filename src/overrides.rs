//! Parse `--set` style overrides into per-target partial records.
//!
//! Each override has the form `pattern.field[.name][=value]`. The pattern is a
//! target name or a shell-style glob matched against the known target names;
//! every match receives the assignment. Overrides accumulate in order, so
//! repeating `app.tags=...` adds further tags.
//!
//! `args` is the only field that may omit `=value`: `app.args.TOKEN` copies
//! `TOKEN` from the environment table, and is dropped if the variable is absent.

use std::collections::BTreeMap;

use globset::GlobBuilder;
use tracing::{debug, warn};

use crate::error::BakeError;
use crate::types::{Config, Target, UnmatchedPattern};

/// Partial targets keyed by target name, applied last during resolution.
pub type OverrideTable = BTreeMap<String, Target>;

/// Build the override table for `config` from raw override strings.
///
/// Each entry is checked for shape, then its pattern is expanded, then its
/// field and value are interpreted. A pattern that matches nothing is
/// therefore reported before a bad field name or value.
pub fn parse_overrides<S: AsRef<str>>(
    config: &Config,
    raw: &[S],
    env: &BTreeMap<String, String>,
    on_unmatched: UnmatchedPattern,
) -> Result<OverrideTable, BakeError> {
    let mut table = OverrideTable::new();
    for entry in raw {
        let key = OverrideKey::split(entry.as_ref())?;

        let names = expand_targets(config, key.pattern)?;
        if names.is_empty() {
            match on_unmatched {
                UnmatchedPattern::Error => {
                    return Err(BakeError::PatternNoMatch {
                        pattern: key.pattern.to_string(),
                    });
                }
                UnmatchedPattern::Skip => {
                    warn!(pattern = key.pattern, "override matches no target, skipping");
                    continue;
                }
            }
        }
        debug!(pattern = key.pattern, matched = names.len(), "override pattern expanded");

        let assignment = key.assignment(env)?;
        for name in names {
            assignment.apply(table.entry(name).or_default());
        }
    }
    Ok(table)
}

/// Target names addressed by `pattern`, in name order.
///
/// An exact target name matches only itself, even if it contains glob
/// metacharacters. Otherwise `*`, `?` and `[...]` are matched against every
/// target name; `*` does not cross a `/`. Braces are literal and `**` is the
/// same as `*`.
pub fn expand_targets(config: &Config, pattern: &str) -> Result<Vec<String>, BakeError> {
    if config.target.contains_key(pattern) {
        return Ok(vec![pattern.to_string()]);
    }
    let matcher = GlobBuilder::new(&shell_glob(pattern))
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map_err(|source| BakeError::InvalidGlobPattern {
            pattern: pattern.to_string(),
            source,
        })?
        .compile_matcher();

    Ok(config
        .target
        .keys()
        .filter(|name| matcher.is_match(name.as_str()))
        .cloned()
        .collect())
}

/// Rewrite a shell-style pattern so globset's extensions stay inert:
/// `{` and `}` outside a class become single-character classes and runs of
/// `*` collapse to one.
fn shell_glob(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;
    // Characters consumed since the class opened; a leading `]` is literal.
    let mut class_len = 0;

    while let Some(c) = chars.next() {
        if in_class {
            out.push(c);
            if c == ']' && class_len > 0 {
                in_class = false;
            } else if !(class_len == 0 && (c == '!' || c == '^')) {
                class_len += 1;
            }
            continue;
        }
        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '[' => {
                out.push(c);
                in_class = true;
                class_len = 0;
            }
            '{' => out.push_str("[{]"),
            '}' => out.push_str("[}]"),
            '*' => {
                out.push(c);
                while chars.peek() == Some(&'*') {
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// One parsed assignment, ready to apply to any number of targets.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Assignment {
    Context(String),
    Dockerfile(String),
    Stage(String),
    /// `None` when the value was to come from an unset environment variable.
    Arg(String, Option<String>),
    Label(String, String),
    Push(ListField, String),
    Flag(FlagField, bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListField {
    Tags,
    CacheFrom,
    CacheTo,
    Secrets,
    Ssh,
    Platforms,
    Outputs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagField {
    NoCache,
    Pull,
}

impl ListField {
    fn slot(self, t: &mut Target) -> &mut Option<Vec<String>> {
        match self {
            ListField::Tags => &mut t.tags,
            ListField::CacheFrom => &mut t.cache_from,
            ListField::CacheTo => &mut t.cache_to,
            ListField::Secrets => &mut t.secrets,
            ListField::Ssh => &mut t.ssh,
            ListField::Platforms => &mut t.platforms,
            ListField::Outputs => &mut t.outputs,
        }
    }
}

impl FlagField {
    fn slot(self, t: &mut Target) -> &mut Option<bool> {
        match self {
            FlagField::NoCache => &mut t.no_cache,
            FlagField::Pull => &mut t.pull,
        }
    }
}

impl Assignment {
    fn apply(&self, t: &mut Target) {
        match self {
            Assignment::Context(v) => t.context = Some(v.clone()),
            Assignment::Dockerfile(v) => t.dockerfile = Some(v.clone()),
            Assignment::Stage(v) => t.target = Some(v.clone()),
            Assignment::Arg(name, Some(v)) => {
                t.args
                    .get_or_insert_with(BTreeMap::new)
                    .insert(name.clone(), v.clone());
            }
            Assignment::Arg(_, None) => {}
            Assignment::Label(name, v) => {
                t.labels
                    .get_or_insert_with(BTreeMap::new)
                    .insert(name.clone(), v.clone());
            }
            Assignment::Push(field, v) => {
                field.slot(t).get_or_insert_with(Vec::new).push(v.clone());
            }
            Assignment::Flag(field, v) => *field.slot(t) = Some(*v),
        }
    }
}

/// The parts of one override, checked for shape but not yet interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OverrideKey<'a> {
    key: &'a str,
    pattern: &'a str,
    field: &'a str,
    name: Option<&'a str>,
    value: Option<&'a str>,
}

impl<'a> OverrideKey<'a> {
    /// Split `pattern.field[.name][=value]`. Only `args` may omit the value.
    fn split(raw: &'a str) -> Result<Self, BakeError> {
        let (key, value) = match raw.split_once('=') {
            Some((key, value)) => (key, Some(value)),
            None => (raw, None),
        };

        let mut parts = key.splitn(3, '.');
        let pattern = parts.next().unwrap_or_default();
        let field = parts.next().ok_or_else(|| BakeError::InvalidOverrideKey {
            key: key.to_string(),
            expected: "target.field",
        })?;
        let name = parts.next();

        if value.is_none() && field != "args" {
            return Err(BakeError::InvalidOverrideKey {
                key: raw.to_string(),
                expected: "target.field=value",
            });
        }
        Ok(Self {
            key,
            pattern,
            field,
            name,
            value,
        })
    }

    /// Interpret the field and value.
    fn assignment(&self, env: &BTreeMap<String, String>) -> Result<Assignment, BakeError> {
        let value = self.value.unwrap_or_default();

        let assignment = match self.field {
            "context" => Assignment::Context(value.to_string()),
            "dockerfile" => Assignment::Dockerfile(value.to_string()),
            "target" => Assignment::Stage(value.to_string()),
            "args" => {
                let name = self.require_name("target.args.NAME")?;
                let resolved = match self.value {
                    Some(value) => Some(value.to_string()),
                    None => env.get(name).cloned(),
                };
                Assignment::Arg(name.to_string(), resolved)
            }
            "labels" => {
                let name = self.require_name("target.labels.NAME")?;
                Assignment::Label(name.to_string(), value.to_string())
            }
            "tags" => Assignment::Push(ListField::Tags, value.to_string()),
            "cache-from" => Assignment::Push(ListField::CacheFrom, value.to_string()),
            "cache-to" => Assignment::Push(ListField::CacheTo, value.to_string()),
            "secrets" => Assignment::Push(ListField::Secrets, value.to_string()),
            "ssh" => Assignment::Push(ListField::Ssh, value.to_string()),
            "platforms" | "platform" => Assignment::Push(ListField::Platforms, value.to_string()),
            "output" => Assignment::Push(ListField::Outputs, value.to_string()),
            "no-cache" => Assignment::Flag(FlagField::NoCache, parse_bool(self.field, value)?),
            "pull" => Assignment::Flag(FlagField::Pull, parse_bool(self.field, value)?),
            other => return Err(BakeError::UnknownOverrideField(other.to_string())),
        };
        Ok(assignment)
    }

    fn require_name(&self, expected: &'static str) -> Result<&'a str, BakeError> {
        self.name.ok_or_else(|| BakeError::InvalidOverrideKey {
            key: self.key.to_string(),
            expected,
        })
    }
}

/// Strict boolean: `1 t T TRUE true True` and `0 f F FALSE false False`.
fn parse_bool(field: &str, value: &str) -> Result<bool, BakeError> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(BakeError::InvalidBooleanValue {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}
