//! Bake operations: rendering resolved definitions and listing what files define.
//!
//! Provides the logic behind `--print` and `--list`, and the `BakeResult` enum
//! that callers use to display results.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::BakeError;
use crate::types::{Config, Group, Target};

/// Result of a bake operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum BakeResult {
    /// The resolved definition, rendered as pretty JSON.
    Definition(String),
    /// Groups (with members) and target names of the merged files.
    Listing {
        groups: Vec<(String, Vec<String>)>,
        targets: Vec<String>,
    },
}

impl fmt::Display for BakeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BakeResult::Definition(json) => writeln!(f, "{json}"),
            BakeResult::Listing { groups, targets } => {
                for (name, members) in groups {
                    writeln!(f, "group  {name} = [{}]", members.join(", "))?;
                }
                for name in targets {
                    writeln!(f, "target {name}")?;
                }
                Ok(())
            }
        }
    }
}

/// Render resolved targets in bake file shape, under a `default` group that
/// lists every resolved name.
pub fn print_definition(resolved: &BTreeMap<String, Target>) -> Result<BakeResult, BakeError> {
    let definition = Config {
        group: BTreeMap::from([("default".to_string(), Group::new(resolved.keys()))]),
        target: resolved.clone(),
    };
    Ok(BakeResult::Definition(serde_json::to_string_pretty(
        &definition,
    )?))
}

/// List the groups and targets of a merged config.
pub fn list_config(config: &Config) -> BakeResult {
    BakeResult::Listing {
        groups: config
            .group
            .iter()
            .map(|(name, group)| (name.clone(), group.targets.clone()))
            .collect(),
        targets: config.target.keys().cloned().collect(),
    }
}
