//! Field-level layering of targets, and the fold that combines bake files.
//!
//! The same rule is used when a later file redeclares a target and when the
//! resolver layers inherited, own and override fields. A field that is unset on
//! the overlay always leaves the base untouched. When the overlay sets it:
//!
//! | field | behavior |
//! |---|---|
//! | `context`, `dockerfile`, `target`, `pull`, `no-cache` | replace |
//! | `args`, `labels` | key-wise union, overlay wins per key |
//! | `tags`, `platforms`, `output`, `cache-to` | replace the whole list |
//! | `secret`, `ssh`, `cache-from` | append |
//! | `inherits` | append |

use std::collections::BTreeMap;

use tracing::debug;

use crate::types::{Config, Target};

/// Layer `overlay` on top of `base`.
pub fn merge_targets(mut base: Target, overlay: Target) -> Target {
    replace(&mut base.context, overlay.context);
    replace(&mut base.dockerfile, overlay.dockerfile);
    replace(&mut base.target, overlay.target);
    replace(&mut base.pull, overlay.pull);
    replace(&mut base.no_cache, overlay.no_cache);

    union(&mut base.args, overlay.args);
    union(&mut base.labels, overlay.labels);

    replace(&mut base.tags, overlay.tags);
    replace(&mut base.platforms, overlay.platforms);
    replace(&mut base.outputs, overlay.outputs);
    replace(&mut base.cache_to, overlay.cache_to);

    append(&mut base.secrets, overlay.secrets);
    append(&mut base.ssh, overlay.ssh);
    append(&mut base.cache_from, overlay.cache_from);
    append(&mut base.inherits, overlay.inherits);
    base
}

/// Fold `overlay` (the next file) into `base` (everything merged so far).
///
/// Group members are appended unless already present. Targets present in both
/// are combined with [`merge_targets`], `overlay` on top.
pub fn merge_configs(mut base: Config, overlay: Config) -> Config {
    for (name, group) in overlay.group {
        match base.group.get_mut(&name) {
            Some(existing) => {
                for member in group.targets {
                    if !existing.targets.contains(&member) {
                        existing.targets.push(member);
                    }
                }
            }
            None => {
                base.group.insert(name, group);
            }
        }
    }

    for (name, target) in overlay.target {
        let merged = match base.target.remove(&name) {
            Some(existing) => {
                debug!(%name, "redeclared target merged over earlier file");
                merge_targets(existing, target)
            }
            None => target,
        };
        base.target.insert(name, merged);
    }
    base
}

/// Left fold of all parsed files, first = lowest priority.
pub fn merge_all<I>(configs: I) -> Config
where
    I: IntoIterator<Item = Config>,
{
    configs.into_iter().fold(Config::default(), merge_configs)
}

fn replace<T>(base: &mut Option<T>, overlay: Option<T>) {
    if overlay.is_some() {
        *base = overlay;
    }
}

fn union(base: &mut Option<BTreeMap<String, String>>, overlay: Option<BTreeMap<String, String>>) {
    if let Some(entries) = overlay {
        base.get_or_insert_with(BTreeMap::new).extend(entries);
    }
}

fn append(base: &mut Option<Vec<String>>, overlay: Option<Vec<String>>) {
    if let Some(items) = overlay {
        base.get_or_insert_with(Vec::new).extend(items);
    }
}
