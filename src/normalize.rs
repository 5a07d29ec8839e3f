//! Post-merge cleanup of list-valued target fields.

use std::collections::HashSet;

use crate::types::Target;

/// Drop repeated entries from every list field, keeping first occurrences in order.
///
/// `inherits` is left alone: it is cleared during resolution and only ever
/// appears on unresolved targets.
pub fn normalize(target: &mut Target) {
    for list in [
        &mut target.tags,
        &mut target.secrets,
        &mut target.ssh,
        &mut target.platforms,
        &mut target.cache_from,
        &mut target.cache_to,
        &mut target.outputs,
    ] {
        if let Some(items) = list {
            dedupe(items);
        }
    }
}

fn dedupe(items: &mut Vec<String>) {
    let mut seen = HashSet::with_capacity(items.len());
    items.retain(|item| seen.insert(item.clone()));
}
