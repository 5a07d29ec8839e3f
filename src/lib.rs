//! Resolve declarative, multi-file build target definitions into fully
//! specified build targets.
//!
//! Operators describe named **targets** (a partial build record: context,
//! Dockerfile, build args, tags, platforms, ...) and named **groups** of
//! targets across one or more bake files. Bakeplan merges the files, expands
//! requested names through the groups, walks each target's `inherits` chain,
//! applies command-line overrides and hands back a map of ready-to-use
//! [`Target`]s.
//!
//! ```ignore
//! let targets = Bake::builder()
//!     .file("bake.toml")
//!     .target("default")
//!     .set("webapp.args.VERSION=2")
//!     .load()?;
//! ```
//!
//! # Layer precedence
//!
//! ```text
//! Empty target
//!        ↑ overridden by
//! Inherited targets     inherits = ["a", "b"], later entries win
//!        ↑ overridden by
//! Own fields            as declared in the (merged) bake files
//!        ↑ overridden by
//! Overrides             --set pattern.field=value
//! ```
//!
//! Only after all layers are applied do `context` and `dockerfile` fall back
//! to `"."` and `"Dockerfile"`. Overrides are applied to every target in an
//! inheritance chain, so `--set base.args.X=1` reaches every target that
//! inherits `base` without declaring `X` itself.
//!
//! Not every field layers the same way: scalars replace, `args` and `labels`
//! merge key by key, `secret`, `ssh` and `cache-from` accumulate, and `tags`,
//! `platforms`, `output` and `cache-to` replace the whole list. See
//! [`merge`] for the table. List fields never contain duplicates once resolved.
//!
//! # Multiple files
//!
//! Files are folded left to right with the same per-field rule, so a later
//! file can add a build arg to a target an earlier file declared. Group
//! members from later files are appended unless already present.
//!
//! # Overrides
//!
//! `pattern.field[.name][=value]`, where `pattern` is a target name or a glob
//! (`web*`, `svc-?`, `[ab]pp`). Recognized fields: `context`, `dockerfile`,
//! `target`, `args.NAME`, `labels.NAME`, `tags`, `cache-from`, `cache-to`,
//! `secrets`, `ssh`, `platforms`, `output`, `no-cache`, `pull`. A valueless
//! `args.NAME` copies `NAME` from the environment when it is set.
//!
//! # Policies
//!
//! Two behaviors are configurable through [`ResolveOptions`]:
//!
//! - an override pattern matching no target is an error by default
//!   ([`UnmatchedPattern`]);
//! - inheritance and group cycles are truncated by default, keeping whatever
//!   was gathered before the repeat ([`CyclePolicy`]).
//!
//! # Error handling
//!
//! All fallible operations return [`BakeError`]. Any error aborts the whole
//! resolution; there are no partial results.

pub mod error;
pub mod merge;
pub mod types;

mod builder;
#[cfg(feature = "clap")]
mod cli;
mod file;
mod normalize;
mod ops;
mod overrides;
mod resolve;
mod validate;

#[cfg(test)]
mod fixtures;

pub use builder::{Bake, BakeBuilder, DEFAULT_TARGET};
#[cfg(feature = "clap")]
pub use cli::BakeArgs;
pub use error::BakeError;
pub use file::{DEFAULT_FILES, discover, parse_config};
pub use normalize::normalize;
pub use ops::{BakeResult, list_config, print_definition};
pub use overrides::{OverrideTable, expand_targets, parse_overrides};
pub use resolve::{ResolveInput, Resolver, merge_files, read_targets, resolve};
pub use types::{
    BakeAction, Config, CyclePolicy, Group, ResolveOptions, Target, UnmatchedPattern,
};
