//! Clap adapter for bakeplan.
//!
//! Compiled only with the `clap` Cargo feature (on by default). [`BakeArgs`]
//! can be flattened into an application's own `#[derive(Parser)]` struct to get
//! the usual bake flags. [`BakeArgs::apply()`] feeds them into a
//! [`BakeBuilder`](crate::BakeBuilder) and [`BakeArgs::action()`] picks the
//! [`BakeAction`](crate::BakeAction) to run; everything else goes through the
//! clap-free builder API.

use std::path::PathBuf;

use clap::Args;

use crate::builder::BakeBuilder;
use crate::types::{BakeAction, CyclePolicy, UnmatchedPattern};

/// Clap-derived args for resolving bake files.
///
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(flatten)]
///     bake: BakeArgs,
/// }
/// ```
#[derive(Debug, Args)]
pub struct BakeArgs {
    /// Bake file to read. Repeatable; later files override earlier ones.
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Override a target field, e.g. `webapp.args.VERSION=2` or `*.platforms=linux/arm64`.
    #[arg(long = "set", value_name = "PATTERN.FIELD=VALUE")]
    pub set: Vec<String>,

    /// Print the resolved definition as JSON (the default).
    #[arg(long, conflicts_with = "list")]
    pub print: bool,

    /// List groups and targets instead of printing the resolved definition.
    #[arg(long)]
    pub list: bool,

    /// Skip overrides whose pattern matches no target instead of failing.
    #[arg(long)]
    pub allow_unmatched: bool,

    /// Fail on inheritance or group cycles instead of truncating them.
    #[arg(long)]
    pub strict_cycles: bool,

    /// Targets or groups to resolve (default: "default").
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,
}

impl BakeArgs {
    /// The operation these args ask for.
    pub fn action(&self) -> BakeAction {
        if self.list {
            BakeAction::List
        } else {
            BakeAction::Print
        }
    }

    /// Apply files, targets, overrides and policies to a builder.
    pub fn apply(self, builder: BakeBuilder) -> BakeBuilder {
        let mut builder = builder
            .files(self.files)
            .targets(self.targets)
            .overrides(self.set);
        if self.allow_unmatched {
            builder = builder.on_unmatched(UnmatchedPattern::Skip);
        }
        if self.strict_cycles {
            builder = builder.on_cycle(CyclePolicy::Error);
        }
        builder
    }
}
