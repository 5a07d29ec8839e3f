use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::BakeError;
use crate::file;
use crate::ops::{self, BakeResult};
use crate::resolve::{self, ResolveInput};
use crate::types::{BakeAction, Config, CyclePolicy, ResolveOptions, Target, UnmatchedPattern};

/// Name resolved when no targets are requested.
pub const DEFAULT_TARGET: &str = "default";

/// Entry point for resolving bake files.
pub struct Bake;

impl Bake {
    pub fn builder() -> BakeBuilder {
        BakeBuilder::new()
    }
}

/// Builder for loading bake files and resolving targets from them.
///
/// - **Files**: [`file()`](Self::file) / [`files()`](Self::files), or default
///   discovery in [`dir()`](Self::dir) (the working directory if unset).
/// - **Selection**: [`target()`](Self::target), defaulting to `"default"`.
/// - **Overrides**: [`set()`](Self::set), applied with highest precedence.
#[derive(Debug, Clone)]
pub struct BakeBuilder {
    files: Vec<PathBuf>,
    dir: Option<PathBuf>,
    targets: Vec<String>,
    overrides: Vec<String>,
    env_enabled: bool,
    strict: bool,
    options: ResolveOptions,
}

impl BakeBuilder {
    fn new() -> Self {
        Self {
            files: Vec::new(),
            dir: None,
            targets: Vec::new(),
            overrides: Vec::new(),
            env_enabled: true,
            strict: true,
            options: ResolveOptions::default(),
        }
    }

    /// Add a bake file. Files are merged in the order given, later ones winning.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    pub fn files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Directory searched for default bake files when none are named.
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Request a target or group by name.
    pub fn target(mut self, name: &str) -> Self {
        self.targets.push(name.to_string());
        self
    }

    pub fn targets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add an override of the form `pattern.field[.name][=value]`.
    pub fn set(mut self, spec: &str) -> Self {
        self.overrides.push(spec.to_string());
        self
    }

    pub fn overrides<I, S>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overrides.extend(specs.into_iter().map(Into::into));
        self
    }

    /// Enable or disable strict mode (default: `true`).
    /// In strict mode, unknown keys in bake files produce errors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Choose what happens when an override pattern matches nothing (default: error).
    pub fn on_unmatched(mut self, policy: UnmatchedPattern) -> Self {
        self.options.on_unmatched = policy;
        self
    }

    /// Choose what happens on inheritance or group cycles (default: truncate).
    pub fn on_cycle(mut self, policy: CyclePolicy) -> Self {
        self.options.on_cycle = policy;
        self
    }

    /// Don't consult the process environment for valueless `args` overrides.
    pub fn no_env(mut self) -> Self {
        self.env_enabled = false;
        self
    }

    fn effective_targets(&self) -> Vec<String> {
        if self.targets.is_empty() {
            return vec![DEFAULT_TARGET.to_string()];
        }
        self.targets.clone()
    }

    fn effective_files(&self) -> Result<Vec<PathBuf>, BakeError> {
        if !self.files.is_empty() {
            return Ok(self.files.clone());
        }
        let dir = match &self.dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(|e| BakeError::IoError {
                path: PathBuf::from("."),
                source: e,
            })?,
        };
        let found = file::discover(&dir);
        if found.is_empty() {
            return Err(BakeError::NoConfigFiles(dir));
        }
        Ok(found)
    }

    /// Build the `ResolveInput` from current builder state.
    fn build_input(&self) -> Result<ResolveInput, BakeError> {
        let files = file::read_files(&self.effective_files()?)?;
        let env_vars = if self.env_enabled {
            std::env::vars().collect()
        } else {
            Vec::new()
        };

        Ok(ResolveInput {
            files,
            targets: self.effective_targets(),
            overrides: self.overrides.clone(),
            env_vars,
            strict: self.strict,
            options: self.options,
        })
    }

    /// Load the files and merge them, without resolving anything.
    pub fn load_config(&self) -> Result<Config, BakeError> {
        let files = file::read_files(&self.effective_files()?)?;
        resolve::merge_files(&files, self.strict)
    }

    /// Load, merge and resolve the requested targets.
    pub fn load(self) -> Result<BTreeMap<String, Target>, BakeError> {
        let input = self.build_input()?;
        resolve::resolve(input)
    }

    /// Handle a `BakeAction` and print the result to stdout.
    pub fn handle_and_print(self, action: &BakeAction) -> Result<(), BakeError> {
        let result = self.handle(action)?;
        print!("{result}");
        Ok(())
    }

    /// Handle a `BakeAction` (print / list).
    pub fn handle(self, action: &BakeAction) -> Result<BakeResult, BakeError> {
        match action {
            BakeAction::Print => {
                let resolved = self.load()?;
                ops::print_definition(&resolved)
            }
            BakeAction::List => {
                let config = self.load_config()?;
                Ok(ops::list_config(&config))
            }
        }
    }
}
