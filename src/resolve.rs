//! Core resolution pipeline: merge bake files and produce fully specified targets.
//!
//! Operates on pre-loaded data (`ResolveInput`) with no I/O, making the full
//! pipeline testable with synthetic inputs. Steps:
//!
//! 1. Parse each file (rejecting unknown keys in strict mode)
//! 2. Fold the files into one [`Config`] (later files win per field)
//! 3. Parse overrides against the merged target names
//! 4. Expand every requested name through the groups
//! 5. Resolve each target: inherited ← own ← override, then normalize
//! 6. Fill `context` and `dockerfile` fallbacks on the final result
//!
//! Each top-level call gets its own visited set, so a [`Resolver`] can be
//! shared across threads.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::BakeError;
use crate::file;
use crate::merge::{merge_all, merge_targets};
use crate::normalize::normalize;
use crate::overrides::{self, OverrideTable};
use crate::types::{Config, CyclePolicy, ResolveOptions, Target};

/// All pre-loaded data needed to resolve targets. No I/O happens here.
#[derive(Debug, Clone, Default)]
pub struct ResolveInput {
    /// File contents in precedence order: first = lowest priority, last = highest.
    pub files: Vec<(PathBuf, String)>,
    /// Target or group names to resolve.
    pub targets: Vec<String>,
    /// Raw `pattern.field[.name][=value]` overrides, in order.
    pub overrides: Vec<String>,
    /// Environment used by valueless `args` overrides.
    pub env_vars: Vec<(String, String)>,
    /// Whether to reject unknown keys in bake files.
    pub strict: bool,
    pub options: ResolveOptions,
}

/// Parse and fold bake files into a single config.
pub fn merge_files(files: &[(PathBuf, String)], strict: bool) -> Result<Config, BakeError> {
    let configs = files
        .iter()
        .map(|(path, content)| file::parse_config(path, content, strict))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(files = configs.len(), "merging bake files");
    Ok(merge_all(configs))
}

/// Resolve targets from pre-loaded inputs.
pub fn resolve(input: ResolveInput) -> Result<BTreeMap<String, Target>, BakeError> {
    let config = merge_files(&input.files, input.strict)?;
    let env: BTreeMap<String, String> = input.env_vars.into_iter().collect();
    read_targets(
        &config,
        input.targets.as_slice(),
        input.overrides.as_slice(),
        &env,
        input.options,
    )
}

/// Resolve `requested` names against an already merged config.
///
/// Any error aborts the whole batch; no partial map is returned.
pub fn read_targets<T: AsRef<str>, O: AsRef<str>>(
    config: &Config,
    requested: &[T],
    overrides: &[O],
    env: &BTreeMap<String, String>,
    options: ResolveOptions,
) -> Result<BTreeMap<String, Target>, BakeError> {
    let table = overrides::parse_overrides(config, overrides, env, options.on_unmatched)?;
    let resolver = Resolver::new(config, &table, options.on_cycle);

    let mut resolved = BTreeMap::new();
    for requested in requested {
        for name in resolver.resolve_group(requested.as_ref())? {
            if resolved.contains_key(&name) {
                continue;
            }
            let target = resolver.resolve_target(&name)?;
            resolved.insert(name, target);
        }
    }
    Ok(resolved)
}

/// Read-only view over a merged config and its override table.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    config: &'a Config,
    overrides: &'a OverrideTable,
    on_cycle: CyclePolicy,
}

/// Per-call traversal state.
#[derive(Debug, Default)]
struct Walk {
    visited: HashSet<String>,
    /// Names currently being expanded, outermost first.
    path: Vec<String>,
}

impl Walk {
    fn enter(&mut self, name: &str) {
        self.visited.insert(name.to_string());
        self.path.push(name.to_string());
    }

    fn leave(&mut self) {
        self.path.pop();
    }

    fn cycle_through(&self, name: &str) -> Option<Vec<String>> {
        let start = self.path.iter().position(|n| n == name)?;
        let mut chain = self.path[start..].to_vec();
        chain.push(name.to_string());
        Some(chain)
    }
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a Config, overrides: &'a OverrideTable, on_cycle: CyclePolicy) -> Self {
        Self {
            config,
            overrides,
            on_cycle,
        }
    }

    /// Expand `name` into target names, depth first in declared order.
    ///
    /// A name that is not a group is returned as a target name.
    pub fn resolve_group(&self, name: &str) -> Result<Vec<String>, BakeError> {
        self.group(name, &mut Walk::default())
    }

    /// Resolve a single target, including its inheritance chain and overrides.
    pub fn resolve_target(&self, name: &str) -> Result<Target, BakeError> {
        let mut target = self
            .target(name, &mut Walk::default())?
            .unwrap_or_default();
        target.context.get_or_insert_with(|| ".".to_string());
        target
            .dockerfile
            .get_or_insert_with(|| "Dockerfile".to_string());
        Ok(target)
    }

    fn group(&self, name: &str, walk: &mut Walk) -> Result<Vec<String>, BakeError> {
        if walk.visited.contains(name) {
            self.revisit(name, walk, |chain| BakeError::GroupCycle { chain })?;
            return Ok(Vec::new());
        }
        let Some(group) = self.config.group.get(name) else {
            return Ok(vec![name.to_string()]);
        };

        walk.enter(name);
        let mut names = Vec::with_capacity(group.targets.len());
        for member in &group.targets {
            names.extend(self.group(member, walk)?);
        }
        walk.leave();
        Ok(names)
    }

    /// `Ok(None)` means `name` was already resolved in this walk.
    fn target(&self, name: &str, walk: &mut Walk) -> Result<Option<Target>, BakeError> {
        if walk.visited.contains(name) {
            self.revisit(name, walk, |chain| BakeError::InheritanceCycle { chain })?;
            return Ok(None);
        }
        walk.enter(name);

        let declared = self
            .config
            .target
            .get(name)
            .ok_or_else(|| BakeError::TargetNotFound(name.to_string()))?;

        let mut inherited = Target::default();
        for parent in declared.inherits.iter().flatten() {
            if let Some(parent) = self.target(parent, walk)? {
                inherited = merge_targets(inherited, parent);
            }
        }

        let own = Target {
            inherits: None,
            ..declared.clone()
        };
        let overlay = self.overrides.get(name).cloned().unwrap_or_default();

        let mut resolved = [inherited, own, overlay]
            .into_iter()
            .fold(Target::default(), merge_targets);
        normalize(&mut resolved);

        walk.leave();
        debug!(%name, "target resolved");
        Ok(Some(resolved))
    }

    /// A name seen earlier in the same walk. Shared ancestors are skipped; a
    /// name on the active path is a cycle and follows the cycle policy.
    fn revisit(
        &self,
        name: &str,
        walk: &Walk,
        cycle: fn(Vec<String>) -> BakeError,
    ) -> Result<(), BakeError> {
        match walk.cycle_through(name) {
            Some(chain) if self.on_cycle == CyclePolicy::Error => Err(cycle(chain)),
            Some(chain) => {
                warn!(chain = %chain.join(" -> "), "cycle truncated");
                Ok(())
            }
            None => {
                debug!(%name, "already expanded in this walk, skipping");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{WEBAPP_TOML, no_env, pattern_config, strings, webapp_config};
    use crate::types::{Group, UnmatchedPattern};

    fn read(cfg: &Config, targets: &[&str], overrides: &[&str]) -> BTreeMap<String, Target> {
        read_targets(cfg, targets, overrides, &no_env(), ResolveOptions::default()).unwrap()
    }

    fn target(fields: Target, inherits: &[&str]) -> Target {
        Target {
            inherits: Some(strings(inherits)),
            ..fields
        }
    }

    fn dockerfile(name: &str) -> Target {
        Target {
            dockerfile: Some(name.into()),
            ..Target::default()
        }
    }

    #[test]
    fn no_overrides_inherits_and_defaults() {
        let m = read(&webapp_config(), &["webapp"], &[]);
        assert_eq!(m.len(), 1);
        let webapp = &m["webapp"];
        assert_eq!(webapp.context.as_deref(), Some("."));
        assert_eq!(webapp.dockerfile.as_deref(), Some("Dockerfile.webapp"));
        let args = webapp.args.as_ref().unwrap();
        assert_eq!(args["VAR_INHERITED"], "webDEP");
        assert_eq!(args["VAR_BOTH"], "webapp");
        assert_eq!(webapp.inherits, None);
    }

    #[test]
    fn own_field_beats_inherited() {
        let mut cfg = Config::default();
        cfg.target
            .insert("A".into(), target(dockerfile("Dockerfile.A"), &["B"]));
        cfg.target.insert("B".into(), dockerfile("Dockerfile.B"));
        let m = read(&cfg, &["A"], &[]);
        assert_eq!(m["A"].dockerfile.as_deref(), Some("Dockerfile.A"));
    }

    #[test]
    fn override_on_descendant() {
        let m = read(
            &webapp_config(),
            &["webapp"],
            &["webapp.args.VAR_INHERITED=override"],
        );
        let args = m["webapp"].args.as_ref().unwrap();
        assert_eq!(args["VAR_INHERITED"], "override");
        assert_eq!(args["VAR_BOTH"], "webapp");
    }

    #[test]
    fn override_on_ancestor_reaches_descendant() {
        let m = read(
            &webapp_config(),
            &["webapp"],
            &[
                "webDEP.args.VAR_INHERITED=override",
                "webDEP.args.VAR_BOTH=override",
            ],
        );
        let args = m["webapp"].args.as_ref().unwrap();
        assert_eq!(args["VAR_INHERITED"], "override");
        assert_eq!(args["VAR_BOTH"], "webapp");
    }

    #[test]
    fn context_override() {
        let m = read(&webapp_config(), &["webapp"], &["webapp.context=foo"]);
        assert_eq!(m["webapp"].context.as_deref(), Some("foo"));
    }

    #[test]
    fn glob_override_across_requested_targets() {
        let m = read(
            &webapp_config(),
            &["webapp", "webDEP"],
            &["web*.dockerfile=foo", "*.args.VAR_BOTH=bar"],
        );
        assert_eq!(m.len(), 2);
        assert_eq!(m["webapp"].dockerfile.as_deref(), Some("foo"));
        assert_eq!(m["webDEP"].dockerfile.as_deref(), Some("foo"));
        assert_eq!(m["webapp"].args.as_ref().unwrap()["VAR_INHERITED"], "webDEP");
        assert_eq!(m["webapp"].args.as_ref().unwrap()["VAR_BOTH"], "bar");
    }

    #[test]
    fn unmatched_override_aborts_batch() {
        let err = read_targets(
            &webapp_config(),
            &["webapp"],
            &["nomatch*.dockerfile=foo"],
            &no_env(),
            ResolveOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "could not find any target matching 'nomatch*'"
        );
    }

    #[test]
    fn skipped_unmatched_override_still_resolves() {
        let options = ResolveOptions {
            on_unmatched: UnmatchedPattern::Skip,
            ..ResolveOptions::default()
        };
        let m = read_targets(
            &webapp_config(),
            &["webapp"],
            &["nomatch*.dockerfile=foo"],
            &no_env(),
            options,
        )
        .unwrap();
        assert_eq!(m["webapp"].dockerfile.as_deref(), Some("Dockerfile.webapp"));
    }

    #[test]
    fn missing_target_is_an_error() {
        let err = read_targets(
            &webapp_config(),
            &["nope"],
            &[] as &[&str],
            &no_env(),
            ResolveOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BakeError::TargetNotFound(ref n) if n == "nope"));
    }

    #[test]
    fn missing_parent_is_an_error() {
        let mut cfg = Config::default();
        cfg.target
            .insert("child".into(), target(Target::default(), &["ghost"]));
        let resolver_table = OverrideTable::new();
        let resolver = Resolver::new(&cfg, &resolver_table, CyclePolicy::Truncate);
        let err = resolver.resolve_target("child").unwrap_err();
        assert_eq!(err.to_string(), "failed to find target ghost");
    }

    #[test]
    fn later_parent_wins_on_scalars() {
        let mut cfg = Config::default();
        cfg.target.insert("a".into(), dockerfile("Dockerfile.a"));
        cfg.target.insert("b".into(), dockerfile("Dockerfile.b"));
        cfg.target
            .insert("child".into(), target(Target::default(), &["a", "b"]));
        let m = read(&cfg, &["child"], &[]);
        assert_eq!(m["child"].dockerfile.as_deref(), Some("Dockerfile.b"));
    }

    #[test]
    fn fallbacks_only_applied_at_top_level() {
        let mut cfg = Config::default();
        cfg.target.insert(
            "b".into(),
            Target {
                context: Some("ctx-b".into()),
                ..Target::default()
            },
        );
        cfg.target.insert("c".into(), dockerfile("Dockerfile.c"));
        cfg.target
            .insert("child".into(), target(Target::default(), &["b", "c"]));
        let m = read(&cfg, &["child"], &[]);
        assert_eq!(m["child"].context.as_deref(), Some("ctx-b"));
        assert_eq!(m["child"].dockerfile.as_deref(), Some("Dockerfile.c"));
    }

    #[test]
    fn accumulating_fields_collect_through_chain_and_dedupe() {
        let mut cfg = Config::default();
        cfg.target.insert(
            "base".into(),
            Target {
                secrets: Some(strings(&["id=a"])),
                tags: Some(strings(&["base"])),
                ..Target::default()
            },
        );
        cfg.target.insert(
            "app".into(),
            target(
                Target {
                    secrets: Some(strings(&["id=b", "id=a"])),
                    tags: Some(strings(&["app", "app"])),
                    ..Target::default()
                },
                &["base"],
            ),
        );
        let m = read(&cfg, &["app"], &["app.tags=app", "app.tags=extra"]);
        assert_eq!(m["app"].secrets, Some(strings(&["id=a", "id=b"])));
        assert_eq!(m["app"].tags, Some(strings(&["app", "extra"])));
    }

    #[test]
    fn self_inheritance_terminates() {
        let mut cfg = Config::default();
        cfg.target.insert(
            "loop".into(),
            target(dockerfile("Dockerfile.loop"), &["loop"]),
        );
        let m = read(&cfg, &["loop"], &[]);
        assert_eq!(m["loop"].dockerfile.as_deref(), Some("Dockerfile.loop"));
    }

    #[test]
    fn transitive_cycle_truncates_by_default() {
        let mut cfg = Config::default();
        cfg.target.insert(
            "a".into(),
            target(
                Target {
                    context: Some("a".into()),
                    ..Target::default()
                },
                &["b"],
            ),
        );
        cfg.target
            .insert("b".into(), target(dockerfile("Dockerfile.b"), &["a"]));
        let m = read(&cfg, &["a", "b"], &[]);
        assert_eq!(m["a"].context.as_deref(), Some("a"));
        assert_eq!(m["a"].dockerfile.as_deref(), Some("Dockerfile.b"));
        assert_eq!(m["b"].dockerfile.as_deref(), Some("Dockerfile.b"));
    }

    #[test]
    fn cycle_is_an_error_when_configured() {
        let mut cfg = Config::default();
        cfg.target
            .insert("a".into(), target(Target::default(), &["b"]));
        cfg.target
            .insert("b".into(), target(Target::default(), &["a"]));
        let table = OverrideTable::new();
        let resolver = Resolver::new(&cfg, &table, CyclePolicy::Error);
        let err = resolver.resolve_target("a").unwrap_err();
        assert!(matches!(err, BakeError::InheritanceCycle { ref chain } if *chain == strings(&["a", "b", "a"])));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let mut cfg = Config::default();
        cfg.target.insert(
            "root".into(),
            Target {
                labels: Some([("tier".to_string(), "root".to_string())].into()),
                ..Target::default()
            },
        );
        cfg.target
            .insert("left".into(), target(Target::default(), &["root"]));
        cfg.target
            .insert("right".into(), target(Target::default(), &["root"]));
        cfg.target
            .insert("app".into(), target(Target::default(), &["left", "right"]));
        let table = OverrideTable::new();
        let resolver = Resolver::new(&cfg, &table, CyclePolicy::Error);
        let app = resolver.resolve_target("app").unwrap();
        assert_eq!(app.labels.unwrap()["tier"], "root");
    }

    #[test]
    fn groups_expand_nested_in_order() {
        let mut cfg = pattern_config();
        cfg.group
            .insert("all".into(), Group::new(["default", "webDEP"]));
        let table = OverrideTable::new();
        let resolver = Resolver::new(&cfg, &table, CyclePolicy::Truncate);
        assert_eq!(
            resolver.resolve_group("all").unwrap(),
            strings(&["webapp", "other", "webDEP"])
        );
        assert_eq!(resolver.resolve_group("webapp").unwrap(), strings(&["webapp"]));
    }

    #[test]
    fn group_cycle_truncates_or_errors() {
        let mut cfg = Config::default();
        cfg.group.insert("a".into(), Group::new(["x", "b"]));
        cfg.group.insert("b".into(), Group::new(["a", "y"]));
        let table = OverrideTable::new();

        let lenient = Resolver::new(&cfg, &table, CyclePolicy::Truncate);
        assert_eq!(lenient.resolve_group("a").unwrap(), strings(&["x", "y"]));

        let strict = Resolver::new(&cfg, &table, CyclePolicy::Error);
        let err = strict.resolve_group("a").unwrap_err();
        assert!(matches!(err, BakeError::GroupCycle { ref chain } if *chain == strings(&["a", "b", "a"])));
    }

    #[test]
    fn group_members_resolved_once() {
        let m = read(&pattern_config(), &["default", "webapp"], &[]);
        assert_eq!(m.keys().cloned().collect::<Vec<_>>(), strings(&["other", "webapp"]));
        assert_eq!(m["other"].context.as_deref(), Some("."));
    }

    #[test]
    fn deterministic() {
        let overrides = ["web*.tags=t", "webapp.labels.a=b"];
        let first = read(&pattern_config(), &["default", "webDEP"], &overrides);
        let second = read(&pattern_config(), &["default", "webDEP"], &overrides);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn shared_resolver_across_threads() {
        let mut cfg = webapp_config();
        cfg.target.insert("a".into(), target(dockerfile("Dockerfile.a"), &["b"]));
        cfg.target.insert("b".into(), target(Target::default(), &["a", "webDEP"]));
        let table =
            overrides::parse_overrides(&cfg, &["web*.tags=t"], &no_env(), UnmatchedPattern::Error)
                .unwrap();
        let resolver = Resolver::new(&cfg, &table, CyclePolicy::Truncate);
        let names = ["webapp", "a", "b"];
        let expected: Vec<Target> = names
            .iter()
            .map(|name| resolver.resolve_target(name).unwrap())
            .collect();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let resolver = &resolver;
                    scope.spawn(move || {
                        (0..50)
                            .map(|j| {
                                let k = (i + j) % names.len();
                                (k, resolver.resolve_target(names[k]).unwrap())
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            for handle in handles {
                for (k, got) in handle.join().unwrap() {
                    assert_eq!(got, expected[k], "{}", names[k]);
                }
            }
        });
        assert_eq!(expected[1].dockerfile.as_deref(), Some("Dockerfile.a"));
        assert_eq!(expected[2].tags, Some(strings(&["t"])));
    }

    #[test]
    fn pipeline_from_toml_files() {
        let input = ResolveInput {
            files: vec![("bake.toml".into(), WEBAPP_TOML.into())],
            targets: strings(&["webapp"]),
            overrides: strings(&["webapp.args.TOKEN"]),
            env_vars: vec![("TOKEN".into(), "secret".into())],
            strict: true,
            ..ResolveInput::default()
        };
        let m = resolve(input).unwrap();
        let args = m["webapp"].args.as_ref().unwrap();
        assert_eq!(args["TOKEN"], "secret");
        assert_eq!(args["VAR_INHERITED"], "webDEP");
    }

    #[test]
    fn pipeline_merges_args_across_files() {
        let input = ResolveInput {
            files: vec![
                (
                    "bake.toml".into(),
                    "[group.default]\ntargets = [\"db\", \"webapp\"]\n\n[target.db]\n\n[target.webapp]\ndockerfile = \"Dockerfile.webapp\"\nargs = { buildno = 1 }\n".into(),
                ),
                (
                    "bake.override.json".into(),
                    r#"{"group": {"default": {"targets": ["newservice"]}},
                        "target": {"newservice": {}, "webapp": {"args": {"buildno2": 12}}}}"#
                        .into(),
                ),
            ],
            targets: strings(&["default"]),
            strict: true,
            ..ResolveInput::default()
        };
        let m = resolve(input).unwrap();
        assert_eq!(m.len(), 3);
        assert!(m.contains_key("newservice"));
        let webapp = &m["webapp"];
        assert_eq!(webapp.dockerfile.as_deref(), Some("Dockerfile.webapp"));
        assert_eq!(webapp.context.as_deref(), Some("."));
        let args = webapp.args.as_ref().unwrap();
        assert_eq!(args["buildno"], "1");
        assert_eq!(args["buildno2"], "12");
    }

    #[test]
    fn pipeline_strict_rejects_unknown_key() {
        let input = ResolveInput {
            files: vec![(
                "bake.toml".into(),
                "[target.app]\ndockerfle = \"x\"\n".into(),
            )],
            targets: strings(&["app"]),
            strict: true,
            ..ResolveInput::default()
        };
        let msg = resolve(input).unwrap_err().to_string();
        assert!(msg.contains("Unknown"));
    }

    #[test]
    fn pipeline_lenient_allows_unknown_key() {
        let input = ResolveInput {
            files: vec![(
                "bake.toml".into(),
                "[target.app]\ndockerfle = \"x\"\n".into(),
            )],
            targets: strings(&["app"]),
            strict: false,
            ..ResolveInput::default()
        };
        let m = resolve(input).unwrap();
        assert_eq!(m["app"].dockerfile.as_deref(), Some("Dockerfile"));
    }
}
