#[cfg(test)]
pub mod test {
    use std::collections::BTreeMap;

    use crate::types::{Config, Group, Target};

    pub fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    pub fn target_with_args(pairs: &[(&str, &str)]) -> Target {
        Target {
            args: Some(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Target::default()
        }
    }

    /// `webapp` inherits from `webDEP`; both declare `VAR_BOTH`.
    pub const WEBAPP_TOML: &str = r#"
[target.webDEP.args]
VAR_INHERITED = "webDEP"
VAR_BOTH = "webDEP"

[target.webapp]
dockerfile = "Dockerfile.webapp"
inherits = ["webDEP"]

[target.webapp.args]
VAR_BOTH = "webapp"
"#;

    pub fn webapp_config() -> Config {
        toml::from_str(WEBAPP_TOML).unwrap()
    }

    /// Three targets for pattern matching, plus a `default` group.
    pub fn pattern_config() -> Config {
        let mut cfg = webapp_config();
        cfg.target.insert("other".into(), Target::default());
        cfg.group
            .insert("default".into(), Group::new(["webapp", "other"]));
        cfg
    }

    pub fn no_env() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    #[test]
    fn webapp_fixture_parses() {
        let cfg = webapp_config();
        assert_eq!(cfg.target.len(), 2);
        assert_eq!(
            cfg.target["webapp"].inherits,
            Some(strings(&["webDEP"]))
        );
    }
}
