//! Configuration file resolution with global fallback.
//!
//! Resolves the configuration file path using a deterministic priority order:
//!
//! 1. `--config` flag (explicit path)
//! 2. `{project}/palinter.yaml`, `palinter.yml`, `palinter.json`,
//!    `palinter.toml` or `.palinter.yaml`
//! 3. `~/.palinter/config.yaml` (global fallback)
//! 4. No config found → error with a hint to run `palinter init`

use anyhow::{bail, Result};
use palinter_core::RuleSet;
use std::path::{Path, PathBuf};

/// Where the configuration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly specified via `--config` flag.
    Explicit(PathBuf),
    /// Found in the project directory.
    Project(PathBuf),
    /// Loaded from the global config directory (`~/.palinter/`).
    Global(PathBuf),
    /// No config found.
    NotFound,
}

impl ConfigSource {
    /// Returns the resolved path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::NotFound => None,
        }
    }

    /// Returns `true` if the config was loaded from the global directory.
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global(_))
    }
}

/// Project-level config file names, checked in order.
pub const PROJECT_CONFIG_NAMES: &[&str] = &[
    "palinter.yaml",
    "palinter.yml",
    "palinter.json",
    "palinter.toml",
    ".palinter.yaml",
];

/// Config file name within the global config directory.
const GLOBAL_CONFIG_NAME: &str = "config.yaml";

/// Resolves the configuration file path.
///
/// See module-level docs for resolution order.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_inner(project_dir, explicit, global_config_dir())
}

/// Resolves and loads the rule set.
///
/// A [`palinter_core::ConfigError`] is returned unwrapped so that `main`
/// can render it as a diagnostic.
///
/// # Errors
///
/// Returns an error if no config is found or it fails to load.
pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<RuleSet> {
    load_source(project_dir, &resolve(project_dir, explicit))
}

fn load_source(project_dir: &Path, source: &ConfigSource) -> Result<RuleSet> {
    let Some(path) = source.path() else {
        bail!(
            "no palinter config found in {} (run `palinter init` to create one)",
            project_dir.display()
        );
    };
    if source.is_global() {
        tracing::info!("Using global config: {}", path.display());
    }
    let rules = RuleSet::from_file(path)?;
    tracing::debug!("Loaded {} rule(s) from {}", rules.rule_count(), path.display());
    Ok(rules)
}

/// Testable core: accepts `global_dir` as parameter to avoid env var races.
fn resolve_inner(
    project_dir: &Path,
    explicit: Option<&Path>,
    global_dir: Option<PathBuf>,
) -> ConfigSource {
    if let Some(p) = explicit {
        return ConfigSource::Explicit(p.to_path_buf());
    }

    for name in PROJECT_CONFIG_NAMES {
        let candidate = project_dir.join(name);
        if candidate.is_file() {
            tracing::debug!("Found project config: {}", candidate.display());
            return ConfigSource::Project(candidate);
        }
    }

    if let Some(dir) = global_dir {
        let candidate = dir.join(GLOBAL_CONFIG_NAME);
        if candidate.is_file() {
            tracing::debug!("Found global config: {}", candidate.display());
            return ConfigSource::Global(candidate);
        }
    }

    ConfigSource::NotFound
}

/// Returns the global config directory path.
///
/// Resolution: `$PALINTER_CONFIG_DIR` > `~/.palinter/`
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("PALINTER_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }
    home::home_dir().map(|h| h.join(".palinter"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const YAML: &str = "global_rules:\n  - if_file: { has_extension: svg }\n    expect: { name_case_is: kebab-case }\n";
    const JSON: &str = r#"{ "global_rules": [{ "if_file": { "has_extension": "svg" }, "expect": { "name_case_is": "kebab-case" } }] }"#;
    const TOML: &str = r#"
[[global_rules]]
if_file = { has_extension = "svg" }
expect = { name_case_is = "kebab-case" }
"#;

    fn load_in(project: &Path, global: &Path) -> Result<RuleSet> {
        load_source(project, &resolve_inner(project, None, Some(global.to_path_buf())))
    }

    #[test]
    fn each_project_format_loads() {
        for (name, text) in [
            ("palinter.yaml", YAML),
            ("palinter.yml", YAML),
            ("palinter.json", JSON),
            ("palinter.toml", TOML),
            (".palinter.yaml", YAML),
        ] {
            let project = TempDir::new().unwrap();
            let global = TempDir::new().unwrap();
            fs::write(project.path().join(name), text).unwrap();

            let rules = load_in(project.path(), global.path())
                .unwrap_or_else(|e| panic!("{name} should load: {e:#}"));
            assert_eq!(rules.global_rules.len(), 1, "{name}");
        }
    }

    #[test]
    fn yaml_wins_over_other_formats() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("palinter.toml"), TOML).unwrap();
        fs::write(tmp.path().join("palinter.json"), JSON).unwrap();
        fs::write(tmp.path().join("palinter.yml"), YAML).unwrap();

        assert_eq!(
            resolve_inner(tmp.path(), None, None),
            ConfigSource::Project(tmp.path().join("palinter.yml"))
        );
    }

    #[test]
    fn explicit_path_bypasses_project_lookup() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("palinter.yaml"), "global_rules: [missing]").unwrap();
        let explicit = tmp.path().join("layout.json");
        fs::write(&explicit, JSON).unwrap();

        let source = resolve_inner(tmp.path(), Some(&explicit), None);
        assert_eq!(source, ConfigSource::Explicit(explicit));
        let rules = load_source(tmp.path(), &source).unwrap();
        assert_eq!(rules.global_rules.len(), 1);
    }

    #[test]
    fn folder_named_palinter_yaml_is_not_a_config() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("palinter.yaml")).unwrap();
        fs::write(tmp.path().join("palinter.toml"), TOML).unwrap();
        assert_eq!(
            resolve_inner(tmp.path(), None, None),
            ConfigSource::Project(tmp.path().join("palinter.toml"))
        );
    }

    #[test]
    fn global_config_used_only_without_project_config() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        fs::write(global.path().join("config.yaml"), YAML).unwrap();

        let source = resolve_inner(project.path(), None, Some(global.path().to_path_buf()));
        assert!(source.is_global());
        assert_eq!(load_in(project.path(), global.path()).unwrap().global_rules.len(), 1);

        fs::write(project.path().join("palinter.json"), "{}").unwrap();
        let rules = load_in(project.path(), global.path()).unwrap();
        assert!(rules.global_rules.is_empty());
    }

    #[test]
    fn missing_config_hints_at_init() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();

        assert_eq!(
            resolve_inner(project.path(), None, Some(global.path().to_path_buf())),
            ConfigSource::NotFound
        );
        let err = load_in(project.path(), global.path()).unwrap_err();
        assert!(err.to_string().contains("run `palinter init`"), "{err}");
        assert!(err.downcast_ref::<palinter_core::ConfigError>().is_none());
    }

    #[test]
    fn config_error_is_not_wrapped() {
        let tmp = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        fs::write(tmp.path().join("palinter.yaml"), "global_rules: [nope]").unwrap();

        let err = load_in(tmp.path(), global.path()).unwrap_err();
        assert!(err.downcast_ref::<palinter_core::ConfigError>().is_some());
    }
}
