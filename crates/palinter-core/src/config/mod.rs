//! Layout rules configuration.
//!
//! # Architecture
//!
//! ```text
//! YAML / JSON / TOML text
//!   ↓ serde (format chosen by file extension)
//! serde_json::Value
//!   ↓ serde (DTO layer)
//! dto types
//!   ↓ expand blocks + validate + compile (loader)
//! RuleSet (pure domain model)
//! ```
//!
//! Every problem found on the way is a [`ConfigError`]; nothing is
//! traversed until the whole config has loaded.

use miette::Diagnostic;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

pub mod dto;
pub mod loader;
pub mod model;

pub use loader::LoadError;
pub use model::RuleSet;

/// Serialization format of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.json`
    Json,
    /// `.toml`
    Toml,
}

impl ConfigFormat {
    /// Picks the format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns error for unknown or missing extensions.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        match ext {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            other => Err(ConfigError::UnsupportedFormat {
                extension: other.to_string(),
            }),
        }
    }

    fn parse_value(self, content: &str) -> Result<Value, ConfigError> {
        let parsed = match self {
            Self::Yaml => serde_yaml::from_str::<Value>(content).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str::<Value>(content).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str::<Value>(content).map_err(|e| e.to_string()),
        };
        let value = parsed.map_err(|message| ConfigError::Parse {
            format: self,
            message,
        })?;
        // An empty YAML document is a valid, empty config.
        Ok(if value.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            value
        })
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yaml => f.write_str("YAML"),
            Self::Json => f.write_str("JSON"),
            Self::Toml => f.write_str("TOML"),
        }
    }
}

impl RuleSet {
    /// Loads and resolves a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or resolved.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::debug!("Loading {} config from {}", format, path.display());
        Self::parse(&content, format)
    }

    /// Parses and resolves config text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is invalid or the rules do not resolve.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let value = format.parse_value(content)?;
        Self::from_value(value)
    }

    /// Resolves an already parsed config document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not describe a valid config.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let dto: dto::ConfigDto = serde_json::from_value(value).map_err(|e| ConfigError::Schema {
            message: e.to_string(),
        })?;
        let set = loader::load(dto)?;
        tracing::debug!("Resolved {} rule(s)", set.rule_count());
        Ok(set)
    }
}

/// Fatal configuration errors. Any of these aborts a run before traversal.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("failed to read config file {path}: {source}")]
    #[diagnostic(code(palinter::config::io))]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Syntax error in the config text.
    #[error("failed to parse {format} config: {message}")]
    #[diagnostic(code(palinter::config::parse))]
    Parse {
        /// Format being parsed.
        format: ConfigFormat,
        /// Parser message, with position when available.
        message: String,
    },

    /// Unsupported file extension.
    #[error("unsupported config format `{extension}`")]
    #[diagnostic(
        code(palinter::config::format),
        help("use a .yaml, .yml, .json or .toml file")
    )]
    UnsupportedFormat {
        /// The extension found.
        extension: String,
    },

    /// Top-level structure does not match the schema.
    #[error("invalid config: {message}")]
    #[diagnostic(code(palinter::config::schema))]
    Schema {
        /// Deserializer message.
        message: String,
    },

    /// Rules failed to resolve.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("palinter.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("a/palinter.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert!(matches!(
            ConfigFormat::from_path(Path::new("palinter.ts")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn same_rules_in_every_format() {
        let yaml = r"
global_rules:
  - if_file: { has_extension: svg }
    expect: { name_case_is: kebab-case }
";
        let json = r#"{ "global_rules": [
            { "if_file": { "has_extension": "svg" }, "expect": { "name_case_is": "kebab-case" } }
        ] }"#;
        let toml = r#"
[[global_rules]]
if_file = { has_extension = "svg" }
expect = { name_case_is = "kebab-case" }
"#;
        for (text, format) in [
            (yaml, ConfigFormat::Yaml),
            (json, ConfigFormat::Json),
            (toml, ConfigFormat::Toml),
        ] {
            let set = RuleSet::parse(text, format).unwrap();
            assert_eq!(set.global_rules.len(), 1, "{format}");
        }
    }

    #[test]
    fn empty_yaml_is_empty_config() {
        let set = RuleSet::parse("", ConfigFormat::Yaml).unwrap();
        assert_eq!(set.rule_count(), 0);
    }

    #[test]
    fn syntax_error_is_parse_error() {
        let err = RuleSet::parse("{ not json", ConfigFormat::Json).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: ConfigFormat::Json, .. }));
    }

    #[test]
    fn undefined_block_surfaces_as_load_error() {
        let err = RuleSet::parse("global_rules: [nope]", ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Load(LoadError::UnknownBlock { .. })));
        assert_eq!(err.to_string(), "global_rules[0]: unknown block `nope`");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = RuleSet::from_file(Path::new("/nonexistent/palinter.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
