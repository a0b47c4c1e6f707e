//! Deserialization types (DTO layer).
//!
//! These types exist solely for serde deserialization. Positions where the
//! schema is a sum type (`"any"` vs. object, rule vs. block name, folder
//! keys) stay as [`Value`] so the loader can report errors with their exact
//! location in the config.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Raw top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDto {
    /// Named reusable rules: a rule or a list of rules and block names.
    #[serde(default)]
    pub blocks: BTreeMap<String, Value>,

    /// Rules appended to every folder's rule list.
    #[serde(default)]
    pub global_rules: Vec<Value>,

    /// Globs of paths skipped entirely.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Extensions whose content is analyzed.
    #[serde(default)]
    pub analyze_content_of_files_types: Option<Vec<String>>,

    /// The root folder (`./`, or `/.` in older configs).
    #[serde(rename = "./", alias = "/.", default)]
    pub root: Option<Value>,
}

/// Raw folder scope. Keys starting with `/` are subfolders and end up in
/// `folders`; any other unknown key is rejected by the loader.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderDto {
    /// Files required in this folder (`has_files` in older configs).
    #[serde(default, alias = "has_files")]
    pub has_files_in_root: Vec<String>,
    /// Rules and block names.
    #[serde(default)]
    pub rules: Vec<Value>,
    /// Accept files matched by no rule.
    #[serde(default)]
    pub allow_unconfigured_files: bool,
    /// Accept folders matched by no rule.
    #[serde(default)]
    pub allow_unconfigured_folders: bool,
    /// Do not report the folder as missing.
    #[serde(default)]
    pub optional: bool,
    /// Extra text for unexpected-file violations.
    #[serde(default)]
    pub unexpected_files_error_msg: Option<String>,
    /// Extra text for unexpected-folder violations.
    #[serde(default)]
    pub unexpected_folders_error_msg: Option<String>,
    /// Subfolders and unknown keys.
    #[serde(flatten)]
    pub folders: BTreeMap<String, Value>,
}

/// Raw rule. Exactly one of `if_file`, `if_folder`, `one_of` must be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDto {
    /// Stable identity.
    #[serde(default)]
    pub id: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// `"any"` or a [`FileFilterDto`].
    #[serde(default)]
    pub if_file: Option<Value>,
    /// `"any"` or a [`FolderFilterDto`].
    #[serde(default)]
    pub if_folder: Option<Value>,
    /// Alternatives: rules and block names.
    #[serde(default)]
    pub one_of: Option<Vec<Value>>,
    /// `"any"`, `"none"`, an expectation object or a list of them.
    #[serde(default)]
    pub expect: Option<Value>,
    /// Message template.
    #[serde(default)]
    pub error_msg: Option<String>,
    /// Do not apply below the declaring folder's children.
    #[serde(default)]
    pub non_recursive: bool,
    /// Report violations as warnings.
    #[serde(default)]
    pub is_warning: bool,
    /// Do not mark matched nodes as configured.
    #[serde(default)]
    pub not_touch: bool,
}

/// A scalar or a list of scalars.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// Single value.
    One(T),
    /// List of values.
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Flattens into a vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(v) => vec![v],
            Self::Many(v) => v,
        }
    }
}

/// Converts an optional [`OneOrMany`] into a possibly empty vector.
#[must_use]
pub fn many<T>(value: Option<OneOrMany<T>>) -> Vec<T> {
    value.map_or_else(Vec::new, OneOrMany::into_vec)
}

/// Object form of `if_file`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileFilterDto {
    /// Extension(s) without the dot.
    #[serde(default)]
    pub has_extension: Option<OneOrMany<String>>,
    /// Name pattern(s).
    #[serde(default)]
    pub has_name: Option<OneOrMany<String>>,
    /// Required case of the leading segment.
    #[serde(default)]
    pub has_name_case: Option<String>,
    /// Excluded name pattern(s).
    #[serde(default, alias = "not_has_name")]
    pub does_not_have_name: Option<OneOrMany<String>>,
}

/// Object form of `if_folder`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FolderFilterDto {
    /// Name pattern(s).
    #[serde(default)]
    pub has_name: Option<OneOrMany<String>>,
    /// Required case of the leading segment.
    #[serde(default)]
    pub has_name_case: Option<String>,
    /// Excluded name pattern(s).
    #[serde(default, alias = "not_has_name")]
    pub does_not_have_name: Option<OneOrMany<String>>,
    /// Root file filters.
    #[serde(default)]
    pub root_files: Option<RootFilesFilterDto>,
}

/// `if_folder.root_files`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootFilesFilterDto {
    /// Pattern extracting the base name of root files.
    #[serde(default)]
    pub does_not_have_duplicate_name: Option<String>,
}

/// Expectation object of a file rule.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileExpectDto {
    /// Case of the leading segment.
    #[serde(default)]
    pub name_case_is: Option<String>,
    /// Accepted name pattern(s).
    #[serde(default)]
    pub name_is: Option<OneOrMany<String>>,
    /// Rejected name pattern(s).
    #[serde(default)]
    pub name_is_not: Option<OneOrMany<String>>,
    /// Accepted extension(s).
    #[serde(default)]
    pub extension_is: Option<OneOrMany<String>>,
    /// Required sibling pattern(s).
    #[serde(default, alias = "have_sibling_file")]
    pub has_sibling_file: Option<OneOrMany<String>>,
    /// Forbidden substrings of the name.
    #[serde(default)]
    pub name_not_includes_any: Option<Vec<String>>,
    /// Constraints that must all pass.
    #[serde(default)]
    pub content_matches: Option<Vec<Value>>,
    /// Constraints of which one must pass.
    #[serde(default)]
    pub content_matches_some: Option<Vec<Value>>,
    /// Deprecated: one `some` constraint over these patterns.
    #[serde(default)]
    pub content_matches_any: Option<Vec<String>>,
    /// Forbidden content pattern(s).
    #[serde(default)]
    pub content_not_matches: Option<OneOrMany<String>>,
    /// Message template.
    #[serde(default)]
    pub error_msg: Option<String>,
}

/// Expectation object of a folder rule.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FolderExpectDto {
    /// Case of the leading segment.
    #[serde(default)]
    pub name_case_is: Option<String>,
    /// Accepted name pattern(s).
    #[serde(default)]
    pub name_is: Option<OneOrMany<String>>,
    /// Rejected name pattern(s).
    #[serde(default)]
    pub name_is_not: Option<OneOrMany<String>>,
    /// Root file predicates.
    #[serde(default)]
    pub root_files: Option<RootFilesExpectDto>,
    /// Message template.
    #[serde(default)]
    pub error_msg: Option<String>,
}

/// `expect.root_files` of a folder rule.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootFilesExpectDto {
    /// Required root file pattern(s).
    #[serde(default)]
    pub has: Option<OneOrMany<String>>,
    /// Forbidden root file pattern(s).
    #[serde(default)]
    pub does_not_have: Option<OneOrMany<String>>,
    /// Pattern extracting the base name of root files.
    #[serde(default)]
    pub does_not_have_duplicate_name: Option<String>,
}

/// Object form of a content constraint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentMatchDto {
    /// Patterns of which one must be within bounds.
    #[serde(default, alias = "any")]
    pub some: Option<Vec<String>>,
    /// Patterns that must all be within bounds.
    #[serde(default, alias = "all")]
    pub every: Option<Vec<String>>,
    /// Minimum occurrences.
    #[serde(default, alias = "minMatches")]
    pub at_least: Option<usize>,
    /// Maximum occurrences.
    #[serde(default, alias = "maxMatches")]
    pub at_most: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_empty() {
        let dto: ConfigDto = serde_json::from_str("{}").unwrap();
        assert!(dto.blocks.is_empty());
        assert!(dto.global_rules.is_empty());
        assert!(dto.root.is_none());
    }

    #[test]
    fn root_key_alias() {
        let dto: ConfigDto = serde_json::from_str(r#"{ "/.": { "rules": [] } }"#).unwrap();
        assert!(dto.root.is_some());
    }

    #[test]
    fn unknown_top_level_key_rejected() {
        assert!(serde_json::from_str::<ConfigDto>(r#"{ "global_rule": [] }"#).is_err());
    }

    #[test]
    fn folder_keeps_subfolders_and_aliases() {
        let folder: FolderDto = serde_yaml::from_str(
            r"
has_files: [index.ts]
/components:
  rules: []
",
        )
        .unwrap();
        assert_eq!(folder.has_files_in_root, vec!["index.ts".to_string()]);
        assert!(folder.folders.contains_key("/components"));
    }

    #[test]
    fn rule_rejects_unknown_fields() {
        let value = serde_json::json!({ "if_file": "any", "expects": "any" });
        assert!(serde_json::from_value::<RuleDto>(value).is_err());
    }

    #[test]
    fn content_match_legacy_aliases() {
        let dto: ContentMatchDto = serde_json::from_value(serde_json::json!({
            "any": ["a", "b"],
            "maxMatches": 1
        }))
        .unwrap();
        assert_eq!(dto.some.map(|v| v.len()), Some(2));
        assert_eq!(dto.at_most, Some(1));
    }

    #[test]
    fn one_or_many_accepts_both() {
        let f: FileFilterDto =
            serde_json::from_value(serde_json::json!({ "has_name": "*.ts" })).unwrap();
        assert_eq!(many(f.has_name), vec!["*.ts".to_string()]);
        let f: FileFilterDto =
            serde_json::from_value(serde_json::json!({ "has_name": ["a", "b"] })).unwrap();
        assert_eq!(many(f.has_name).len(), 2);
    }
}
