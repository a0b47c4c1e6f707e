//! Per-evaluation state for template substitution.

use crate::case::{leading_segment, NameCase};
use crate::pattern::Captures;
use crate::template::TemplateRef;
use std::collections::BTreeMap;

/// Builtin variable holding the file name without extensions (file rules).
pub const FILE_NAME: &str = "fileName";
/// Builtin variable holding the containing folder name. For folder rules it
/// is the matched folder itself.
pub const PARENT_FOLDER: &str = "parentFolder";
/// Builtin variable holding the matched folder name (folder rules).
pub const FOLDER_NAME: &str = "folderName";

/// Named captures inherited from folder conditions on ancestor folders.
pub type Inherited = BTreeMap<String, String>;

/// Variables visible while one rule is evaluated against one node.
///
/// Lookup order for a name: captures of the rule's own condition, then
/// builtins, then captures inherited from ancestor folders.
#[derive(Debug, Clone)]
pub struct MatchContext<'a> {
    captures: Captures,
    inherited: &'a Inherited,
    file_name: Option<&'a str>,
    folder_name: Option<&'a str>,
    parent_folder: &'a str,
}

impl<'a> MatchContext<'a> {
    /// Context for a file rule.
    #[must_use]
    pub fn for_file(file_name: &'a str, parent_folder: &'a str, inherited: &'a Inherited) -> Self {
        Self {
            captures: Captures::default(),
            inherited,
            file_name: Some(leading_segment(file_name)),
            folder_name: None,
            parent_folder,
        }
    }

    /// Context for a folder rule.
    #[must_use]
    pub fn for_folder(folder_name: &'a str, inherited: &'a Inherited) -> Self {
        Self {
            captures: Captures::default(),
            inherited,
            file_name: None,
            folder_name: Some(folder_name),
            parent_folder: folder_name,
        }
    }

    /// Attaches the captures produced by the rule's condition.
    #[must_use]
    pub fn with_captures(mut self, captures: Captures) -> Self {
        self.captures = captures;
        self
    }

    /// Returns the condition captures.
    #[must_use]
    pub fn captures(&self) -> &Captures {
        &self.captures
    }

    /// Resolves a template reference, applying any case conversion.
    #[must_use]
    pub fn resolve(&self, reference: &TemplateRef) -> Option<String> {
        match reference {
            TemplateRef::Index(n) => self.captures.get(*n).map(str::to_string),
            TemplateRef::Name { name, case } => {
                let value = self.lookup_name(name)?;
                Some(case.map_or_else(|| value.to_string(), |c: NameCase| c.convert(value)))
            }
        }
    }

    fn lookup_name(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.captures.name(name) {
            return Some(value);
        }
        match name {
            FILE_NAME if self.file_name.is_some() => self.file_name,
            FOLDER_NAME if self.folder_name.is_some() => self.folder_name,
            PARENT_FOLDER => Some(self.parent_folder),
            _ => self.inherited.get(name).map(String::as_str),
        }
    }
}

/// Builtin names available to file rules.
pub const FILE_BUILTINS: &[&str] = &[FILE_NAME, PARENT_FOLDER];
/// Builtin names available to folder rules.
pub const FOLDER_BUILTINS: &[&str] = &[FOLDER_NAME, PARENT_FOLDER];
