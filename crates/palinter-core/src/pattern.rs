//! Name and content pattern compilation.
//!
//! Name patterns are globs by default: `*` matches a non-empty run of
//! characters and is a capture group, `(a|b)` is a capturing alternation,
//! `*:PascalCase` additionally requires the captured text to follow a
//! [`NameCase`], and `\` escapes the next character. A `regex:` or
//! `line_regex:` prefix switches to raw regular expression syntax.
//!
//! Content patterns are literal substrings unless prefixed with `regex:`
//! (counted over the whole content) or `line_regex:` (counted per line).

use crate::case::NameCase;
use regex::Regex;
use std::collections::BTreeMap;

const REGEX_PREFIX: &str = "regex:";
const LINE_REGEX_PREFIX: &str = "line_regex:";

/// Errors produced while compiling a pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    /// Pattern is empty.
    #[error("pattern must not be empty")]
    Empty,

    /// A `(` without `)` or vice versa.
    #[error("unbalanced group in pattern `{pattern}`")]
    UnbalancedGroup {
        /// The offending pattern.
        pattern: String,
    },

    /// A trailing `\` with nothing to escape.
    #[error("dangling escape at end of pattern `{pattern}`")]
    DanglingEscape {
        /// The offending pattern.
        pattern: String,
    },

    /// The regex engine rejected the pattern.
    #[error("invalid regex `{pattern}`: {reason}")]
    InvalidRegex {
        /// The offending pattern.
        pattern: String,
        /// Message from the regex engine.
        reason: String,
    },
}

/// How a pattern string is interpreted. Decides how substituted values are
/// escaped when a pattern is rendered from a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternSyntax {
    /// Glob-style name pattern.
    Glob,
    /// Literal content substring.
    Literal,
    /// Raw regular expression (`regex:` or `line_regex:`).
    Regex,
}

impl PatternSyntax {
    /// Detects the syntax of a raw name pattern.
    #[must_use]
    pub fn of_name(raw: &str) -> Self {
        if has_regex_prefix(raw) {
            Self::Regex
        } else {
            Self::Glob
        }
    }

    /// Detects the syntax of a raw content pattern.
    #[must_use]
    pub fn of_content(raw: &str) -> Self {
        if has_regex_prefix(raw) {
            Self::Regex
        } else {
            Self::Literal
        }
    }

    /// Escapes a substituted value so it matches itself literally.
    #[must_use]
    pub fn escape(self, value: &str) -> String {
        match self {
            Self::Glob => escape_glob(value),
            Self::Literal => value.to_string(),
            Self::Regex => regex::escape(value),
        }
    }
}

fn has_regex_prefix(raw: &str) -> bool {
    raw.starts_with(REGEX_PREFIX) || raw.starts_with(LINE_REGEX_PREFIX)
}

/// Escapes glob metacharacters in `value`.
#[must_use]
pub fn escape_glob(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '*' | '(' | ')' | '|' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Substrings captured by a successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    positional: Vec<String>,
    named: BTreeMap<String, String>,
}

impl Captures {
    /// Returns the `n`th capture (1-based, like `$1`).
    #[must_use]
    pub fn get(&self, n: usize) -> Option<&str> {
        n.checked_sub(1)
            .and_then(|i| self.positional.get(i))
            .map(String::as_str)
    }

    /// Returns a named capture.
    #[must_use]
    pub fn name(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Returns all named captures.
    #[must_use]
    pub fn named(&self) -> &BTreeMap<String, String> {
        &self.named
    }

    /// Number of positional captures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    /// Returns `true` if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Combines two capture sets. Positional captures of `self` win unless
    /// empty; named captures of `self` shadow those of `other`.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        if self.positional.is_empty() {
            self.positional = other.positional;
        }
        for (name, value) in other.named {
            self.named.entry(name).or_insert(value);
        }
        self
    }

    fn from_regex(regex: &Regex, caps: &regex::Captures<'_>) -> Self {
        let positional = (1..caps.len())
            .map(|i| caps.get(i).map_or_else(String::new, |m| m.as_str().to_string()))
            .collect();
        let named = regex
            .capture_names()
            .flatten()
            .map(|name| {
                let value = caps.name(name).map_or("", |m| m.as_str());
                (name.to_string(), value.to_string())
            })
            .collect();
        Self { positional, named }
    }
}

/// A compiled matcher for file and folder names.
#[derive(Debug, Clone)]
pub struct NamePattern {
    raw: String,
    regex: Regex,
    case_constraints: Vec<(usize, NameCase)>,
}

impl NamePattern {
    /// Compiles a name pattern.
    ///
    /// # Errors
    ///
    /// Returns error if the pattern is empty, has unbalanced groups, or is an
    /// invalid regex after a `regex:` prefix.
    pub fn new(raw: &str) -> Result<Self, PatternError> {
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }
        let (source, case_constraints) = if let Some(re) = strip_regex_prefix(raw) {
            (re.to_string(), Vec::new())
        } else {
            glob_to_regex(raw)?
        };
        let regex = Regex::new(&source).map_err(|e| PatternError::InvalidRegex {
            pattern: raw.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            raw: raw.to_string(),
            regex,
            case_constraints,
        })
    }

    /// Matches `name`, returning its captures on success.
    #[must_use]
    pub fn captures(&self, name: &str) -> Option<Captures> {
        let caps = self.regex.captures(name)?;
        let captures = Captures::from_regex(&self.regex, &caps);
        let cases_ok = self.case_constraints.iter().all(|&(group, case)| {
            captures
                .get(group)
                .is_some_and(|value| case.matches_segment(value))
        });
        cases_ok.then_some(captures)
    }

    /// Tests whether `name` matches.
    #[must_use]
    pub fn is_match(&self, name: &str) -> bool {
        self.captures(name).is_some()
    }

    /// Number of capture groups (named groups included).
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.regex.captures_len() - 1
    }

    /// Names of the named capture groups.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.regex.capture_names().flatten()
    }

    /// Returns the pattern as written in the config.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// A compiled matcher for file content.
#[derive(Debug, Clone)]
pub enum ContentPattern {
    /// Plain substring; occurrences are counted without overlap.
    Literal(String),
    /// `regex:` pattern run over the whole content.
    Regex(Regex),
    /// `line_regex:` pattern run over every line separately.
    LineRegex(Regex),
}

impl ContentPattern {
    /// Compiles a content pattern.
    ///
    /// # Errors
    ///
    /// Returns error if the pattern is empty or an invalid regex.
    pub fn new(raw: &str) -> Result<Self, PatternError> {
        let compile = |source: &str| {
            if source.is_empty() {
                return Err(PatternError::Empty);
            }
            Regex::new(source).map_err(|e| PatternError::InvalidRegex {
                pattern: raw.to_string(),
                reason: e.to_string(),
            })
        };
        if let Some(source) = raw.strip_prefix(LINE_REGEX_PREFIX) {
            return compile(source).map(Self::LineRegex);
        }
        if let Some(source) = raw.strip_prefix(REGEX_PREFIX) {
            return compile(source).map(Self::Regex);
        }
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }
        Ok(Self::Literal(raw.to_string()))
    }

    /// Counts non-overlapping occurrences in `content`.
    #[must_use]
    pub fn count_matches(&self, content: &str) -> usize {
        match self {
            Self::Literal(text) => content.matches(text.as_str()).count(),
            Self::Regex(regex) => regex.find_iter(content).count(),
            Self::LineRegex(regex) => content
                .lines()
                .map(|line| regex.find_iter(line).count())
                .sum(),
        }
    }
}

fn strip_regex_prefix(raw: &str) -> Option<&str> {
    raw.strip_prefix(REGEX_PREFIX)
        .or_else(|| raw.strip_prefix(LINE_REGEX_PREFIX))
}

/// Translates a glob name pattern into an anchored regex plus the case
/// constraints attached to `*:Case` groups.
fn glob_to_regex(raw: &str) -> Result<(String, Vec<(usize, NameCase)>), PatternError> {
    let mut out = String::from("^(?:");
    let mut constraints = Vec::new();
    let mut group = 0usize;
    let mut depth = 0usize;
    let mut rest = raw;

    while let Some(c) = rest.chars().next() {
        rest = &rest[c.len_utf8()..];
        match c {
            '*' => {
                group += 1;
                out.push_str("(.+)");
                if let Some(after) = rest.strip_prefix(':') {
                    if let Some(case) = NameCase::ALL
                        .into_iter()
                        .find(|case| after.starts_with(case.as_str()))
                    {
                        constraints.push((group, case));
                        rest = &after[case.as_str().len()..];
                    }
                }
            }
            '(' => {
                group += 1;
                depth += 1;
                out.push('(');
            }
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| PatternError::UnbalancedGroup {
                        pattern: raw.to_string(),
                    })?;
                out.push(')');
            }
            '|' => out.push('|'),
            '\\' => {
                let escaped = rest.chars().next().ok_or_else(|| PatternError::DanglingEscape {
                    pattern: raw.to_string(),
                })?;
                rest = &rest[escaped.len_utf8()..];
                out.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4])));
            }
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }

    if depth != 0 {
        return Err(PatternError::UnbalancedGroup {
            pattern: raw.to_string(),
        });
    }
    out.push_str(")$");
    Ok((out, constraints))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_star_captures_prefix() {
        let p = NamePattern::new("*Store.utils.ts").unwrap();
        let caps = p.captures("counterStore.utils.ts").unwrap();
        assert_eq!(caps.get(1), Some("counter"));
        assert!(!p.is_match("counterUtils.ts"));
    }

    #[test]
    fn glob_alternation_is_a_capture_group() {
        let p = NamePattern::new("*(Doc|List|Query).(utils|actions).ts").unwrap();
        let caps = p.captures("chatMessageList.actions.ts").unwrap();
        assert_eq!(caps.get(1), Some("chatMessage"));
        assert_eq!(caps.get(2), Some("List"));
        assert_eq!(caps.get(3), Some("actions"));
        assert_eq!(p.group_count(), 3);
    }

    #[test]
    fn glob_dot_is_literal() {
        let p = NamePattern::new("*.ts").unwrap();
        assert!(p.is_match("a.ts"));
        assert!(!p.is_match("a_ts"));
        assert!(!p.is_match(".ts"));
    }

    #[test]
    fn glob_case_suffix_constrains_capture() {
        let p = NamePattern::new("*:PascalCase.(hooks|utils|style|types).ts").unwrap();
        assert_eq!(
            p.captures("TopNav.hooks.ts").unwrap().get(1),
            Some("TopNav")
        );
        assert!(!p.is_match("topNav.hooks.ts"));
        assert!(!p.is_match("TopNav.tsx"));
    }

    #[test]
    fn glob_unbalanced_group_is_rejected() {
        assert!(matches!(
            NamePattern::new("*(Doc|List.ts"),
            Err(PatternError::UnbalancedGroup { .. })
        ));
        assert!(matches!(
            NamePattern::new("Doc).ts"),
            Err(PatternError::UnbalancedGroup { .. })
        ));
    }

    #[test]
    fn glob_escape_round_trips_metacharacters() {
        let p = NamePattern::new(&format!("{}.ts", escape_glob("a(b)*"))).unwrap();
        assert!(p.is_match("a(b)*.ts"));
        assert!(!p.is_match("ab.ts"));
    }

    #[test]
    fn regex_prefix_exposes_named_groups() {
        let p = NamePattern::new("regex:(?<baseName>.+)(Doc|Store|List).ts").unwrap();
        let caps = p.captures("userStore.ts").unwrap();
        assert_eq!(caps.name("baseName"), Some("user"));
        assert_eq!(caps.get(2), Some("Store"));
        assert_eq!(p.group_names().collect::<Vec<_>>(), vec!["baseName"]);
    }

    #[test]
    fn invalid_regex_is_an_error() {
        assert!(matches!(
            NamePattern::new("regex:(unclosed"),
            Err(PatternError::InvalidRegex { .. })
        ));
        assert!(matches!(
            ContentPattern::new("line_regex:[a-"),
            Err(PatternError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn content_literal_counts_non_overlapping() {
        let p = ContentPattern::new("aa").unwrap();
        assert_eq!(p.count_matches("aaaa"), 2);
        assert_eq!(p.count_matches("b"), 0);
    }

    #[test]
    fn content_regex_counts_whole_content() {
        let p = ContentPattern::new("regex:= create\\w+Store").unwrap();
        let content = "const a = createDocumentStore()\nconst b = createListStore()\n";
        assert_eq!(p.count_matches(content), 2);
    }

    #[test]
    fn line_regex_anchors_each_line() {
        let p = ContentPattern::new("line_regex:^export const").unwrap();
        let content = "export const A = 1\n  export const B = 2\nexport const C = 3\n";
        assert_eq!(p.count_matches(content), 2);

        let whole = ContentPattern::new("regex:^export const").unwrap();
        assert_eq!(whole.count_matches(content), 1);
    }

    #[test]
    fn empty_patterns_are_rejected() {
        assert_eq!(NamePattern::new("").unwrap_err(), PatternError::Empty);
        assert_eq!(ContentPattern::new("").unwrap_err(), PatternError::Empty);
        assert_eq!(ContentPattern::new("regex:").unwrap_err(), PatternError::Empty);
    }
}
