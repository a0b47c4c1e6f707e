//! Naming conventions: predicates and conversions.
//!
//! Predicates check the *leading segment* of a name, i.e. everything before
//! the first `.` (`userStore.utils.ts` is checked as `userStore`).

use std::fmt;
use std::str::FromStr;

/// A naming convention checkable as a predicate and usable as a
/// conversion target in templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameCase {
    /// `camelCase`
    Camel,
    /// `PascalCase`
    Pascal,
    /// `snake_case`
    Snake,
    /// `kebab-case`
    Kebab,
    /// `CONSTANT_CASE`
    Constant,
}

impl NameCase {
    /// All supported cases, in the order they are documented.
    pub const ALL: [Self; 5] = [
        Self::Camel,
        Self::Pascal,
        Self::Snake,
        Self::Kebab,
        Self::Constant,
    ];

    /// Returns the canonical config spelling of this case.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Camel => "camelCase",
            Self::Pascal => "PascalCase",
            Self::Snake => "snake_case",
            Self::Kebab => "kebab-case",
            Self::Constant => "CONSTANT_CASE",
        }
    }

    /// Tests whether the leading segment of `name` follows this convention.
    #[must_use]
    pub fn matches(self, name: &str) -> bool {
        self.matches_segment(leading_segment(name))
    }

    /// Tests a bare segment (no `.` splitting).
    #[must_use]
    pub fn matches_segment(self, segment: &str) -> bool {
        let mut chars = segment.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        let rest = chars.as_str();
        match self {
            Self::Camel => {
                first.is_ascii_lowercase() && rest.chars().all(|c| c.is_ascii_alphanumeric())
            }
            Self::Pascal => {
                first.is_ascii_uppercase() && rest.chars().all(|c| c.is_ascii_alphanumeric())
            }
            Self::Snake => separated_words(segment, '_', |c| {
                c.is_ascii_lowercase() || c.is_ascii_digit()
            }) && first.is_ascii_lowercase(),
            Self::Kebab => separated_words(segment, '-', |c| {
                c.is_ascii_lowercase() || c.is_ascii_digit()
            }) && first.is_ascii_lowercase(),
            Self::Constant => separated_words(segment, '_', |c| {
                c.is_ascii_uppercase() || c.is_ascii_digit()
            }) && first.is_ascii_uppercase(),
        }
    }

    /// Converts an arbitrary identifier-like string into this case.
    ///
    /// Word boundaries are `-`, `_`, `.`, whitespace, lower→upper
    /// transitions and the end of an acronym (`HTTPServer` → `HTTP`, `Server`).
    #[must_use]
    pub fn convert(self, input: &str) -> String {
        let words = split_words(input);
        match self {
            Self::Camel => words
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    if i == 0 {
                        w.to_ascii_lowercase()
                    } else {
                        capitalize(w)
                    }
                })
                .collect(),
            Self::Pascal => words.iter().map(|w| capitalize(w)).collect(),
            Self::Snake => join_mapped(&words, "_", str::to_ascii_lowercase),
            Self::Kebab => join_mapped(&words, "-", str::to_ascii_lowercase),
            Self::Constant => join_mapped(&words, "_", str::to_ascii_uppercase),
        }
    }
}

impl fmt::Display for NameCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised case name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown name case `{0}`, expected one of: camelCase, PascalCase, snake_case, kebab-case, CONSTANT_CASE")]
pub struct UnknownCase(pub String);

impl FromStr for NameCase {
    type Err = UnknownCase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|case| case.as_str() == s)
            .ok_or_else(|| UnknownCase(s.to_string()))
    }
}

/// Returns the part of `name` before the first `.`.
#[must_use]
pub fn leading_segment(name: &str) -> &str {
    name.split_once('.').map_or(name, |(head, _)| head)
}

fn separated_words(segment: &str, sep: char, allowed: impl Fn(char) -> bool) -> bool {
    segment
        .split(sep)
        .all(|word| !word.is_empty() && word.chars().all(&allowed))
}

fn split_words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
        None => String::new(),
    }
}

fn join_mapped(words: &[String], sep: &str, map: impl Fn(&str) -> String) -> String {
    words.iter().map(|w| map(w)).collect::<Vec<_>>().join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kebab_case_predicate() {
        assert!(NameCase::Kebab.matches("password-reset"));
        assert!(NameCase::Kebab.matches("icon-1.svg"));
        assert!(!NameCase::Kebab.matches("PasswordReset"));
        assert!(!NameCase::Kebab.matches("password_reset"));
        assert!(!NameCase::Kebab.matches("password--reset"));
    }

    #[test]
    fn camel_and_pascal_predicates() {
        assert!(NameCase::Camel.matches("userStore.utils.ts"));
        assert!(!NameCase::Camel.matches("UserStore.ts"));
        assert!(NameCase::Pascal.matches("MenuItem.tsx"));
        assert!(!NameCase::Pascal.matches("menuItem.tsx"));
        assert!(!NameCase::Pascal.matches("_shell"));
    }

    #[test]
    fn snake_and_constant_predicates() {
        assert!(NameCase::Snake.matches("user_store"));
        assert!(!NameCase::Snake.matches("user-store"));
        assert!(NameCase::Constant.matches("MAX_SIZE.ts"));
        assert!(!NameCase::Constant.matches("Max_Size"));
    }

    #[test]
    fn empty_segment_matches_nothing() {
        for case in NameCase::ALL {
            assert!(!case.matches(".eslintrc"), "{case} accepted empty segment");
        }
    }

    #[test]
    fn convert_between_cases() {
        assert_eq!(NameCase::Pascal.convert("password-reset"), "PasswordReset");
        assert_eq!(NameCase::Camel.convert("PasswordReset"), "passwordReset");
        assert_eq!(NameCase::Kebab.convert("userStore"), "user-store");
        assert_eq!(NameCase::Snake.convert("HTTPServer"), "http_server");
        assert_eq!(NameCase::Constant.convert("fields"), "FIELDS");
        assert_eq!(NameCase::Pascal.convert("fields"), "Fields");
    }

    #[test]
    fn parse_case_names() {
        assert_eq!("kebab-case".parse::<NameCase>(), Ok(NameCase::Kebab));
        assert!("Kebab".parse::<NameCase>().is_err());
    }
}
