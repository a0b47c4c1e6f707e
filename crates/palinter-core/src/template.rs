//! Variable substitution templates.
//!
//! Supported references:
//!
//! | Syntax                     | Meaning                                   |
//! |----------------------------|-------------------------------------------|
//! | `$1`, `{{1}}`              | numbered capture of the current match     |
//! | `{{baseName}}`             | named capture or builtin variable         |
//! | `{{parentFolder as Case}}` | variable converted to a [`NameCase`]      |
//! | `{{fileName:Case}}`        | same conversion, short form               |
//! | `$$`                       | a literal `$`                             |
//!
//! Templates are parsed once when the config is loaded. Resolution is
//! delegated to a lookup function so this module knows nothing about where
//! values come from.

use crate::case::NameCase;
use std::fmt;

/// A single `{{...}}` or `$n` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRef {
    /// Numbered capture group, 1-based.
    Index(usize),
    /// Named capture or builtin, optionally case-converted.
    Name {
        /// Variable name.
        name: String,
        /// Conversion applied to the resolved value.
        case: Option<NameCase>,
    },
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(n) => write!(f, "{{{{{n}}}}}"),
            Self::Name { name, case: None } => write!(f, "{{{{{name}}}}}"),
            Self::Name {
                name,
                case: Some(case),
            } => write!(f, "{{{{{name} as {case}}}}}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Ref { reference: TemplateRef, raw: String },
}

/// Errors found while parsing a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// `{{` without a closing `}}`.
    #[error("unterminated `{{{{` in template `{template}`")]
    Unterminated {
        /// The template text.
        template: String,
    },

    /// The text between braces is not a valid reference.
    #[error("invalid reference `{{{{{inner}}}}}` in template `{template}`")]
    InvalidReference {
        /// The template text.
        template: String,
        /// The reference body.
        inner: String,
    },

    /// Capture groups are numbered from 1.
    #[error("capture references start at 1, found `{reference}` in template `{template}`")]
    ZeroIndex {
        /// The template text.
        template: String,
        /// The offending reference.
        reference: String,
    },
}

/// A reference that could not be resolved at render time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unresolved reference `{0}`")]
pub struct Unresolved(pub String);

/// A parsed template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parses a template.
    ///
    /// # Errors
    ///
    /// Returns error on unterminated braces, malformed references or `$0`.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = raw;

        while let Some(c) = rest.chars().next() {
            if let Some(after) = rest.strip_prefix("{{") {
                let end = after.find("}}").ok_or_else(|| TemplateError::Unterminated {
                    template: raw.to_string(),
                })?;
                let inner = &after[..end];
                let reference = parse_reference(inner.trim()).ok_or_else(|| {
                    TemplateError::InvalidReference {
                        template: raw.to_string(),
                        inner: inner.to_string(),
                    }
                })?;
                check_index(&reference, raw)?;
                push_literal(&mut segments, &mut literal);
                segments.push(Segment::Ref {
                    reference,
                    raw: format!("{{{{{inner}}}}}"),
                });
                rest = &after[end + 2..];
                continue;
            }

            if let Some(after) = rest.strip_prefix("$$") {
                literal.push('$');
                rest = after;
                continue;
            }

            if c == '$' {
                let digits: String = rest[1..].chars().take_while(char::is_ascii_digit).collect();
                if let Ok(n) = digits.parse::<usize>() {
                    let reference = TemplateRef::Index(n);
                    check_index(&reference, raw)?;
                    push_literal(&mut segments, &mut literal);
                    segments.push(Segment::Ref {
                        reference,
                        raw: format!("${digits}"),
                    });
                    rest = &rest[1 + digits.len()..];
                    continue;
                }
            }

            literal.push(c);
            rest = &rest[c.len_utf8()..];
        }
        push_literal(&mut segments, &mut literal);

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Returns the template as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the literal text of a template without references, with
    /// `$$` unescaped.
    #[must_use]
    pub fn literal_text(&self) -> Option<String> {
        self.is_static().then(|| {
            self.segments
                .iter()
                .filter_map(|s| match s {
                    Segment::Literal(text) => Some(text.as_str()),
                    Segment::Ref { .. } => None,
                })
                .collect()
        })
    }

    /// Returns `true` if the template has no references.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Iterates over the references in order of appearance.
    pub fn refs(&self) -> impl Iterator<Item = &TemplateRef> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Ref { reference, .. } => Some(reference),
            Segment::Literal(_) => None,
        })
    }

    /// Renders the template, escaping every substituted value.
    ///
    /// # Errors
    ///
    /// Returns the first reference `lookup` cannot resolve.
    pub fn render<L, E>(&self, lookup: L, escape: E) -> Result<String, Unresolved>
    where
        L: Fn(&TemplateRef) -> Option<String>,
        E: Fn(&str) -> String,
    {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Ref { reference, raw } => {
                    let value = lookup(reference).ok_or_else(|| Unresolved(raw.clone()))?;
                    out.push_str(&escape(&value));
                }
            }
        }
        Ok(out)
    }

    /// Renders the template for display, leaving unresolved references as
    /// written.
    #[must_use]
    pub fn render_lossy<L>(&self, lookup: L) -> String
    where
        L: Fn(&TemplateRef) -> Option<String>,
    {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Ref { reference, raw } => {
                    out.push_str(&lookup(reference).unwrap_or_else(|| raw.clone()));
                }
            }
        }
        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn push_literal(segments: &mut Vec<Segment>, literal: &mut String) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

fn check_index(reference: &TemplateRef, raw: &str) -> Result<(), TemplateError> {
    if *reference == TemplateRef::Index(0) {
        return Err(TemplateError::ZeroIndex {
            template: raw.to_string(),
            reference: reference.to_string(),
        });
    }
    Ok(())
}

fn parse_reference(inner: &str) -> Option<TemplateRef> {
    if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
        return inner.parse().ok().map(TemplateRef::Index);
    }

    let (name, case) = if let Some((name, case)) = inner.split_once(" as ") {
        (name.trim(), Some(case.trim()))
    } else if let Some((name, case)) = inner.split_once(':') {
        (name.trim(), Some(case.trim()))
    } else {
        (inner, None)
    };

    if !is_identifier(name) {
        return None;
    }
    let case = match case {
        Some(case) => Some(case.parse::<NameCase>().ok()?),
        None => None,
    };
    Some(TemplateRef::Name {
        name: name.to_string(),
        case,
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(r: &TemplateRef) -> Option<String> {
        match r {
            TemplateRef::Index(1) => Some("counter".to_string()),
            TemplateRef::Index(2) => Some("a.b".to_string()),
            TemplateRef::Name { name, case } if name == "parentFolder" => {
                let value = "password-reset";
                Some(case.map_or_else(|| value.to_string(), |c| c.convert(value)))
            }
            _ => None,
        }
    }

    #[test]
    fn dollar_and_brace_indices() {
        let t = Template::parse("$1Store.ts or {{1}}.tsx").unwrap();
        assert_eq!(
            t.render(lookup, str::to_string).unwrap(),
            "counterStore.ts or counter.tsx"
        );
        assert_eq!(t.refs().count(), 2);
    }

    #[test]
    fn case_conversion_forms() {
        let long = Template::parse("{{parentFolder as PascalCase}}.tsx").unwrap();
        let short = Template::parse("{{ parentFolder:PascalCase }}.tsx").unwrap();
        assert_eq!(long.render(lookup, str::to_string).unwrap(), "PasswordReset.tsx");
        assert_eq!(short.render(lookup, str::to_string).unwrap(), "PasswordReset.tsx");
    }

    #[test]
    fn values_are_escaped() {
        let t = Template::parse("regex:^$2$").unwrap();
        assert_eq!(t.render(lookup, regex::escape).unwrap(), "regex:^a\\.b$");
    }

    #[test]
    fn dollar_without_digits_is_literal() {
        let t = Template::parse("regex:foo$").unwrap();
        assert!(t.is_static());
        assert_eq!(t.render(lookup, str::to_string).unwrap(), "regex:foo$");
    }

    #[test]
    fn double_dollar_is_a_literal_dollar() {
        let t = Template::parse("costs $$5 or $1").unwrap();
        assert_eq!(t.refs().collect::<Vec<_>>(), vec![&TemplateRef::Index(1)]);
        assert_eq!(t.render(lookup, str::to_string).unwrap(), "costs $5 or counter");

        let fixed = Template::parse("costs $$5").unwrap();
        assert!(fixed.is_static());
        assert_eq!(fixed.literal_text().as_deref(), Some("costs $5"));
        assert_eq!(fixed.as_str(), "costs $$5");
    }

    #[test]
    fn unresolved_reference_fails_strict_render() {
        let t = Template::parse("{{baseName}}.ts").unwrap();
        assert_eq!(
            t.render(lookup, str::to_string),
            Err(Unresolved("{{baseName}}".to_string()))
        );
        assert_eq!(t.render_lossy(lookup), "{{baseName}}.ts");
    }

    #[test]
    fn malformed_templates_are_rejected() {
        assert!(matches!(
            Template::parse("{{1"),
            Err(TemplateError::Unterminated { .. })
        ));
        assert!(matches!(
            Template::parse("{{name as Weird}}"),
            Err(TemplateError::InvalidReference { .. })
        ));
        assert!(matches!(
            Template::parse("{{ }}"),
            Err(TemplateError::InvalidReference { .. })
        ));
        assert!(matches!(
            Template::parse("$0.ts"),
            Err(TemplateError::ZeroIndex { .. })
        ));
    }
}
