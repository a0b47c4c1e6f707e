//! Content constraints evaluated against file text.

use crate::config::model::{ContentConstraint, Quantifier, TemplatedPattern};
use crate::context::MatchContext;
use crate::pattern::ContentPattern;
use crate::tree::FileNode;

/// Loads the text of `file`.
///
/// Files whose content is not analyzed read as empty.
///
/// # Errors
///
/// Returns a reason if the file cannot be read or is not valid UTF-8.
pub fn load(file: &FileNode, analyzed: bool) -> Result<String, String> {
    if !analyzed {
        return Ok(String::new());
    }
    let bytes = file
        .read()
        .map_err(|e| format!("content could not be read: {e}"))?;
    String::from_utf8(bytes).map_err(|_| "content is not valid UTF-8 text".to_string())
}

/// Checks one constraint, returning the reason it failed.
///
/// # Errors
///
/// Returns a reason if the bounds are not respected or a pattern cannot be
/// resolved in `ctx`.
pub fn check(
    constraint: &ContentConstraint,
    content: &str,
    ctx: &MatchContext<'_>,
) -> Result<(), String> {
    let mut counts = Vec::with_capacity(constraint.patterns.len());
    for pattern in &constraint.patterns {
        let (compiled, display) = resolve(pattern, ctx)?;
        counts.push((display, compiled.count_matches(content)));
    }

    let mut failures = counts
        .iter()
        .filter_map(|(display, count)| bounds_failure(constraint, display, *count));

    match constraint.quantifier {
        Quantifier::Every => failures.next().map_or(Ok(()), Err),
        Quantifier::Some if counts.len() == 1 => failures.next().map_or(Ok(()), Err),
        Quantifier::Some => {
            // Bounds apply to the matches of all patterns together.
            let total: usize = counts.iter().map(|(_, count)| count).sum();
            if constraint.within_bounds(total) {
                return Ok(());
            }
            let listed = counts
                .iter()
                .map(|(display, count)| format!("`{display}` ({count})"))
                .collect::<Vec<_>>()
                .join(", ");
            if total == 0 {
                return Err(format!("content does not match any of {listed}"));
            }
            Err(format!(
                "content should match {listed} {} in total, found {total}",
                bounds_text(constraint)
            ))
        }
    }
}

/// Checks that none of `patterns` occurs in `content`, returning one reason
/// per pattern found.
#[must_use]
pub fn check_absent(
    patterns: &[TemplatedPattern<ContentPattern>],
    content: &str,
    ctx: &MatchContext<'_>,
) -> Vec<String> {
    patterns
        .iter()
        .filter_map(|pattern| match resolve(pattern, ctx) {
            Err(reason) => Some(reason),
            Ok((compiled, display)) => {
                let count = compiled.count_matches(content);
                (count > 0).then(|| format!("content should not match `{display}`, found {count}"))
            }
        })
        .collect()
}

fn resolve(
    pattern: &TemplatedPattern<ContentPattern>,
    ctx: &MatchContext<'_>,
) -> Result<(ContentPattern, String), String> {
    pattern
        .resolve(ctx)
        .map(|(compiled, display)| (compiled.into_owned(), display))
        .map_err(|e| format!("content pattern `{}` cannot be resolved: {e}", pattern.template()))
}

fn bounds_failure(constraint: &ContentConstraint, display: &str, count: usize) -> Option<String> {
    if count == 0 && constraint.at_least > 0 {
        return Some(format!("content does not match `{display}`"));
    }
    if count < constraint.at_least {
        return Some(format!(
            "content should match `{display}` at least {} time(s), found {count}",
            constraint.at_least
        ));
    }
    match constraint.at_most {
        Some(max) if count > max => Some(format!(
            "content should match `{display}` at most {max} time(s), found {count}"
        )),
        _ => None,
    }
}

fn bounds_text(constraint: &ContentConstraint) -> String {
    match constraint.at_most {
        Some(max) => format!("between {} and {max} time(s)", constraint.at_least),
        None => format!("at least {} time(s)", constraint.at_least),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Inherited;
    use crate::tree::Source;

    fn constraint(quantifier: Quantifier, patterns: &[&str], at_most: Option<usize>) -> ContentConstraint {
        ContentConstraint {
            quantifier,
            patterns: patterns
                .iter()
                .map(|p| TemplatedPattern::new(p).unwrap())
                .collect(),
            at_least: 1,
            at_most,
        }
    }

    fn file(bytes: &[u8]) -> FileNode {
        FileNode {
            name: "a.ts".to_string(),
            path: "./a.ts".to_string(),
            source: Source::Inline(bytes.to_vec()),
        }
    }

    #[test]
    fn at_most_exceeded() {
        let inherited = Inherited::new();
        let ctx = MatchContext::for_file("a.ts", ".", &inherited);
        let c = constraint(Quantifier::Some, &["patternX"], Some(1));

        assert!(check(&c, "patternX", &ctx).is_ok());
        assert_eq!(
            check(&c, "patternX\npatternX", &ctx).unwrap_err(),
            "content should match `patternX` at most 1 time(s), found 2"
        );
    }

    #[test]
    fn some_needs_one_pattern_in_bounds() {
        let inherited = Inherited::new();
        let ctx = MatchContext::for_file("a.ts", ".", &inherited);
        let c = constraint(Quantifier::Some, &["foo", "regex:ba[rz]"], None);

        assert!(check(&c, "baz", &ctx).is_ok());
        assert_eq!(
            check(&c, "qux", &ctx).unwrap_err(),
            "content does not match any of `foo` (0), `regex:ba[rz]` (0)"
        );
    }

    #[test]
    fn some_bounds_count_all_patterns_together() {
        let inherited = Inherited::new();
        let ctx = MatchContext::for_file("a.ts", ".", &inherited);
        let c = constraint(
            Quantifier::Some,
            &["= createDocumentStore", "= createCollectionStore"],
            Some(1),
        );

        assert!(check(&c, "const a = createCollectionStore()", &ctx).is_ok());
        assert_eq!(
            check(
                &c,
                "const a = createDocumentStore()\nconst b = createCollectionStore()",
                &ctx
            )
            .unwrap_err(),
            "content should match `= createDocumentStore` (1), `= createCollectionStore` (1) \
             between 1 and 1 time(s) in total, found 2"
        );
    }

    #[test]
    fn every_needs_all_patterns() {
        let inherited = Inherited::new();
        let ctx = MatchContext::for_file("a.ts", ".", &inherited);
        let c = constraint(Quantifier::Every, &["import", "line_regex:^export "], None);

        assert!(check(&c, "import x\nexport const a = 1", &ctx).is_ok());
        assert_eq!(
            check(&c, "import x", &ctx).unwrap_err(),
            "content does not match `line_regex:^export `"
        );
    }

    #[test]
    fn templated_content_uses_file_name() {
        let inherited = Inherited::new();
        let ctx = MatchContext::for_file("userDoc.ts", "stores", &inherited);
        let c = constraint(Quantifier::Some, &["export const {{fileName}} ="], None);

        assert!(check(&c, "export const userDoc = 1", &ctx).is_ok());
        assert_eq!(
            check(&c, "export const other = 1", &ctx).unwrap_err(),
            "content does not match `export const userDoc =`"
        );
    }

    #[test]
    fn absent_patterns_report_each_hit() {
        let inherited = Inherited::new();
        let ctx = MatchContext::for_file("a.ts", ".", &inherited);
        let patterns = vec![
            TemplatedPattern::new("console.log").unwrap(),
            TemplatedPattern::new("debugger").unwrap(),
        ];
        let reasons = check_absent(&patterns, "console.log(1); console.log(2)", &ctx);
        assert_eq!(reasons, vec!["content should not match `console.log`, found 2".to_string()]);
    }

    #[test]
    fn load_skips_unanalyzed_and_rejects_binary() {
        assert_eq!(load(&file(b"text"), false).unwrap(), "");
        assert_eq!(load(&file(b"text"), true).unwrap(), "text");
        assert!(load(&file(&[0xff, 0xfe, 0x00]), true).is_err());
    }
}
