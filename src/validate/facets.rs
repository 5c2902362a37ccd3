//! Facet checks, applied according to the kind of the value at hand.
use regex::Regex;
use serde_json::{Number, Value};

use super::Validator;
use crate::diag::{show_num, show_val, Diagnostic, Issue, Selector, DETAIL_WIDTH};
use crate::ir::Facets;

/// Patterns match the whole string.
pub fn anchored(pattern: &str) -> String {
    format!("^(?:{pattern})$")
}

impl<'s> Validator<'s> {
    pub(super) fn check_facets(
        &mut self,
        path: &[Selector],
        facets: &'s Facets,
        value: &Value,
        out: &mut Vec<Diagnostic>,
    ) {
        if facets.is_empty() {
            return;
        }
        match value {
            Value::Number(n) => check_bounds(path, facets, n, out),
            Value::String(s) => {
                if let Some(pattern) = &facets.pattern {
                    self.check_pattern(path, pattern, s, out);
                }
                let length = s.chars().count() as u64;
                check_count(path, Issue::IllegalLength, length, facets.min_length, facets.max_length, out);
            }
            Value::Array(items) => {
                let count = items.len() as u64;
                check_count(path, Issue::IllegalItemCount, count, facets.min_items, facets.max_items, out);
            }
            Value::Object(map) => {
                let count = map.len() as u64;
                check_count(path, Issue::IllegalPropertyCount, count, facets.min_properties, facets.max_properties, out);
            }
            Value::Bool(_) | Value::Null => {}
        }
    }

    fn check_pattern(&mut self, path: &[Selector], pattern: &'s str, s: &str, out: &mut Vec<Diagnostic>) {
        let regex = self
            .patterns
            .entry(pattern)
            .or_insert_with(|| Regex::new(&anchored(pattern)).map_err(|err| err.to_string()));
        match regex {
            Ok(regex) if regex.is_match(s) => {}
            Ok(_) => {
                let shown = show_val(&Value::String(s.to_string()), DETAIL_WIDTH);
                out.push(Diagnostic::new(path, Issue::PatternMismatch, format!("{pattern}<>{shown}")));
            }
            Err(_) => {
                out.push(Diagnostic::new(path, Issue::Schema(format!("invalid pattern: {pattern}")), ""));
            }
        }
    }
}

fn check_bounds(path: &[Selector], facets: &Facets, n: &Number, out: &mut Vec<Diagnostic>) {
    let Some(v) = n.as_f64() else { return };
    let mut fail = |op: &str, bound: f64| {
        out.push(Diagnostic::new(path, Issue::IllegalValue, format!("{n} {op} {}", show_num(bound))));
    };
    if let Some(min) = facets.minimum {
        if v < min.0 {
            fail("<", min.0);
        }
    }
    if let Some(max) = facets.maximum {
        if v > max.0 {
            fail(">", max.0);
        }
    }
    if let Some(min) = facets.exclusive_minimum {
        if v <= min.0 {
            fail("<=", min.0);
        }
    }
    if let Some(max) = facets.exclusive_maximum {
        if v >= max.0 {
            fail(">=", max.0);
        }
    }
}

fn check_count(
    path: &[Selector],
    issue: Issue,
    count: u64,
    min: Option<u64>,
    max: Option<u64>,
    out: &mut Vec<Diagnostic>,
) {
    if let Some(min) = min.filter(|min| count < *min) {
        out.push(Diagnostic::new(path, issue.clone(), format!("{count} < {min}")));
    }
    if let Some(max) = max.filter(|max| count > *max) {
        out.push(Diagnostic::new(path, issue, format!("{count} > {max}")));
    }
}

#[cfg(test)]
mod tests {
    use crate::compile::compile;
    use crate::diag::Issue;
    use crate::validate::validate;
    use serde_json::json;

    fn details(src: &str, value: serde_json::Value) -> Vec<String> {
        let doc = compile(src).unwrap();
        validate(&doc.start, &doc, &value).into_iter().map(|d| d.detail).collect()
    }

    #[test]
    fn inclusive_bounds() {
        let src = "start = integer @(minimum=0,maximum=10)";
        assert_eq!(details(src, json!(11)), vec!["11 > 10"]);
        assert!(details(src, json!(0)).is_empty());
        assert!(details(src, json!(10)).is_empty());
        assert_eq!(details(src, json!(-1)), vec!["-1 < 0"]);
    }

    #[test]
    fn exclusive_bounds_are_standalone_and_strict() {
        let src = "start = number @(exclusiveMinimum=0, exclusiveMaximum=1.5)";
        assert_eq!(details(src, json!(0)), vec!["0 <= 0"]);
        assert!(details(src, json!(0.001)).is_empty());
        assert_eq!(details(src, json!(1.5)), vec!["1.5 >= 1.5"]);
    }

    #[test]
    fn inclusive_and_exclusive_together() {
        let src = "start = number @(minimum=5, exclusiveMinimum=5)";
        assert_eq!(details(src, json!(5)), vec!["5 <= 5"]);
        assert_eq!(details(src, json!(4)), vec!["4 < 5", "4 <= 5"]);
    }

    #[test]
    fn pattern_is_anchored() {
        let src = "start = /[a-z]+/";
        assert!(details(src, json!("abc")).is_empty());
        assert_eq!(details(src, json!("abc1")), vec!["[a-z]+<>abc1"]);
        assert_eq!(details(src, json!("1abc")), vec!["[a-z]+<>1abc"]);
    }

    #[test]
    fn length_counts_characters() {
        let src = "start = string @(minLength=2, maxLength=3)";
        assert!(details(src, json!("été")).is_empty());
        assert_eq!(details(src, json!("é")), vec!["1 < 2"]);
        assert_eq!(details(src, json!("abcd")), vec!["4 > 3"]);
    }

    #[test]
    fn cardinality_facets() {
        let doc = compile("start = {a: [] @(minItems=1, maxItems=2)} @(maxProperties=1)").unwrap();
        let diags = validate(&doc.start, &doc, &json!({"a": [1, 2, 3]}));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].issue, Issue::IllegalItemCount);
        assert_eq!(diags[0].path.to_string(), "a");
        assert_eq!(diags[0].detail, "3 > 2");

        let diags = validate(&doc.start, &doc, &json!({"a": [], "b": 1}));
        let issues: Vec<_> = diags.iter().map(|d| d.issue.to_string()).collect();
        assert_eq!(
            issues,
            vec!["illegal number of items", "unexpected field in object: b", "illegal number of properties"]
        );
    }
}
