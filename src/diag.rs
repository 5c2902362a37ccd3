//! Validation diagnostics: where a value failed, what went wrong, and the value itself.
use std::fmt;

use serde_json::Value;

use crate::ir::PrimitiveKind;

/// Display width used for offending values in diagnostics.
pub const DETAIL_WIDTH: usize = 50;

// ------------------------------- Paths ------------------------------------ //

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Selector {
    Field(String),
    Index(usize),
    /// A reference followed while descending, e.g. `(#/definitions/person)`.
    Deref(String),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Field(name) => f.write_str(name),
            Selector::Index(i) => write!(f, "[{i}]"),
            Selector::Deref(target) => write!(f, "({target})"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path(pub Vec<Selector>);

impl Path {
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, sel) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{sel}")?;
        }
        Ok(())
    }
}

// ------------------------------- Issues ----------------------------------- //

#[derive(Clone, Debug, PartialEq)]
pub enum Issue {
    Expected(&'static str),
    MissingField(String),
    UnexpectedField(String),
    IllegalValue,
    IllegalLength,
    PatternMismatch,
    IllegalItemCount,
    IllegalPropertyCount,
    /// One entry per rejected alternative, each with that alternative's diagnostics.
    NoAlternative(Vec<Vec<Diagnostic>>),
    /// A reference whose pointer segment could not be found.
    Unresolved { segment: String, target: String },
    /// A defect of the schema itself, found while validating.
    Schema(String),
}

impl Issue {
    pub fn expected(kind: PrimitiveKind) -> Self {
        Issue::Expected(kind.as_str())
    }

    pub fn is_schema_error(&self) -> bool {
        matches!(self, Issue::Schema(_))
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::Expected(what) => write!(f, "{what} expected"),
            Issue::MissingField(name) => write!(f, "missing required field: {name}"),
            Issue::UnexpectedField(name) => write!(f, "unexpected field in object: {name}"),
            Issue::IllegalValue => f.write_str("illegal value"),
            Issue::IllegalLength => f.write_str("illegal length"),
            Issue::PatternMismatch => f.write_str("no match"),
            Issue::IllegalItemCount => f.write_str("illegal number of items"),
            Issue::IllegalPropertyCount => f.write_str("illegal number of properties"),
            Issue::NoAlternative(_) => f.write_str("does not match any alternative"),
            Issue::Unresolved { segment, target } => write!(f, "could not find: {segment} in {target}"),
            Issue::Schema(reason) => write!(f, "error in schema: {reason}"),
        }
    }
}

// ----------------------------- Diagnostic --------------------------------- //

#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub path: Path,
    pub issue: Issue,
    /// Offending value or comparison, already rendered for display.
    pub detail: String,
}

impl Diagnostic {
    pub fn new(path: &[Selector], issue: Issue, detail: impl Into<String>) -> Self {
        Self { path: Path(path.to_vec()), issue, detail: detail.into() }
    }

    /// Key used by the error histogram: path and message without the detail.
    pub fn kind_key(&self) -> String {
        format!("{}:{}", self.path, self.issue)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issue.is_schema_error() {
            f.write_str("! Error in schema !\t")?;
        }
        write!(f, "{}\t{}\t{}", self.path, self.issue, self.detail)?;
        if let Issue::NoAlternative(branches) = &self.issue {
            for branch in branches {
                for d in branch {
                    write!(f, "\n -{d}")?;
                }
            }
        }
        Ok(())
    }
}

// ------------------------------ Rendering --------------------------------- //

/// Compact text of `value`, shortened with a middle ellipsis beyond `width` characters.
pub fn show_val(value: &Value, width: usize) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    truncate_middle(&text, width)
}

pub fn truncate_middle(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count < width || width < 14 {
        return text.to_string();
    }
    let head: String = text.chars().take(width - 13).collect();
    let tail: String = text.chars().skip(count - 10).collect();
    format!("{head}...{tail}")
}

/// Numbers print without a trailing `.0` when they are whole.
pub fn show_num(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_display() {
        let path = Path(vec![
            Selector::Deref("#/definitions/a".into()),
            Selector::Field("items".into()),
            Selector::Index(3),
        ]);
        assert_eq!(path.to_string(), "(#/definitions/a)/items/[3]");
        assert_eq!(Path::default().to_string(), "");
    }

    #[test]
    fn diagnostic_line_shape() {
        let d = Diagnostic::new(&[Selector::Field("age".into())], Issue::expected(PrimitiveKind::Integer), "x");
        assert_eq!(d.to_string(), "age\tinteger expected\tx");
        assert_eq!(d.kind_key(), "age:integer expected");
        let s = Diagnostic::new(&[], Issue::Schema("unknown type: foo".into()), "");
        assert_eq!(s.to_string(), "! Error in schema !\t\terror in schema: unknown type: foo\t");
    }

    #[test]
    fn union_diagnostic_lists_every_branch() {
        let a = Diagnostic::new(&[], Issue::expected(PrimitiveKind::Integer), "true");
        let b = Diagnostic::new(&[], Issue::expected(PrimitiveKind::Null), "true");
        let d = Diagnostic::new(&[], Issue::NoAlternative(vec![vec![a], vec![b]]), "true");
        assert_eq!(
            d.to_string(),
            "\tdoes not match any alternative\ttrue\n -\tinteger expected\ttrue\n -\tnull expected\ttrue"
        );
    }

    #[test]
    fn long_values_get_middle_ellipsis() {
        let long = "a".repeat(40) + &"z".repeat(40);
        let shown = show_val(&json!(long), DETAIL_WIDTH);
        assert_eq!(shown.chars().count(), 37 + 3 + 10);
        assert!(shown.starts_with(&"a".repeat(37)));
        assert!(shown.ends_with(&"z".repeat(10)));
        assert_eq!(show_val(&json!({"a": 1}), DETAIL_WIDTH), r#"{"a":1}"#);
        assert_eq!(show_val(&json!(null), DETAIL_WIDTH), "null");
    }

    #[test]
    fn truncation_is_utf8_safe() {
        let text = "é".repeat(120);
        let shown = truncate_middle(&text, DETAIL_WIDTH);
        assert_eq!(shown.chars().count(), 50);
    }

    #[test]
    fn whole_numbers_print_as_integers() {
        assert_eq!(show_num(10.0), "10");
        assert_eq!(show_num(-1.0), "-1");
        assert_eq!(show_num(2.5), "2.5");
    }
}
