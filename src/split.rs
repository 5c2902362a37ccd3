//! Record framing: cuts a text stream into one top-level JSON value per item.
//!
//! Nesting of `{}`/`[]` is tracked outside quoted strings (single or double
//! quotes, backslash escapes). Whitespace outside strings is dropped and raw
//! newlines inside strings are written back as `\n`, so every record fits on
//! one line.
use tracing::trace;

pub struct Splitter<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Splitter<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { chars: input.chars().peekable() }
    }

    fn string(&mut self, quote: char, out: &mut String) {
        out.push(quote);
        while let Some(c) = self.chars.next() {
            match c {
                '\\' => {
                    out.push(c);
                    if let Some(escaped) = self.chars.next() {
                        out.push(escaped);
                    }
                }
                '\n' => out.push_str("\\n"),
                c if c == quote => {
                    out.push(c);
                    return;
                }
                c => out.push(c),
            }
        }
    }
}

impl Iterator for Splitter<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut depth = 0usize;
        let mut out = String::new();
        while let Some(c) = self.chars.next() {
            match c {
                c if c.is_ascii_whitespace() => continue,
                '"' | '\'' => self.string(c, &mut out),
                '{' | '[' => {
                    depth += 1;
                    out.push(c);
                }
                '}' | ']' => {
                    depth = depth.saturating_sub(1);
                    out.push(c);
                }
                c => {
                    out.push(c);
                    // a bare scalar at top level runs up to the next separator
                    if depth == 0 {
                        while let Some(&next) = self.chars.peek() {
                            if next.is_ascii_whitespace() || matches!(next, '{' | '}' | '[' | ']' | '"' | '\'') {
                                break;
                            }
                            out.push(next);
                            self.chars.next();
                        }
                    }
                }
            }
            if depth == 0 {
                trace!(record = %out, "split");
                return Some(out);
            }
        }
        // truncated input still yields its tail so that it is reported as a bad record
        (!out.is_empty()).then_some(out)
    }
}

pub fn split_records(input: &str) -> Splitter<'_> {
    Splitter::new(input)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    fn split(input: &str) -> Vec<String> {
        split_records(input).collect()
    }

    #[test]
    fn one_record_per_top_level_value() {
        let input = "{\"a\": 1,\n \"b\": [1, 2]}\n\n[3]{\"c\":{}}";
        assert_eq!(split(input), vec![r#"{"a":1,"b":[1,2]}"#, "[3]", r#"{"c":{}}"#]);
    }

    #[test]
    fn brackets_inside_strings_do_not_count() {
        let input = r#"{"a": "}]{", 'b': 'it\'s [x'} {"d": "\"}"}"#;
        assert_eq!(split(input), vec![r#"{"a":"}]{",'b':'it\'s [x'}"#, r#"{"d":"\"}"}"#]);
    }

    #[test]
    fn whitespace_inside_strings_is_kept_and_newlines_escaped() {
        let input = "{\"t\": \"two  words\nnext\"}";
        assert_eq!(split(input), vec!["{\"t\":\"two  words\\nnext\"}"]);
        let parsed: serde_json::Value = serde_json::from_str(&split(input)[0]).unwrap();
        assert_eq!(parsed["t"], "two  words\nnext");
    }

    #[test]
    fn top_level_scalars_are_records_too() {
        assert_eq!(split("12 true\n\"s\""), vec!["12", "true", "\"s\""]);
    }

    #[test]
    fn truncated_tail_is_yielded() {
        assert_eq!(split("{\"a\":1} {\"b\":"), vec!["{\"a\":1}", "{\"b\":"]);
        assert!(split("  \n ").is_empty());
    }
}
