//! Compact, aligned JSON printer used when persisting compiled schemas.
//!
//! The first member of an object or array stays on the line of its opening
//! bracket; later members start on a new line aligned under the first one, and
//! a member value is aligned just after its `"key":` prefix. The top-level value
//! is followed by a newline.
use serde_json::Value;

pub fn pretty(value: &Value, sort_keys: bool) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0, sort_keys);
    out.push('\n');
    out
}

/// `column` is where the value's first character lands.
fn write_value(out: &mut String, value: &Value, column: usize, sort_keys: bool) {
    match value {
        Value::Object(map) => {
            out.push('{');
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            if sort_keys {
                entries.sort_by(|a, b| a.0.cmp(b.0));
            }
            for (i, (key, member)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                    push_spaces(out, column + 1);
                }
                let key = quoted(key);
                out.push_str(&key);
                out.push(':');
                write_value(out, member, column + 1 + key.chars().count() + 1, sort_keys);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                    push_spaces(out, column + 1);
                }
                write_value(out, item, column + 1, sort_keys);
            }
            out.push(']');
        }
        Value::String(s) => out.push_str(&quoted(s)),
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn quoted(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn push_spaces(out: &mut String, n: usize) {
    out.extend(std::iter::repeat_n(' ', n));
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_end_with_newline() {
        assert_eq!(pretty(&json!(3), true), "3\n");
        assert_eq!(pretty(&json!("a\"b"), true), "\"a\\\"b\"\n");
        assert_eq!(pretty(&json!({}), true), "{}\n");
        assert_eq!(pretty(&json!([]), true), "[]\n");
    }

    #[test]
    fn members_align_under_the_first_one() {
        let value = json!({"type": "object", "required": ["a", "b"], "properties": {"a": {"type": "null"}}});
        let expected = concat!(
            "{\"properties\":{\"a\":{\"type\":\"null\"}},\n",
            " \"required\":[\"a\",\n",
            "             \"b\"],\n",
            " \"type\":\"object\"}\n",
        );
        assert_eq!(pretty(&value, true), expected);
    }

    #[test]
    fn nested_objects_align_after_their_key() {
        let value = json!({"ab": {"x": 1, "y": 2}});
        assert_eq!(pretty(&value, true), "{\"ab\":{\"x\":1,\n       \"y\":2}}\n");
    }

    #[test]
    fn insertion_order_is_kept_without_sorting() {
        let value = json!({"b": 1, "a": 2});
        assert_eq!(pretty(&value, false), "{\"b\":1,\n \"a\":2}\n");
        assert_eq!(pretty(&value, true), "{\"a\":2,\n \"b\":1}\n");
    }

    #[test]
    fn output_parses_back_to_the_same_value() {
        let value = json!({"k": [1.5, null, true, {"z": "é\n", "a": [[]]}], "e": {}});
        let text = pretty(&value, true);
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), value);
    }
}
