//! Parsing of individual records and extraction of their identifiers.
use std::fmt;

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Value};

/// Parses one record. With `strict_keys`, an object repeating a key is an error
/// instead of silently keeping the last value.
pub fn parse_record(text: &str, strict_keys: bool) -> Result<Value, serde_json::Error> {
    if !strict_keys {
        return serde_json::from_str(text);
    }
    let mut de = serde_json::Deserializer::from_str(text);
    let value = StrictValue.deserialize(&mut de)?;
    de.end()?;
    Ok(value)
}

/// Follows a `/`-separated list of field names; numeric segments also index arrays.
pub fn select<'v>(value: &'v Value, selector: &str) -> Option<&'v Value> {
    selector.split('/').filter(|s| !s.is_empty()).try_fold(value, |v, segment| match v {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Identifier text of a record: strings as they are, anything else as JSON text.
pub fn select_id(value: &Value, selector: &str) -> Option<String> {
    select(value, selector).map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

// --------------------------- strict parsing ------------------------------- //

struct StrictValue;

impl<'de> DeserializeSeed<'de> for StrictValue {
    type Value = Value;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for StrictValue {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element_seed(StrictValue)? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = Map::new();
        while let Some(key) = access.next_key::<String>()? {
            if map.contains_key(&key) {
                return Err(de::Error::custom(format_args!("duplicate key: {key}")));
            }
            let value = access.next_value_seed(StrictValue)?;
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lenient_parsing_keeps_last_duplicate() {
        assert_eq!(parse_record(r#"{"a": 1, "a": 2}"#, false).unwrap(), json!({"a": 2}));
    }

    #[test]
    fn strict_parsing_rejects_nested_duplicates() {
        let err = parse_record(r#"{"x": [{"a": 1, "a": 2}]}"#, true).unwrap_err();
        assert!(err.to_string().contains("duplicate key: a"));
        let ok = parse_record(r#"{"x": [{"a": 1}, {"a": -2.5, "b": null}], "t": true}"#, true).unwrap();
        assert_eq!(ok, json!({"x": [{"a": 1}, {"a": -2.5, "b": null}], "t": true}));
    }

    #[test]
    fn strict_parsing_still_rejects_trailing_garbage() {
        assert!(parse_record("{} x", true).is_err());
        assert!(parse_record("{\"a\":", true).is_err());
    }

    #[test]
    fn id_selection() {
        let record = json!({"_id": {"$oid": "5f1"}, "n": 7, "list": [{"k": "v"}]});
        assert_eq!(select_id(&record, "_id/$oid").as_deref(), Some("5f1"));
        assert_eq!(select_id(&record, "n").as_deref(), Some("7"));
        assert_eq!(select_id(&record, "_id").as_deref(), Some(r#"{"$oid":"5f1"}"#));
        assert_eq!(select_id(&record, "list/0/k").as_deref(), Some("v"));
        assert_eq!(select_id(&record, "missing/x"), None);
    }
}
