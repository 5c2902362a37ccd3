use serde::de::DeserializeOwned;

use crate::error::RncError;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, RncError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        RncError::Document { path, message: err.into_inner().to_string() }
    })
}

/// Same as [`from_str_with_path`] for an already parsed value.
pub fn from_value_with_path<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, RncError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        RncError::Document { path, message: err.into_inner().to_string() }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    struct Outer {
        #[allow(unused)]
        inner: Inner,
    }

    #[derive(Deserialize, Debug)]
    struct Inner {
        #[allow(unused)]
        count: u32,
    }

    #[test]
    fn error_carries_json_path() {
        let err = from_str_with_path::<Outer>(r#"{"inner": {"count": "x"}}"#).unwrap_err();
        match err {
            RncError::Document { path, .. } => assert_eq!(path, "inner.count"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn value_errors_carry_json_path_too() {
        let err = from_value_with_path::<Outer>(serde_json::json!({"inner": {}})).unwrap_err();
        assert!(matches!(err, RncError::Document { .. }));
    }
}
