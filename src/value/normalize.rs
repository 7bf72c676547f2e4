//! Conversion of raw JSON text into the normalized `Value` model.

use thiserror::Error;

use super::{Scalar, Value};

/// Result type for normalization operations
pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Normalization-specific error type
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Malformed JSON payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Normalize a JSON document into a `Value` tree.
///
/// The root kind is structural: an array becomes a `Sequence`, an object a
/// `Mapping`, and anything else a bare `Scalar`. Members and elements are
/// normalized recursively; scalar leaves keep their JSON type. Duplicate
/// object keys resolve to the last occurrence.
pub fn normalize(json_text: &str) -> NormalizeResult<Value> {
    let parsed: serde_json::Value = serde_json::from_str(json_text)?;
    Ok(from_json(parsed))
}

fn from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Scalar(Scalar::Null),
        serde_json::Value::Bool(b) => Value::Scalar(Scalar::Bool(b)),
        serde_json::Value::Number(n) => Value::Scalar(Scalar::Number(n)),
        serde_json::Value::String(s) => Value::Scalar(Scalar::Text(s)),
        serde_json::Value::Array(items) => {
            Value::Sequence(items.into_iter().map(from_json).collect())
        }
        serde_json::Value::Object(members) => Value::Mapping(
            members
                .into_iter()
                .map(|(key, member)| (key, from_json(member)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_object() {
        let value = normalize(r#"{"title":"Test Title"}"#).unwrap();
        assert_eq!(value.get("title").and_then(Value::as_str), Some("Test Title"));
    }

    #[test]
    fn test_normalize_nested() {
        let value = normalize(
            r#"{"person":{"first_name":"Mile","other":{"somekey":"somevalue"}}}"#,
        )
        .unwrap();

        let person = value.get("person").unwrap();
        assert_eq!(person.get("first_name").and_then(Value::as_str), Some("Mile"));
        assert_eq!(
            person
                .get("other")
                .and_then(|o| o.get("somekey"))
                .and_then(Value::as_str),
            Some("somevalue")
        );
    }

    #[test]
    fn test_normalize_root_array() {
        let value = normalize(r#"[1, "two", true, null]"#).unwrap();
        match &value {
            Value::Sequence(items) => {
                assert_eq!(items.len(), 4);
                assert_eq!(items[1].as_str(), Some("two"));
                assert_eq!(items[2].as_bool(), Some(true));
                assert!(items[3].is_null());
            }
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_bare_scalar() {
        assert_eq!(normalize("42").unwrap(), Value::from(42i64));
        assert_eq!(normalize(r#""text""#).unwrap(), Value::from("text"));
    }

    #[test]
    fn test_normalize_malformed() {
        assert!(matches!(
            normalize("{not json"),
            Err(NormalizeError::Malformed(_))
        ));
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let value = normalize(r#"{"k":"first","k":"second"}"#).unwrap();
        assert_eq!(value.get("k").and_then(Value::as_str), Some("second"));
    }

    #[test]
    fn test_round_trip_preserves_shape() {
        let source = r#"{"a":[1,2,{"b":null}],"c":{"d":true,"e":"text"}}"#;
        let original: serde_json::Value = serde_json::from_str(source).unwrap();
        let normalized = normalize(source).unwrap();
        assert_eq!(normalized.to_json(), original);
    }
}
