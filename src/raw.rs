use serde_json::{Map, Value};

use crate::error::MapError;

/// Untyped input record: string keys to arbitrary JSON values, in source order.
pub type RawRecord = Map<String, Value>;

/// Parse JSON text with JSON-path context in error messages.
pub fn parse_value(src: &str) -> Result<Value, MapError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, Value>(de).map_err(|err| MapError::Json {
        path: err.path().to_string(),
        source: err.into_inner(),
    })
}

/// Parse JSON text that must hold a single top-level object.
pub fn parse_record(src: &str) -> Result<RawRecord, MapError> {
    match parse_value(src)? {
        Value::Object(map) => Ok(map),
        other => Err(MapError::NotARecord {
            type_name: "record".to_string(),
            found: kind_name(&other),
        }),
    }
}

pub(crate) fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_object_in_source_order() {
        let rec = parse_record(r#"{"b": 1, "a": 2}"#).unwrap();
        let keys: Vec<&str> = rec.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn rejects_non_object_top_level() {
        let err = parse_record("[1, 2]").unwrap_err();
        assert!(matches!(err, MapError::NotARecord { found: "array", .. }));
    }

    #[test]
    fn reports_syntax_error_as_json_error() {
        let err = parse_record(r#"{"a": {"b": [1, }}"#).unwrap_err();
        assert!(matches!(err, MapError::Json { .. }), "unexpected error: {err}");
    }
}
