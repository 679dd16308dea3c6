//! Error types for mapping and schema loading.

use thiserror::Error;

/// Failure of a `create` call.
///
/// Only `MissingRequiredField` comes out of the mapping pass itself; the other
/// variants belong to the entry points that parse text or look types up by name.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("record has no usable value at key `{key}` for mandatory field `{field}` of `{type_name}`")]
    MissingRequiredField {
        type_name: String,
        key: String,
        field: String,
    },

    #[error("unknown target type `{0}`")]
    UnknownType(String),

    #[error("expected a record for `{type_name}`, found {found}")]
    NotARecord {
        type_name: String,
        found: &'static str,
    },

    #[error("invalid JSON at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl MapError {
    /// Source key and field name of a missing required field.
    pub fn missing_field(&self) -> Option<(&str, &str)> {
        match self {
            Self::MissingRequiredField { key, field, .. } => Some((key.as_str(), field.as_str())),
            _ => None,
        }
    }
}

/// Failure while loading schema-defined target types.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid schema at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("type `{0}` is declared more than once")]
    DuplicateType(String),

    #[error("type `{type_name}` declares field `{field}` more than once")]
    DuplicateField { type_name: String, field: String },
}
