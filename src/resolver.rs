//! Per-field value conversion.
//!
//! A resolver holds the field's declared type and the ordered candidate list
//! from its `@var` annotation. `resolve` walks the candidates in order and keeps
//! the first one that converts; rejected candidates are dropped and logged,
//! never reported. When every candidate is rejected the declared scalar type
//! (if any) gets a plain cast, and failing that the raw value is handed on as is.
//! Nullability never skips the candidates: `int|null` casts a null to 0.
pub mod candidate;
pub mod cast;

use std::fmt;

use serde_json::Value;

pub use candidate::{Candidate, DeclaredType, NativeType, Scalar};

use crate::error::MapError;
use crate::registry::{TypeEntry, TypeRegistry};
use crate::value::Resolved;

#[derive(Debug, Clone, PartialEq)]
pub struct TypeResolver {
    declared: Option<DeclaredType>,
    candidates: Vec<Candidate>,
    nullable: bool,
}

/// Why a candidate was passed over.
#[derive(Debug)]
pub enum Rejection {
    Cast(cast::CastError),
    NotNull,
    NotASequence,
    NotARecord,
    UnknownType,
    Nested(MapError),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cast(e) => write!(f, "{e}"),
            Self::NotNull => f.write_str("value is not null"),
            Self::NotASequence => f.write_str("value is not a sequence"),
            Self::NotARecord => f.write_str("value is not a record"),
            Self::UnknownType => f.write_str("no registered type by that name"),
            Self::Nested(e) => write!(f, "nested create failed: {e}"),
        }
    }
}

type Attempt = Result<Resolved, Rejection>;

impl TypeResolver {
    /// Build from a declared type and the field's annotation text.
    ///
    /// Without a `@var` tag, a declared non-scalar type name becomes the only
    /// candidate so typed fields of a registered type still map recursively.
    pub fn new(declared: Option<DeclaredType>, doc: Option<&str>) -> Self {
        let (mut candidates, tagged_nullable) =
            doc.map(candidate::parse_var_tag).unwrap_or_default();
        if candidates.is_empty() {
            if let Some(NativeType::Named(name)) = declared.as_ref().map(|d| &d.kind) {
                candidates.push(Candidate::Named(name.clone()));
            }
        }
        let nullable = declared.as_ref().is_some_and(|d| d.nullable) || tagged_nullable;
        Self { declared, candidates, nullable }
    }

    pub fn declared(&self) -> Option<&DeclaredType> { self.declared.as_ref() }

    pub fn candidates(&self) -> &[Candidate] { &self.candidates }

    /// The declared type admits null, or `null` is one of the candidates.
    pub fn is_nullable(&self) -> bool { self.nullable }

    pub fn resolve(&self, raw: &Value, registry: &TypeRegistry) -> Resolved {
        for candidate in &self.candidates {
            match attempt(candidate, raw, registry) {
                Ok(v) => return v,
                Err(reason) => {
                    tracing::trace!(%candidate, %reason, "candidate rejected");
                }
            }
        }

        if let Some(scalar) = self.declared.as_ref().and_then(DeclaredType::scalar) {
            match scalar.cast(raw) {
                Ok(v) => return v,
                Err(reason) => {
                    tracing::trace!(native = scalar.name(), %reason, "native cast rejected");
                }
            }
        }

        if raw.is_null() { Resolved::Null } else { Resolved::Raw(raw.clone()) }
    }
}

fn attempt(candidate: &Candidate, raw: &Value, registry: &TypeRegistry) -> Attempt {
    match candidate {
        Candidate::Null => {
            if raw.is_null() { Ok(Resolved::Null) } else { Err(Rejection::NotNull) }
        }
        Candidate::Scalar(s) => s.cast(raw).map_err(Rejection::Cast),
        Candidate::Array => match raw {
            Value::Array(_) => Ok(Resolved::Raw(raw.clone())),
            _ => Err(Rejection::NotASequence),
        },
        Candidate::SequenceOf(elem) => {
            let Value::Array(items) = raw else {
                return Err(Rejection::NotASequence);
            };
            // element type unknown: only the container shape is enforced
            let Some(entry) = registry.lookup(elem) else {
                return Ok(Resolved::Raw(raw.clone()));
            };
            items
                .iter()
                .map(|item| create_nested(entry, item, registry))
                .collect::<Result<Vec<_>, _>>()
                .map(Resolved::List)
        }
        Candidate::Named(name) => {
            let entry = registry.lookup(name).ok_or(Rejection::UnknownType)?;
            create_nested(entry, raw, registry)
        }
    }
}

fn create_nested(entry: &TypeEntry, raw: &Value, registry: &TypeRegistry) -> Attempt {
    let Value::Object(record) = raw else {
        return Err(Rejection::NotARecord);
    };
    entry
        .create(record, registry)
        .map(Resolved::Object)
        .map_err(Rejection::Nested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawRecord;
    use crate::value::TypedObject;
    use serde_json::json;

    // `Demo` keeps its record; it insists on a `foo` key so nested failures can be provoked.
    fn registry() -> TypeRegistry {
        let mut reg = TypeRegistry::new();
        reg.register_fn("Demo", |rec: &RawRecord, _: &TypeRegistry| {
            if rec.contains_key("foo") {
                Ok(TypedObject::new("Demo", rec.clone()))
            } else {
                Err(MapError::MissingRequiredField {
                    type_name: "Demo".into(),
                    key: "foo".into(),
                    field: "foo".into(),
                })
            }
        });
        reg
    }

    fn resolver(native: Option<&str>, doc: &str) -> TypeResolver {
        TypeResolver::new(native.and_then(DeclaredType::parse), Some(doc))
    }

    #[test]
    fn scalar_candidates_cast() {
        let reg = registry();
        assert_eq!(resolver(None, "@var int").resolve(&json!("123Foo"), &reg), Resolved::Int(123));
        assert_eq!(resolver(None, "@var bool").resolve(&json!("0"), &reg), Resolved::Bool(false));
        assert_eq!(resolver(None, "@var string").resolve(&json!(7), &reg), Resolved::Str("7".into()));
    }

    #[test]
    fn first_successful_candidate_wins() {
        let reg = registry();
        let r = resolver(None, "@var int|Demo");
        match r.resolve(&json!({"foo": "bar"}), &reg) {
            Resolved::Object(o) => assert_eq!(o.type_name(), "Demo"),
            other => panic!("expected Demo, got {other:?}"),
        }
        assert_eq!(r.resolve(&json!("5"), &reg), Resolved::Int(5));
    }

    #[test]
    fn sequence_of_registered_type_maps_each_element() {
        let reg = registry();
        let r = resolver(None, "@var Demo[]");
        let out = r.resolve(&json!([{"foo": "a"}, {"foo": "b"}]), &reg);
        let items = out.as_list().expect("list");
        assert_eq!(items.len(), 2);
        let first = items[0].as_object().and_then(|o| o.downcast_ref::<RawRecord>()).unwrap();
        assert_eq!(first["foo"], json!("a"));
    }

    #[test]
    fn sequence_of_unknown_type_passes_through() {
        let reg = registry();
        let raw = json!(["Foo", "Bar"]);
        assert_eq!(resolver(None, "@var string[]").resolve(&raw, &reg), Resolved::Raw(raw.clone()));
        assert_eq!(resolver(None, "@var array").resolve(&raw, &reg), Resolved::Raw(raw));
    }

    #[test]
    fn sequence_candidate_rejects_scalars() {
        let reg = registry();
        // array rejected, int accepted
        assert_eq!(resolver(None, "@var array|int").resolve(&json!("9"), &reg), Resolved::Int(9));
    }

    #[test]
    fn nested_failure_falls_through_to_pass_through() {
        let reg = registry();
        let raw = json!({"bar": 1});
        assert_eq!(resolver(None, "@var Demo").resolve(&raw, &reg), Resolved::Raw(raw));
        let raw = json!([{"foo": 1}, {"bar": 2}]);
        assert_eq!(resolver(None, "@var Demo[]").resolve(&raw, &reg), Resolved::Raw(raw));
    }

    #[test]
    fn unknown_names_fall_back_to_native_cast() {
        let reg = registry();
        assert_eq!(resolver(Some("int"), "@var Nope").resolve(&json!("12"), &reg), Resolved::Int(12));
        assert_eq!(resolver(Some("Nope"), "").resolve(&json!("12"), &reg), Resolved::Raw(json!("12")));
    }

    #[test]
    fn native_fallback_that_fails_passes_through() {
        let reg = registry();
        let raw = json!([1, 2]);
        assert_eq!(resolver(Some("int"), "").resolve(&raw, &reg), Resolved::Raw(raw));
    }

    #[test]
    fn declared_type_name_is_an_implicit_candidate() {
        let reg = registry();
        let r = TypeResolver::new(DeclaredType::parse("Demo"), None);
        assert_eq!(r.candidates(), [Candidate::Named("Demo".into())]);
        assert!(matches!(r.resolve(&json!({"foo": 1}), &reg), Resolved::Object(_)));
    }

    #[test]
    fn nullability() {
        let reg = registry();
        assert!(resolver(Some("?int"), "").is_nullable());
        assert!(resolver(None, "@var int|null").is_nullable());
        assert!(!resolver(Some("int"), "@var int").is_nullable());

        // candidate order decides, nullability does not short-circuit
        assert_eq!(resolver(None, "@var int|null").resolve(&json!(null), &reg), Resolved::Int(0));
        assert_eq!(resolver(None, "@var string|null").resolve(&json!(null), &reg), Resolved::Str(String::new()));
        assert_eq!(resolver(None, "@var null|int").resolve(&json!(null), &reg), Resolved::Null);
        assert_eq!(resolver(Some("?int"), "").resolve(&json!(null), &reg), Resolved::Int(0));
        assert_eq!(resolver(None, "@var int").resolve(&json!(null), &reg), Resolved::Int(0));
        // every candidate rejected: null is handed on as null
        assert_eq!(resolver(Some("?Demo"), "").resolve(&json!(null), &reg), Resolved::Null);
    }

    #[test]
    fn nothing_declared_passes_through() {
        let reg = registry();
        let r = TypeResolver::new(None, None);
        assert_eq!(r.resolve(&json!({"a": [1]}), &reg), Resolved::Raw(json!({"a": [1]})));
    }
}
