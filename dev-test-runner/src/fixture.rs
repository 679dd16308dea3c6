//! Fixture format and evaluation.
//!
//! ```json
//! { "name": "nested posts",
//!   "types": [ ...schema definitions... ],
//!   "root": "User",
//!   "input": { ... },
//!   "expect": { "/posts/0": {"$type": "Post"}, "/posts": {"$len": 2}, "/id": 1 } }
//! ```
//!
//! A fixture expecting failure carries `"error": {"missing": "<source key>"}`
//! instead of `expect`.
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use json_dto::{DynamicObject, Resolved, TypeRegistry, load_schemas};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    pub name: String,
    pub types: Value,
    pub root: String,
    pub input: Value,
    #[serde(default)]
    pub expect: IndexMap<String, Value>,
    #[serde(default)]
    pub error: Option<ExpectedError>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedError {
    pub missing: String,
}

#[derive(Debug)]
pub struct Report {
    pub path: PathBuf,
    pub name: String,
    pub failures: Vec<String>,
}

impl Report {
    pub fn passed(&self) -> bool { self.failures.is_empty() }
}

pub fn load(path: &Path) -> anyhow::Result<Fixture> {
    let source = std::fs::read_to_string(path)?;
    let de = &mut serde_json::Deserializer::from_str(&source);
    serde_path_to_error::deserialize(de).map_err(|err| {
        let at = err.path().to_string();
        anyhow::anyhow!("at JSON path {at} → {}", err.into_inner())
    })
}

/// Load and evaluate one fixture file. Load errors are reported as failures.
pub fn run_file(path: &Path) -> Report {
    match load(path) {
        Ok(fixture) => Report {
            path: path.to_path_buf(),
            name: fixture.name.clone(),
            failures: evaluate(&fixture),
        },
        Err(error) => Report {
            path: path.to_path_buf(),
            name: path.display().to_string(),
            failures: vec![format!("failed to load fixture: {error}")],
        },
    }
}

pub fn evaluate(fixture: &Fixture) -> Vec<String> {
    let types = match load_schemas(&fixture.types.to_string()) {
        Ok(types) => types,
        Err(error) => return vec![error.to_string()],
    };
    let mut registry = TypeRegistry::new();
    registry.register_schemas(types);

    let outcome = registry.create_named_from_value(&fixture.root, &fixture.input);
    tracing::debug!(fixture = %fixture.name, ok = outcome.is_ok(), "mapped");

    match (outcome, &fixture.error) {
        (Err(error), Some(expected)) => match error.missing_field() {
            Some((key, _)) if key == expected.missing => Vec::new(),
            _ => vec![format!("expected missing key `{}`, got: {error}", expected.missing)],
        },
        (Err(error), None) => vec![format!("create failed: {error}")],
        (Ok(_), Some(expected)) => {
            vec![format!("expected missing key `{}`, but create succeeded", expected.missing)]
        }
        (Ok(object), None) => match object.downcast_ref::<DynamicObject>() {
            Some(object) => fixture
                .expect
                .iter()
                .filter_map(|(ptr, want)| check(object, ptr, want).err())
                .collect(),
            None => vec![format!("`{}` did not produce a schema object", fixture.root)],
        },
    }
}

fn check(object: &DynamicObject, ptr: &str, want: &Value) -> Result<(), String> {
    let actual = object.pointer(ptr).ok_or_else(|| format!("{ptr}: no value"))?;

    if let Some(type_name) = want.get("$type").and_then(Value::as_str) {
        return match actual.as_object() {
            Some(o) if o.type_name() == type_name => Ok(()),
            _ => Err(format!("{ptr}: expected a `{type_name}` object, found {actual:?}")),
        };
    }
    if let Some(len) = want.get("$len").and_then(Value::as_u64) {
        let found = match actual {
            Resolved::List(items) => Some(items.len()),
            Resolved::Raw(Value::Array(items)) => Some(items.len()),
            _ => None,
        };
        return match found {
            Some(n) if n as u64 == len => Ok(()),
            _ => Err(format!("{ptr}: expected {len} items, found {actual:?}")),
        };
    }

    match scalar_json(actual) {
        Some(found) if &found == want => Ok(()),
        _ => Err(format!("{ptr}: expected {want}, found {actual:?}")),
    }
}

fn scalar_json(r: &Resolved) -> Option<Value> {
    match r {
        Resolved::Null => Some(Value::Null),
        Resolved::Bool(b) => Some(Value::Bool(*b)),
        Resolved::Int(i) => Some(Value::from(*i)),
        Resolved::Float(f) => Some(Value::from(*f)),
        Resolved::Str(s) => Some(Value::String(s.clone())),
        Resolved::Raw(v) => Some(v.clone()),
        Resolved::Object(_) | Resolved::List(_) => None,
    }
}
