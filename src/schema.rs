//! Target types declared in JSON instead of Rust.
//!
//! ```json
//! { "name": "User",
//!   "fields": [ { "name": "id", "type": "int" },
//!               { "name": "posts", "type": "array", "doc": "@var Post[]" } ] }
//! ```
//!
//! Instances are [`DynamicObject`]s keyed by field name.
use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{MapperConfig, Visibility, VisibilityFilter};
use crate::error::SchemaError;
use crate::field::{FieldDescriptor, FieldSpec};
use crate::mapper::FieldDiscoverer;
use crate::value::Resolved;

// ————————————————————————————————————————————————————————————————————————————
// DEFINITIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeDef {
    name: String,
    #[serde(default)]
    ignore_missing: bool,
    #[serde(default = "default_true")]
    allow_implicit_keys: bool,
    #[serde(default)]
    visibility: VisibilityFilter,
    #[serde(default)]
    fields: Vec<FieldDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldDef {
    name: String,
    #[serde(default, rename = "type")]
    ty: Option<String>,
    #[serde(default)]
    doc: Option<String>,
    /// `null` and absence both mean "no default".
    #[serde(default)]
    default: Option<Value>,
    #[serde(default)]
    visibility: Visibility,
    #[serde(default, rename = "static")]
    is_static: bool,
}

fn default_true() -> bool { true }

/// Load one type definition or an array of them.
pub fn load_schemas(src: &str) -> Result<Vec<SchemaType>, SchemaError> {
    let doc: Value = deserialize_with_path(&mut serde_json::Deserializer::from_str(src))?;
    let defs: Vec<TypeDef> = if doc.is_array() {
        deserialize_with_path(doc)?
    } else {
        vec![deserialize_with_path(doc)?]
    };

    let mut seen = HashSet::new();
    defs.into_iter()
        .map(|def| {
            if !seen.insert(def.name.clone()) {
                return Err(SchemaError::DuplicateType(def.name));
            }
            SchemaType::from_def(def)
        })
        .collect()
}

fn deserialize_with_path<'de, D, T>(de: D) -> Result<T, SchemaError>
where
    D: serde::Deserializer<'de>,
    D::Error: std::fmt::Display,
    T: DeserializeOwned,
{
    serde_path_to_error::deserialize(de).map_err(|err| SchemaError::Parse {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

// ————————————————————————————————————————————————————————————————————————————
// SCHEMA TYPES
// ————————————————————————————————————————————————————————————————————————————

pub struct SchemaType {
    name: String,
    config: MapperConfig,
    defaults: IndexMap<String, Value>,
    specs: Vec<FieldSpec<DynamicObject>>,
    descriptors: Arc<[FieldDescriptor<DynamicObject>]>,
}

impl SchemaType {
    fn from_def(def: TypeDef) -> Result<Self, SchemaError> {
        let config = MapperConfig {
            ignore_missing: def.ignore_missing,
            allow_implicit_keys: def.allow_implicit_keys,
            visibility: def.visibility,
        };

        let mut defaults = IndexMap::new();
        let mut specs = Vec::with_capacity(def.fields.len());
        for field in def.fields {
            if specs.iter().any(|s: &FieldSpec<DynamicObject>| s.name == field.name) {
                return Err(SchemaError::DuplicateField { type_name: def.name, field: field.name });
            }
            if let Some(value) = field.default {
                defaults.insert(field.name.clone(), value);
            }
            let mut spec = dynamic_field(&field.name).visibility(field.visibility);
            if let Some(ty) = field.ty.as_deref() {
                spec = spec.typed(ty);
            }
            if let Some(doc) = field.doc {
                spec = spec.doc(doc);
            }
            if field.is_static {
                spec = spec.static_field();
            }
            specs.push(spec);
        }

        let descriptors = discover(&specs, &config);
        Ok(Self { name: def.name, config, defaults, specs, descriptors })
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn config(&self) -> MapperConfig { self.config }

    /// Route values for `field` through `setter` instead of storing them directly.
    /// Unknown field names are ignored.
    pub fn with_setter<S>(mut self, field: &str, setter: S) -> Self
    where
        S: Fn(&mut DynamicObject, Resolved) -> bool + Send + Sync + 'static,
    {
        if let Some(spec) = self.specs.iter_mut().find(|s| s.name == field) {
            spec.set_setter(Arc::new(setter));
            self.descriptors = discover(&self.specs, &self.config);
        }
        self
    }
}

impl std::fmt::Debug for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaType")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("fields", &self.descriptors)
            .finish()
    }
}

fn dynamic_field(name: &str) -> FieldSpec<DynamicObject> {
    let store = name.to_string();
    let probe = name.to_string();
    FieldSpec::new(
        name,
        move |obj: &mut DynamicObject, v| {
            obj.set(store.clone(), v);
            true
        },
        move |obj: &DynamicObject| obj.get(&probe).is_some_and(|v| !v.is_null()),
    )
}

fn discover(specs: &[FieldSpec<DynamicObject>], config: &MapperConfig) -> Arc<[FieldDescriptor<DynamicObject>]> {
    specs.iter().filter_map(|s| FieldDescriptor::from_spec(s, config)).collect()
}

impl FieldDiscoverer for SchemaType {
    type Instance = DynamicObject;

    fn type_name(&self) -> &str { &self.name }

    fn config(&self) -> MapperConfig { self.config }

    fn instantiate(&self) -> DynamicObject {
        DynamicObject {
            type_name: self.name.clone(),
            fields: self
                .defaults
                .iter()
                .map(|(k, v)| (k.clone(), Resolved::from_json(v.clone())))
                .collect(),
        }
    }

    fn discover(&self) -> Arc<[FieldDescriptor<DynamicObject>]> {
        Arc::clone(&self.descriptors)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INSTANCES
// ————————————————————————————————————————————————————————————————————————————

/// Instance of a [`SchemaType`].
#[derive(Debug, PartialEq)]
pub struct DynamicObject {
    type_name: String,
    fields: IndexMap<String, Resolved>,
}

impl DynamicObject {
    pub fn type_name(&self) -> &str { &self.type_name }

    pub fn get(&self, field: &str) -> Option<&Resolved> { self.fields.get(field) }

    pub fn set(&mut self, field: impl Into<String>, value: Resolved) {
        self.fields.insert(field.into(), value);
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Resolved)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize { self.fields.len() }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    /// JSON-pointer style lookup through nested objects and lists,
    /// e.g. `/posts/0/title`.
    pub fn pointer(&self, ptr: &str) -> Option<&Resolved> {
        let mut tokens = ptr.strip_prefix('/')?.split('/').map(unescape);
        let mut cur = self.fields.get(&tokens.next()?)?;
        for token in tokens {
            cur = match cur {
                Resolved::Object(o) => o.downcast_ref::<DynamicObject>()?.fields.get(&token)?,
                Resolved::List(items) => items.get(token.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(cur)
    }
}

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use serde_json::json;

    fn record(v: Value) -> crate::raw::RawRecord {
        match v {
            Value::Object(m) => m,
            _ => unreachable!("test records are objects"),
        }
    }

    #[test]
    fn loads_single_and_many() {
        let one = load_schemas(r#"{"name": "A", "fields": [{"name": "x"}]}"#).unwrap();
        assert_eq!(one.len(), 1);
        let many = load_schemas(r#"[{"name": "A"}, {"name": "B", "ignore_missing": true}]"#).unwrap();
        assert_eq!(many[1].name(), "B");
        assert!(many[1].config().ignore_missing);
    }

    #[test]
    fn rejects_duplicates_and_unknown_keys() {
        assert!(matches!(
            load_schemas(r#"[{"name": "A"}, {"name": "A"}]"#),
            Err(SchemaError::DuplicateType(n)) if n == "A"
        ));
        assert!(matches!(
            load_schemas(r#"{"name": "A", "fields": [{"name": "x"}, {"name": "x"}]}"#),
            Err(SchemaError::DuplicateField { .. })
        ));
        match load_schemas(r#"{"name": "A", "fields": [{"name": "x", "typ": "int"}]}"#) {
            Err(SchemaError::Parse { path, .. }) => assert!(path.starts_with("fields[0]"), "path was {path}"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_prefill_instances() {
        let ty = load_schemas(r#"{"name": "A", "fields": [{"name": "x", "default": "Lorem"}, {"name": "y"}]}"#)
            .unwrap()
            .remove(0);
        let obj = ty.instantiate();
        assert_eq!(obj.get("x"), Some(&Resolved::Str("Lorem".into())));
        assert_eq!(obj.get("y"), None);

        let d = ty.discover();
        assert!(d[0].is_already_initialized(&obj));
        assert!(!d[1].is_already_initialized(&obj));
    }

    #[test]
    fn pointer_walks_nested_objects_and_lists() {
        let types = load_schemas(
            r#"[{"name": "Post", "fields": [{"name": "title", "type": "string"}]},
                {"name": "User", "fields": [{"name": "posts", "doc": "@var Post[]"},
                                            {"name": "a/b", "type": "int"}]}]"#,
        )
        .unwrap();
        let mut reg = TypeRegistry::new();
        reg.register_schemas(types);

        let user = reg
            .create_named("User", &record(json!({"posts": [{"title": "x"}, {"title": "y"}], "a/b": "3"})))
            .unwrap();
        let user = user.downcast_ref::<DynamicObject>().unwrap();
        assert_eq!(user.pointer("/posts/1/title"), Some(&Resolved::Str("y".into())));
        assert_eq!(user.pointer("/a~1b"), Some(&Resolved::Int(3)));
        assert_eq!(user.pointer("/posts/2"), None);
        assert_eq!(user.pointer("posts"), None);
    }

    #[test]
    fn setter_hook_replaces_assignment() {
        let ty = load_schemas(r#"{"name": "A", "fields": [{"name": "greeting", "type": "string"}]}"#)
            .unwrap()
            .remove(0)
            .with_setter("greeting", |obj, v| {
                let text = v.to::<String>().unwrap_or_default().replace("World", "Universe");
                obj.set("greeting", Resolved::Str(text));
                true
            });
        let mut reg = TypeRegistry::new();
        reg.register_schema(ty);
        let obj = reg.create_named("A", &record(json!({"greeting": "Hello World!"}))).unwrap();
        let obj = obj.downcast_ref::<DynamicObject>().unwrap();
        assert_eq!(obj.get("greeting"), Some(&Resolved::Str("Hello Universe!".into())));
    }
}
