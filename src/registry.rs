//! Type registry: names to create functions.
//!
//! Candidate type names from annotations are looked up here instead of being
//! inspected directly. The registry is filled once at startup and then shared
//! read-only, so any number of `create` calls can use it at the same time.
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::MapError;
use crate::mapper::{Mappable, TypedMapper};
use crate::raw::{self, RawRecord};
use crate::schema::SchemaType;
use crate::value::TypedObject;

type CreateFn = dyn Fn(&RawRecord, &TypeRegistry) -> Result<TypedObject, MapError> + Send + Sync;

#[derive(Clone)]
pub struct TypeEntry {
    name: String,
    create: Arc<CreateFn>,
}

impl TypeEntry {
    pub fn name(&self) -> &str { &self.name }

    pub fn create(&self, record: &RawRecord, registry: &TypeRegistry) -> Result<TypedObject, MapError> {
        (self.create)(record, registry)
    }
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEntry").field("name", &self.name).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    entries: IndexMap<String, TypeEntry>,
}

impl TypeRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn register<T: Mappable>(&mut self) -> &mut Self {
        self.register_fn(T::TYPE_NAME, |record, registry| {
            T::from_record(record, registry).map(|v| TypedObject::new(T::TYPE_NAME, v))
        })
    }

    pub fn register_schema(&mut self, schema: SchemaType) -> &mut Self {
        let name = schema.name().to_string();
        let schema = Arc::new(schema);
        self.register_fn(name, move |record, registry| {
            let object = TypedMapper::new(registry).create(schema.as_ref(), record)?;
            Ok(TypedObject::new(schema.name(), object))
        })
    }

    pub fn register_schemas(&mut self, schemas: impl IntoIterator<Item = SchemaType>) -> &mut Self {
        for schema in schemas {
            self.register_schema(schema);
        }
        self
    }

    /// Register a hand-written create function under `name`. Re-registering a
    /// name replaces the earlier entry.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, create: F) -> &mut Self
    where
        F: Fn(&RawRecord, &TypeRegistry) -> Result<TypedObject, MapError> + Send + Sync + 'static,
    {
        let name = name.into();
        let entry = TypeEntry { name: name.clone(), create: Arc::new(create) };
        if self.entries.insert(name.clone(), entry).is_some() {
            tracing::warn!(type_name = %name, "target type registered twice; keeping the latest");
        }
        self
    }

    /// Exact name first, then the last path segment (`App\Post`, `app::Post`).
    pub fn lookup(&self, name: &str) -> Option<&TypeEntry> {
        let name = name.trim_start_matches('\\').trim_start_matches("::");
        if let Some(entry) = self.entries.get(name) {
            return Some(entry);
        }
        let last = name.rsplit(['\\', ':']).next()?;
        if last.len() == name.len() {
            return None;
        }
        self.entries.get(last)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    // ---------------------------- Entry points ----------------------------- //

    pub fn create<T: Mappable>(&self, record: &RawRecord) -> Result<T, MapError> {
        T::from_record(record, self)
    }

    pub fn create_from_str<T: Mappable>(&self, src: &str) -> Result<T, MapError> {
        self.create(&raw::parse_record(src)?)
    }

    pub fn create_named(&self, name: &str, record: &RawRecord) -> Result<TypedObject, MapError> {
        let entry = self.lookup(name).ok_or_else(|| MapError::UnknownType(name.to_string()))?;
        entry.create(record, self)
    }

    /// Like [`create_named`](Self::create_named) for an arbitrary JSON value,
    /// which must be an object.
    pub fn create_named_from_value(&self, name: &str, value: &Value) -> Result<TypedObject, MapError> {
        match value {
            Value::Object(record) => self.create_named(name, record),
            other => Err(MapError::NotARecord {
                type_name: name.to_string(),
                found: raw::kind_name(other),
            }),
        }
    }
}
