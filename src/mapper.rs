//! The create loop and field discovery.
//!
//! `TypedMapper::create` is the one place a raw record becomes a typed
//! instance. Target types plug in through [`FieldDiscoverer`]: static Rust
//! types through [`Mappable`] (descriptors cached per type), schema-defined
//! types through [`SchemaType`](crate::schema::SchemaType).
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::config::MapperConfig;
use crate::error::MapError;
use crate::field::{FieldDescriptor, FieldSpec};
use crate::raw::RawRecord;
use crate::registry::TypeRegistry;

// ————————————————————————————————————————————————————————————————————————————
// DISCOVERY
// ————————————————————————————————————————————————————————————————————————————

/// Everything the create loop needs to know about one target type.
pub trait FieldDiscoverer {
    type Instance;

    fn type_name(&self) -> &str;

    fn config(&self) -> MapperConfig;

    /// A fresh instance holding only declared defaults.
    fn instantiate(&self) -> Self::Instance;

    /// Mappable fields in declaration order.
    fn discover(&self) -> Arc<[FieldDescriptor<Self::Instance>]>;
}

/// A Rust type that can be built from a raw record.
///
/// `Default` is the empty instance; any field it leaves non-null counts as a
/// declared default and survives a record that lacks its key.
pub trait Mappable: Default + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Name other types use to refer to this one in annotations.
    const TYPE_NAME: &'static str;

    fn fields() -> Vec<FieldSpec<Self>>;

    fn config() -> MapperConfig {
        MapperConfig::default()
    }

    fn from_record(record: &RawRecord, registry: &TypeRegistry) -> Result<Self, MapError> {
        TypedMapper::new(registry).create(&StaticType::<Self>::new(), record)
    }
}

/// Discoverer for a [`Mappable`] type.
pub struct StaticType<T>(PhantomData<fn() -> T>);

impl<T> StaticType<T> {
    pub fn new() -> Self { Self(PhantomData) }
}

impl<T> Default for StaticType<T> {
    fn default() -> Self { Self::new() }
}

impl<T: Mappable> FieldDiscoverer for StaticType<T> {
    type Instance = T;

    fn type_name(&self) -> &str { T::TYPE_NAME }

    fn config(&self) -> MapperConfig { T::config() }

    fn instantiate(&self) -> T { T::default() }

    fn discover(&self) -> Arc<[FieldDescriptor<T>]> { discovered::<T>() }
}

// Descriptor sets keyed by type. Each value is an `Arc<[FieldDescriptor<T>]>`
// for the `T` of its key.
static DISCOVERED: Lazy<RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>> =
    Lazy::new(Default::default);

fn cached<T: Mappable>() -> Option<Arc<[FieldDescriptor<T>]>> {
    let cache = DISCOVERED.read().unwrap_or_else(PoisonError::into_inner);
    let hit = cache.get(&TypeId::of::<T>())?;
    (**hit).downcast_ref::<Arc<[FieldDescriptor<T>]>>().cloned()
}

/// Discovery is pure, so two racing first calls may both compute; the first
/// insert is the one every caller sees afterwards.
fn discovered<T: Mappable>() -> Arc<[FieldDescriptor<T>]> {
    if let Some(hit) = cached::<T>() {
        return hit;
    }

    let config = T::config();
    let fresh: Arc<[FieldDescriptor<T>]> = T::fields()
        .iter()
        .filter_map(|spec| FieldDescriptor::from_spec(spec, &config))
        .collect();
    tracing::debug!(type_name = T::TYPE_NAME, fields = fresh.len(), "discovered fields");

    let mut cache = DISCOVERED.write().unwrap_or_else(PoisonError::into_inner);
    let published = cache
        .entry(TypeId::of::<T>())
        .or_insert_with(|| Arc::new(Arc::clone(&fresh)) as Arc<dyn Any + Send + Sync>);
    (**published)
        .downcast_ref::<Arc<[FieldDescriptor<T>]>>()
        .cloned()
        .unwrap_or(fresh)
}

// ————————————————————————————————————————————————————————————————————————————
// CREATE
// ————————————————————————————————————————————————————————————————————————————

/// Builds typed instances, resolving nested type names through `registry`.
#[derive(Debug, Clone, Copy)]
pub struct TypedMapper<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> TypedMapper<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r TypeRegistry { self.registry }

    /// Populate a fresh instance of `target` from `record`.
    ///
    /// Present keys are resolved and assigned (through the field's setter when
    /// it has one). A non-null value the field rejects counts as absent. An
    /// absent key leaves a defaulted field alone; otherwise it fails the whole
    /// call unless the type ignores missing fields.
    pub fn create<D>(&self, target: &D, record: &RawRecord) -> Result<D::Instance, MapError>
    where
        D: FieldDiscoverer + ?Sized,
    {
        let config = target.config();
        let mut instance = target.instantiate();

        for field in target.discover().iter() {
            if let Some(raw) = record.get(field.source_key()) {
                let value = field.parse_value(raw, self.registry);
                let is_null = value.is_null();
                tracing::trace!(
                    type_name = target.type_name(),
                    field = field.field_name(),
                    key = field.source_key(),
                    setter = field.has_setter_override(),
                    "assign"
                );
                if field.apply(&mut instance, value) || is_null {
                    continue;
                }
                tracing::debug!(
                    type_name = target.type_name(),
                    field = field.field_name(),
                    key = field.source_key(),
                    "field rejected value"
                );
            }

            if field.is_already_initialized(&instance) {
                continue;
            }

            if !config.ignore_missing {
                tracing::debug!(
                    type_name = target.type_name(),
                    field = field.field_name(),
                    key = field.source_key(),
                    "missing required field"
                );
                return Err(MapError::MissingRequiredField {
                    type_name: target.type_name().to_string(),
                    key: field.source_key().to_string(),
                    field: field.field_name().to_string(),
                });
            }
        }

        Ok(instance)
    }
}
