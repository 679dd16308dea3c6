//! Map loosely-typed JSON records onto typed objects.
//!
//! Each target type lists its fields with an optional declared type and
//! annotation text. `@var int|Post|null` names the candidate types tried in
//! order and `@dto-property remoteKey` picks the source key. A [`TypeRegistry`]
//! resolves type names so nested records and lists of records become typed
//! objects too.
//!
//! ```
//! use json_dto::{FieldSpec, Mappable, Resolved, TypeRegistry};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Post { id: Option<i64>, title: Option<String> }
//!
//! impl Mappable for Post {
//!     const TYPE_NAME: &'static str = "Post";
//!     fn fields() -> Vec<FieldSpec<Self>> {
//!         vec![
//!             FieldSpec::new("id", |p: &mut Self, v: Resolved| v.store(&mut p.id), |p: &Self| p.id.is_some())
//!                 .typed("int"),
//!             FieldSpec::new("title", |p: &mut Self, v: Resolved| v.store(&mut p.title), |p: &Self| p.title.is_some())
//!                 .doc("@dto-property headline"),
//!         ]
//!     }
//! }
//!
//! let mut registry = TypeRegistry::new();
//! registry.register::<Post>();
//! let post: Post = registry.create_from_str(r#"{"id": "42", "headline": "Hi"}"#).unwrap();
//! assert_eq!(post, Post { id: Some(42), title: Some("Hi".into()) });
//! ```
pub mod config;
pub mod error;
pub mod field;
pub mod mapper;
pub mod raw;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod value;

pub use config::{MapperConfig, Visibility, VisibilityFilter};
pub use error::{MapError, SchemaError};
pub use field::{FieldDescriptor, FieldSpec};
pub use mapper::{FieldDiscoverer, Mappable, StaticType, TypedMapper};
pub use raw::RawRecord;
pub use registry::{TypeEntry, TypeRegistry};
pub use resolver::TypeResolver;
pub use schema::{DynamicObject, SchemaType, load_schemas};
pub use value::{FromResolved, Resolved, TypedObject};
