//! Field declarations and the descriptors discovered from them.
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::config::{MapperConfig, Visibility};
use crate::registry::TypeRegistry;
use crate::resolver::{DeclaredType, TypeResolver};
use crate::value::Resolved;

/// Marker that binds a field to a source key: `@dto-property remoteKey`.
/// With no value the field's own name is the key.
pub const ALIAS_MARKER: &str = "@dto-property";

static ALIAS_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@dto-property[ \t]*([\w.\-]*)").expect("static regex")
});

/// Stores a resolved value; `false` when the value does not fit the field.
pub type AssignFn<I> = Arc<dyn Fn(&mut I, Resolved) -> bool + Send + Sync>;
pub type ProbeFn<I> = Arc<dyn Fn(&I) -> bool + Send + Sync>;

/// Value of the alias marker in `doc`: `None` without a marker, `Some("")` for
/// a bare marker.
pub fn alias_marker(doc: &str) -> Option<&str> {
    ALIAS_TAG.captures(doc).map(|c| c.get(1).map_or("", |m| m.as_str()))
}

// ————————————————————————————————————————————————————————————————————————————
// DECLARATIONS
// ————————————————————————————————————————————————————————————————————————————

/// One field of host type `I`, as the type declares it.
///
/// `assign` stores a resolved value and reports whether it fit (see
/// [`Resolved::store`]); `probe` reports whether the field currently holds a
/// non-null value (a declared default, before mapping).
pub struct FieldSpec<I> {
    pub name: String,
    pub declared: Option<DeclaredType>,
    pub doc: Option<String>,
    pub visibility: Visibility,
    pub is_static: bool,
    assign: AssignFn<I>,
    setter: Option<AssignFn<I>>,
    probe: ProbeFn<I>,
}

impl<I> FieldSpec<I> {
    pub fn new<A, P>(name: impl Into<String>, assign: A, probe: P) -> Self
    where
        A: Fn(&mut I, Resolved) -> bool + Send + Sync + 'static,
        P: Fn(&I) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            declared: None,
            doc: None,
            visibility: Visibility::Public,
            is_static: false,
            assign: Arc::new(assign),
            setter: None,
            probe: Arc::new(probe),
        }
    }

    /// Declared type, e.g. `"int"`, `"?string"`, `"Post"`.
    pub fn typed(mut self, decl: &str) -> Self {
        self.declared = DeclaredType::parse(decl);
        self
    }

    /// Annotation text carrying `@var` and `@dto-property` tags.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Type-level field; never discovered.
    pub fn static_field(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Custom setter, called instead of direct assignment.
    pub fn setter<S>(mut self, setter: S) -> Self
    where
        S: Fn(&mut I, Resolved) -> bool + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(setter));
        self
    }

    pub(crate) fn set_setter(&mut self, setter: AssignFn<I>) {
        self.setter = Some(setter);
    }
}

impl<I> fmt::Debug for FieldSpec<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("doc", &self.doc)
            .field("visibility", &self.visibility)
            .field("is_static", &self.is_static)
            .field("setter", &self.setter.is_some())
            .finish()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DESCRIPTORS
// ————————————————————————————————————————————————————————————————————————————

/// A mappable field: where its value comes from and how it is converted.
pub struct FieldDescriptor<I> {
    field_name: String,
    source_key: String,
    resolver: TypeResolver,
    assign: AssignFn<I>,
    setter: Option<AssignFn<I>>,
    probe: ProbeFn<I>,
}

impl<I> FieldDescriptor<I> {
    /// `None` when the field does not take part in mapping: static fields,
    /// visibilities outside the filter, and unmarked fields when implicit keys
    /// are disabled.
    pub fn from_spec(spec: &FieldSpec<I>, config: &MapperConfig) -> Option<Self> {
        if spec.is_static || !config.visibility.allows(spec.visibility) {
            return None;
        }
        let doc = spec.doc.as_deref();
        let source_key = match doc.and_then(alias_marker) {
            Some("") => spec.name.clone(),
            Some(alias) => alias.to_string(),
            None if config.allow_implicit_keys => spec.name.clone(),
            None => return None,
        };
        Some(Self {
            field_name: spec.name.clone(),
            source_key,
            resolver: TypeResolver::new(spec.declared.clone(), doc),
            assign: Arc::clone(&spec.assign),
            setter: spec.setter.clone(),
            probe: Arc::clone(&spec.probe),
        })
    }

    pub fn field_name(&self) -> &str { &self.field_name }

    pub fn source_key(&self) -> &str { &self.source_key }

    pub fn resolver(&self) -> &TypeResolver { &self.resolver }

    pub fn has_setter_override(&self) -> bool { self.setter.is_some() }

    pub fn parse_value(&self, raw: &Value, registry: &TypeRegistry) -> Resolved {
        self.resolver.resolve(raw, registry)
    }

    pub fn is_already_initialized(&self, instance: &I) -> bool {
        (self.probe)(instance)
    }

    /// Store `value` through the custom setter if there is one. `false` when
    /// the hook rejected the value.
    pub fn apply(&self, instance: &mut I, value: Resolved) -> bool {
        match &self.setter {
            Some(setter) => setter(instance, value),
            None => (self.assign)(instance, value),
        }
    }
}

impl<I> fmt::Debug for FieldDescriptor<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("field_name", &self.field_name)
            .field("source_key", &self.source_key)
            .field("resolver", &self.resolver)
            .field("has_setter_override", &self.has_setter_override())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisibilityFilter;
    use crate::resolver::Candidate;

    #[derive(Default)]
    struct Probe {
        value: Option<i64>,
    }

    fn spec(name: &str) -> FieldSpec<Probe> {
        FieldSpec::new(name, |p: &mut Probe, v: Resolved| v.store(&mut p.value), |p: &Probe| p.value.is_some())
    }

    fn key(spec: &FieldSpec<Probe>, config: &MapperConfig) -> Option<String> {
        FieldDescriptor::from_spec(spec, config).map(|d| d.source_key().to_string())
    }

    #[test]
    fn alias_marker_values() {
        assert_eq!(alias_marker("@var int\n@dto-property remoteInt"), Some("remoteInt"));
        assert_eq!(alias_marker("/** @dto-property */"), Some(""));
        assert_eq!(alias_marker("@dto-property user-id"), Some("user-id"));
        assert_eq!(alias_marker("@var int"), None);
    }

    #[test]
    fn key_resolution() {
        let implicit = MapperConfig::default();
        let explicit = MapperConfig::default().allow_implicit_keys(false);

        let aliased = spec("myInt").doc("@dto-property remoteInt");
        assert_eq!(key(&aliased, &implicit).as_deref(), Some("remoteInt"));
        assert_eq!(key(&aliased, &explicit).as_deref(), Some("remoteInt"));

        let bare = spec("myInt").doc("@dto-property");
        assert_eq!(key(&bare, &explicit).as_deref(), Some("myInt"));

        let unmarked = spec("myInt").doc("@var int");
        assert_eq!(key(&unmarked, &implicit).as_deref(), Some("myInt"));
        assert_eq!(key(&unmarked, &explicit), None);
    }

    #[test]
    fn static_and_hidden_fields_are_excluded() {
        let config = MapperConfig::default();
        assert_eq!(key(&spec("count").static_field(), &config), None);
        assert_eq!(key(&spec("secret").visibility(Visibility::Private), &config), None);

        let open = config.visibility(VisibilityFilter::ALL);
        assert_eq!(key(&spec("secret").visibility(Visibility::Private), &open).as_deref(), Some("secret"));
        assert_eq!(key(&spec("count").static_field(), &open), None);
    }

    #[test]
    fn resolver_built_from_declared_type_and_var_tag() {
        let config = MapperConfig::default();
        let d = FieldDescriptor::from_spec(&spec("n").typed("?int").doc("@var int|string"), &config).unwrap();
        assert!(d.resolver().is_nullable());
        assert_eq!(d.resolver().candidates(), [Candidate::Scalar(crate::resolver::Scalar::Int), Candidate::Scalar(crate::resolver::Scalar::String)]);
    }

    #[test]
    fn setter_overrides_assignment() {
        let config = MapperConfig::default();
        let plain = FieldDescriptor::from_spec(&spec("n"), &config).unwrap();
        let doubled = FieldDescriptor::from_spec(
            &spec("n").setter(|p: &mut Probe, v: Resolved| {
                p.value = v.to::<i64>().map(|n| n * 2);
                p.value.is_some()
            }),
            &config,
        )
        .unwrap();
        assert!(!plain.has_setter_override());
        assert!(doubled.has_setter_override());

        let mut p = Probe::default();
        assert!(!plain.is_already_initialized(&p));
        assert!(plain.apply(&mut p, Resolved::Int(4)));
        assert_eq!(p.value, Some(4));
        assert!(doubled.apply(&mut p, Resolved::Int(4)));
        assert_eq!(p.value, Some(8));
        assert!(doubled.is_already_initialized(&p));

        assert!(!plain.apply(&mut p, Resolved::Raw(serde_json::json!([1, 2]))));
        assert_eq!(p.value, Some(8));
    }
}
