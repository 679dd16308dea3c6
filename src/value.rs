//! Typed values produced by the resolver and the type-erased object wrapper.
use std::any::Any;
use std::fmt;

use serde_json::Value;

use crate::resolver::cast;

// ————————————————————————————————————————————————————————————————————————————
// RESOLVED VALUES
// ————————————————————————————————————————————————————————————————————————————

/// What one field's raw value became.
#[derive(Debug, PartialEq)]
pub enum Resolved {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Handed on unchanged (no candidate matched, or a plain sequence).
    Raw(Value),
    /// A nested target type built by its own mapper.
    Object(TypedObject),
    /// Sequence of nested target types, in input order.
    List(Vec<Resolved>),
}

impl Resolved {
    /// Lift scalars into their typed arms; containers stay raw.
    pub fn from_json(v: Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Self::Int(i),
                (None, Some(f)) if n.is_f64() => Self::Float(f),
                _ => Self::Raw(Value::Number(n)),
            },
            Value::String(s) => Self::Str(s),
            other => Self::Raw(other),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Raw(Value::Null))
    }

    /// JSON view of scalar and raw values. Mapped objects have none.
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Null => Some(Value::Null),
            Self::Bool(b) => Some(Value::Bool(b)),
            Self::Int(i) => Some(Value::from(i)),
            Self::Float(f) => Some(Value::from(f)),
            Self::Str(s) => Some(Value::String(s)),
            Self::Raw(v) => Some(v),
            Self::Object(_) | Self::List(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&TypedObject> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Resolved]> {
        match self {
            Self::List(xs) => Some(xs),
            _ => None,
        }
    }

    /// Extract a host value; `None` for null or when the value does not fit.
    pub fn to<T: FromResolved>(self) -> Option<T> {
        T::from_resolved(self)
    }

    /// Extract into an optional field slot, for use as an assign hook.
    ///
    /// Null clears the slot. A value that does not fit leaves the slot alone
    /// and returns `false`, which the mapper treats like an absent key.
    pub fn store<T: FromResolved>(self, slot: &mut Option<T>) -> bool {
        if self.is_null() {
            *slot = None;
            return true;
        }
        match T::from_resolved(self) {
            Some(v) => {
                *slot = Some(v);
                true
            }
            None => false,
        }
    }

    pub fn into_object<T: Any>(self) -> Option<T> {
        match self {
            Self::Object(o) => o.downcast(),
            _ => None,
        }
    }

    /// All-or-nothing: every element must be a mapped `T`.
    pub fn into_objects<T: Any>(self) -> Option<Vec<T>> {
        match self {
            Self::List(xs) => xs.into_iter().map(Self::into_object).collect(),
            _ => None,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE-ERASED OBJECTS
// ————————————————————————————————————————————————————————————————————————————

trait ErasedObject: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn eq_erased(&self, other: &dyn Any) -> bool;
}

impl<T: Any + fmt::Debug + PartialEq + Send + Sync> ErasedObject for T {
    fn as_any(&self) -> &dyn Any { self }
    fn into_any(self: Box<Self>) -> Box<dyn Any> { self }
    fn eq_erased(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|o| self == o)
    }
}

/// An owned instance of some registered target type.
pub struct TypedObject {
    type_name: String,
    inner: Box<dyn ErasedObject>,
}

impl TypedObject {
    pub fn new<T>(type_name: impl Into<String>, value: T) -> Self
    where
        T: Any + fmt::Debug + PartialEq + Send + Sync,
    {
        Self { type_name: type_name.into(), inner: Box::new(value) }
    }

    /// Name the type was registered under.
    pub fn type_name(&self) -> &str { &self.type_name }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.as_ref().as_any().is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.as_ref().as_any().downcast_ref::<T>()
    }

    pub fn downcast<T: Any>(self) -> Option<T> {
        self.inner.into_any().downcast::<T>().ok().map(|b| *b)
    }
}

impl PartialEq for TypedObject {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
            && self.inner.eq_erased(other.inner.as_ref().as_any())
    }
}

impl fmt::Debug for TypedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.type_name)?;
        fmt::Debug::fmt(self.inner.as_ref(), f)?;
        write!(f, ")")
    }
}

// ————————————————————————————————————————————————————————————————————————————
// EXTRACTION
// ————————————————————————————————————————————————————————————————————————————

/// Host types a field hook can pull out of a [`Resolved`].
///
/// Scalars are coerced with the resolver's cast rules, so a raw `"42"` still
/// extracts as `42i64`. Null never extracts.
pub trait FromResolved: Sized {
    fn from_resolved(v: Resolved) -> Option<Self>;
}

fn scalar<T>(v: Resolved, cast: fn(&Value) -> cast::CastResult<T>) -> Option<T> {
    if v.is_null() {
        return None;
    }
    let json = v.into_json()?;
    cast(&json).ok()
}

impl FromResolved for bool {
    fn from_resolved(v: Resolved) -> Option<Self> { scalar(v, cast::to_bool) }
}

impl FromResolved for i64 {
    fn from_resolved(v: Resolved) -> Option<Self> { scalar(v, cast::to_int) }
}

impl FromResolved for f64 {
    fn from_resolved(v: Resolved) -> Option<Self> { scalar(v, cast::to_float) }
}

impl FromResolved for String {
    fn from_resolved(v: Resolved) -> Option<Self> { scalar(v, cast::to_string) }
}

impl FromResolved for Value {
    fn from_resolved(v: Resolved) -> Option<Self> {
        if v.is_null() { None } else { v.into_json() }
    }
}

impl FromResolved for TypedObject {
    fn from_resolved(v: Resolved) -> Option<Self> {
        match v {
            Resolved::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl FromResolved for Resolved {
    fn from_resolved(v: Resolved) -> Option<Self> { Some(v) }
}

impl<T: FromResolved> FromResolved for Vec<T> {
    fn from_resolved(v: Resolved) -> Option<Self> {
        match v {
            Resolved::List(xs) => xs.into_iter().map(T::from_resolved).collect(),
            Resolved::Raw(Value::Array(xs)) => xs
                .into_iter()
                .map(|x| T::from_resolved(Resolved::from_json(x)))
                .collect(),
            _ => None,
        }
    }
}
