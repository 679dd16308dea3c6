use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::cast::{self, CastResult};
use crate::value::Resolved;

// `@var int|Demo[]|null`, also accepting `\Ns\Type`, `crate::Type`, `?int`
static VAR_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@var\s+((?:[\w?|\\:<>]+(?:\[\])*)+)").expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    String,
    Int,
    Float,
    Bool,
}

impl Scalar {
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "string" => Some(Self::String),
            "int" | "integer" => Some(Self::Int),
            "float" | "double" => Some(Self::Float),
            "bool" | "boolean" => Some(Self::Bool),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
        }
    }

    pub fn cast(self, v: &Value) -> CastResult<Resolved> {
        match self {
            Self::String => cast::to_string(v).map(Resolved::Str),
            Self::Int => cast::to_int(v).map(Resolved::Int),
            Self::Float => cast::to_float(v).map(Resolved::Float),
            Self::Bool => cast::to_bool(v).map(Resolved::Bool),
        }
    }
}

/// One member of a union annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Null,
    Scalar(Scalar),
    /// Any sequence; elements are not inspected.
    Array,
    /// `T[]`: a sequence whose elements are `T`.
    SequenceOf(String),
    /// A type name to look up in the registry.
    Named(String),
}

impl Candidate {
    /// Parse one `|`-separated token. The flag reports a `?` nullable prefix.
    pub fn parse(token: &str) -> Option<(Self, bool)> {
        let token = token.trim();
        let (nullable, token) = match token.strip_prefix('?') {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        let token = strip_root(token);
        if token.is_empty() {
            return None;
        }

        if let Some(elem) = token.strip_suffix("[]") {
            let elem = strip_root(elem);
            if elem.is_empty() {
                return None;
            }
            return Some((Self::SequenceOf(elem.to_string()), nullable));
        }
        if token.eq_ignore_ascii_case("null") {
            return Some((Self::Null, true));
        }
        if token.eq_ignore_ascii_case("array") {
            return Some((Self::Array, nullable));
        }
        if let Some(s) = Scalar::parse(token) {
            return Some((Self::Scalar(s), nullable));
        }
        Some((Self::Named(token.to_string()), nullable))
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Scalar(s) => f.write_str(s.name()),
            Self::Array => f.write_str("array"),
            Self::SequenceOf(t) => write!(f, "{t}[]"),
            Self::Named(t) => f.write_str(t),
        }
    }
}

fn strip_root(name: &str) -> &str {
    name.trim_start_matches('\\').trim_start_matches("::")
}

/// Ordered candidates from the first `@var` tag in `doc`, plus whether any of
/// them admits null.
pub fn parse_var_tag(doc: &str) -> (Vec<Candidate>, bool) {
    let Some(caps) = VAR_TAG.captures(doc) else {
        return (Vec::new(), false);
    };
    let mut nullable = false;
    let candidates = caps[1]
        .split('|')
        .filter_map(Candidate::parse)
        .map(|(c, n)| {
            nullable |= n;
            c
        })
        .collect();
    (candidates, nullable)
}

// ------------------------------ Native types ------------------------------ //

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeType {
    Scalar(Scalar),
    Array,
    Named(String),
}

/// A field's declared host type, e.g. `int`, `?string`, `Post`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredType {
    pub kind: NativeType,
    pub nullable: bool,
}

impl DeclaredType {
    /// `None` for an empty declaration or `mixed`, which carries no type.
    pub fn parse(src: &str) -> Option<Self> {
        let src = src.trim();
        let (nullable, name) = match src.strip_prefix('?') {
            Some(rest) => (true, strip_root(rest.trim())),
            None => (false, strip_root(src)),
        };
        if name.is_empty() || name.eq_ignore_ascii_case("mixed") {
            return None;
        }
        let kind = if let Some(s) = Scalar::parse(name) {
            NativeType::Scalar(s)
        } else if name.eq_ignore_ascii_case("array") {
            NativeType::Array
        } else {
            NativeType::Named(name.to_string())
        };
        Some(Self { kind, nullable })
    }

    pub fn scalar(&self) -> Option<Scalar> {
        match self.kind {
            NativeType::Scalar(s) => Some(s),
            _ => None,
        }
    }
}
