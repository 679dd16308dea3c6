//! Loose scalar casts.
//!
//! Strings cast to numbers through their leading numeric prefix (`"123Foo"` is
//! 123, `"abc"` is 0). Booleans follow the usual truthiness table where `""`,
//! `"0"`, zero, null and empty containers are false. Casting a container to a
//! number or string is the one conversion that fails.
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};
use thiserror::Error;

static NUMERIC_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t\n\r\x0b\x0c]*([+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?)")
        .expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot cast {from} to {to}")]
pub struct CastError {
    pub from: &'static str,
    pub to: &'static str,
}

pub type CastResult<T> = Result<T, CastError>;

pub fn to_int(v: &Value) -> CastResult<i64> {
    match v {
        Value::Null => Ok(0),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Number(n) => Ok(number_to_int(n)),
        Value::String(s) => Ok(str_to_int(s)),
        other => Err(container(other, "int")),
    }
}

pub fn to_float(v: &Value) -> CastResult<f64> {
    match v {
        Value::Null => Ok(0.0),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => Ok(str_to_float(s)),
        other => Err(container(other, "float")),
    }
}

pub fn to_bool(v: &Value) -> CastResult<bool> {
    Ok(match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => match n.as_i64() {
            Some(i) => i != 0,
            None => n.as_f64().is_some_and(|f| f != 0.0),
        },
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(xs) => !xs.is_empty(),
        Value::Object(m) => !m.is_empty(),
    })
}

pub fn to_string(v: &Value) -> CastResult<String> {
    match v {
        Value::Null => Ok(String::new()),
        Value::Bool(true) => Ok("1".to_string()),
        Value::Bool(false) => Ok(String::new()),
        Value::Number(n) => Ok(match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(u)) => u.to_string(),
            _ => n.as_f64().map(|f| f.to_string()).unwrap_or_else(|| n.to_string()),
        }),
        Value::String(s) => Ok(s.clone()),
        other => Err(container(other, "string")),
    }
}

fn container(v: &Value, to: &'static str) -> CastError {
    CastError { from: crate::raw::kind_name(v), to }
}

// ------------------------------ Numbers ---------------------------------- //

fn number_to_int(n: &Number) -> i64 {
    if let Some(i) = n.as_i64() {
        i
    } else if n.as_u64().is_some() {
        i64::MAX
    } else {
        float_to_int(n.as_f64().unwrap_or(0.0))
    }
}

// `as` saturates out-of-range floats; non-finite values have no integer.
fn float_to_int(f: f64) -> i64 {
    if f.is_finite() { f.trunc() as i64 } else { 0 }
}

fn str_to_int(s: &str) -> i64 {
    let Some(prefix) = numeric_prefix(s) else { return 0 };
    if prefix.contains(['.', 'e', 'E']) {
        return float_to_int(prefix.parse::<f64>().unwrap_or(0.0));
    }
    // too many digits for i64: saturate through f64
    prefix
        .parse::<i64>()
        .unwrap_or_else(|_| float_to_int(prefix.parse::<f64>().unwrap_or(0.0)))
}

fn str_to_float(s: &str) -> f64 {
    numeric_prefix(s)
        .and_then(|p| p.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Longest leading decimal number of `s` after leading whitespace:
/// `[+-]digits[.digits][(e|E)[+-]digits]`.
fn numeric_prefix(s: &str) -> Option<&str> {
    NUMERIC_PREFIX.captures(s).and_then(|c| c.get(1)).map(|m| m.as_str())
}

// ------------------------------- Tests ------------------------------------ //
