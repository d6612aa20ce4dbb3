//! Field values and key defaults

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime, Utc};
use serde::Deserialize;

/// A semantic value for one template key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "RawValue")]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Timestamp(NaiveDateTime),
}

/// Field name to value mapping consumed by `apply_fields` and produced by `get_fields`
pub type Fields = HashMap<String, FieldValue>;

/// Literal values as they appear in a schema document
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Int(i64),
    Str(String),
}

impl From<RawValue> for FieldValue {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Int(n) => FieldValue::Int(n),
            RawValue::Str(s) => FieldValue::Str(s),
        }
    }
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&NaiveDateTime> {
        match self {
            FieldValue::Timestamp(t) => Some(t),
            _ => None,
        }
    }

    /// Lower-cased string form used for choice and exclusion comparison
    pub(crate) fn folded(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => write!(f, "{}", s),
            FieldValue::Int(n) => write!(f, "{}", n),
            FieldValue::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Int(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Int(n.into())
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Int(n.into())
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(t: NaiveDateTime) -> Self {
        FieldValue::Timestamp(t)
    }
}

/// Zero-argument value source evaluated each time a default is needed
#[derive(Clone)]
pub struct DefaultProvider(Arc<dyn Fn() -> FieldValue + Send + Sync>);

impl DefaultProvider {
    pub fn new(f: impl Fn() -> FieldValue + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self) -> FieldValue {
        (self.0)()
    }
}

impl fmt::Debug for DefaultProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultProvider(..)")
    }
}

impl PartialEq for DefaultProvider {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Default of a key, resolved at render time
#[derive(Debug, Clone, PartialEq)]
pub enum KeyDefault {
    Fixed(FieldValue),
    CurrentLocalTime,
    CurrentUtcTime,
    Dynamic(DefaultProvider),
}

impl KeyDefault {
    /// Produce the value this default stands for right now
    pub fn resolve(&self) -> FieldValue {
        match self {
            KeyDefault::Fixed(value) => value.clone(),
            KeyDefault::CurrentLocalTime => FieldValue::Timestamp(Local::now().naive_local()),
            KeyDefault::CurrentUtcTime => FieldValue::Timestamp(Utc::now().naive_utc()),
            KeyDefault::Dynamic(provider) => provider.call(),
        }
    }

    /// The static value, if this default does not depend on when it is evaluated
    pub fn fixed(&self) -> Option<&FieldValue> {
        match self {
            KeyDefault::Fixed(value) => Some(value),
            _ => None,
        }
    }
}
