//! Change-detecting value cells for entity fields
//!
//! Every mirrored field of a locomotive or track switch is an [`Attribute`].
//! The value type is fixed by the initial value; assignments of another type
//! (or JSON `null`) are rejected and report "unchanged".

use serde_json::Value;
use std::fmt;

/// Dynamically typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Text(String),
}

impl AttrValue {
    /// Name of the runtime type, used in logs
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Bool(_) => "bool",
            AttrValue::Int(_) => "int",
            AttrValue::Float(_) => "float",
            AttrValue::Text(_) => "text",
        }
    }

    fn same_type(&self, other: &AttrValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Convert a decoded JSON value into an attribute value
    ///
    /// Integers stay integers; every other number becomes a float.
    /// Returns `None` for `null`, arrays and objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(AttrValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(AttrValue::Int(i)),
                None => n.as_f64().map(|f| AttrValue::Float(f as f32)),
            },
            Value::String(s) => Some(AttrValue::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Float(v) => write!(f, "{:.3}", v),
            AttrValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<f32> for AttrValue {
    fn from(v: f32) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

/// Named, typed, change-detecting value
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    value: AttrValue,
}

impl Attribute {
    pub fn new(name: impl Into<String>, initial: impl Into<AttrValue>) -> Self {
        Self {
            name: name.into(),
            value: initial.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &AttrValue {
        &self.value
    }

    /// Assign a new value
    ///
    /// Returns `true` only if the value has the attribute's type and differs
    /// from the current one.
    pub fn assign(&mut self, new: impl Into<AttrValue>) -> bool {
        let new = new.into();
        if !self.value.same_type(&new) {
            tracing::trace!(
                "Attribute '{}' rejected {} value (expects {})",
                self.name,
                new.type_name(),
                self.value.type_name()
            );
            return false;
        }
        if self.value == new {
            return false;
        }
        self.value = new;
        true
    }

    /// Assign from a JSON value, where `null` never changes anything
    pub fn assign_json(&mut self, value: &Value) -> bool {
        match AttrValue::from_json(value) {
            // JSON has one number type; let integral input land in float cells
            Some(AttrValue::Int(i)) if matches!(self.value, AttrValue::Float(_)) => {
                self.assign(i as f32)
            }
            Some(v) => self.assign(v),
            None => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            AttrValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self.value {
            AttrValue::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.value {
            AttrValue::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}
