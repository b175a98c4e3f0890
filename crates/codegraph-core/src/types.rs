//! Value types and literal values.
//!
//! [`ValueType`] is the tag carried by value points. The built-in variants
//! cover the primitive and vector types; any other name is a class type.
//! [`Value`] is a literal stored on a point, and [`Value::value_type`] infers
//! the tag a literal carries when no explicit type is given.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The type tag of a value point. Serialized as its plain name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValueType {
    Number,
    Boolean,
    String,
    Array,
    Object,
    Vec2,
    Vec3,
    Vec4,
    /// A user or host class, e.g. `Entity`.
    Class(String),
}

impl ValueType {
    pub fn name(&self) -> &str {
        match self {
            ValueType::Number => "Number",
            ValueType::Boolean => "Boolean",
            ValueType::String => "String",
            ValueType::Array => "Array",
            ValueType::Object => "Object",
            ValueType::Vec2 => "Vec2",
            ValueType::Vec3 => "Vec3",
            ValueType::Vec4 => "Vec4",
            ValueType::Class(name) => name,
        }
    }

    /// Returns `true` for every type other than a class type.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, ValueType::Class(_))
    }
}

impl From<&str> for ValueType {
    fn from(name: &str) -> Self {
        match name {
            "Number" => ValueType::Number,
            "Boolean" => ValueType::Boolean,
            "String" => ValueType::String,
            "Array" => ValueType::Array,
            "Object" => ValueType::Object,
            "Vec2" => ValueType::Vec2,
            "Vec3" => ValueType::Vec3,
            "Vec4" => ValueType::Vec4,
            other => ValueType::Class(other.to_string()),
        }
    }
}

impl From<String> for ValueType {
    fn from(name: String) -> Self {
        match ValueType::from(name.as_str()) {
            ValueType::Class(_) => ValueType::Class(name),
            builtin => builtin,
        }
    }
}

impl From<ValueType> for String {
    fn from(ty: ValueType) -> Self {
        match ty {
            ValueType::Class(name) => name,
            builtin => builtin.name().to_string(),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A literal value held by a value point. Serialized as plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Number(#[serde(serialize_with = "serialize_number")] f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// The type a literal carries when no explicit type is declared.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Boolean(_) => ValueType::Boolean,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
        }
    }
}

/// Integral numbers are written without a fraction (`64`, not `64.0`).
fn serialize_number<S: serde::Serializer>(n: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_EXACT {
        serializer.serialize_i64(*n as i64)
    } else {
        serializer.serialize_f64(*n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Object(_) => f.write_str("[object]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_parse_to_builtins() {
        for name in ["Number", "Boolean", "String", "Array", "Object", "Vec2", "Vec3", "Vec4"] {
            let ty = ValueType::from(name);
            assert!(ty.is_builtin(), "{} should be builtin", name);
            assert_eq!(ty.name(), name);
        }
    }

    #[test]
    fn unknown_names_are_classes() {
        assert_eq!(ValueType::from("Entity"), ValueType::Class("Entity".into()));
        assert!(!ValueType::from("Entity").is_builtin());
    }

    #[test]
    fn value_type_serializes_as_name() {
        assert_eq!(serde_json::to_string(&ValueType::Vec3).unwrap(), "\"Vec3\"");
        let back: ValueType = serde_json::from_str("\"Entity\"").unwrap();
        assert_eq!(back, ValueType::Class("Entity".into()));
    }

    #[test]
    fn infers_type_from_literal() {
        assert_eq!(Value::from(64).value_type(), ValueType::Number);
        assert_eq!(Value::from(true).value_type(), ValueType::Boolean);
        assert_eq!(Value::from("hi").value_type(), ValueType::String);
        assert_eq!(
            Value::from(vec![Value::from(32), Value::from(64)]).value_type(),
            ValueType::Array
        );
    }

    #[test]
    fn literal_deserializes_untagged() {
        let v: Value = serde_json::from_str("64").unwrap();
        assert_eq!(v, Value::Number(64.0));
        let v: Value = serde_json::from_str("true").unwrap();
        assert_eq!(v, Value::Boolean(true));
        let v: Value = serde_json::from_str("[1, \"a\"]").unwrap();
        assert_eq!(v, Value::Array(vec![Value::Number(1.0), Value::from("a")]));
        let v: Value = serde_json::from_str("{\"x\": 1}").unwrap();
        assert_eq!(v.value_type(), ValueType::Object);
    }

    #[test]
    fn integral_numbers_serialize_without_fraction() {
        assert_eq!(serde_json::to_string(&Value::from(64)).unwrap(), "64");
        assert_eq!(serde_json::to_string(&Value::from(-3.0)).unwrap(), "-3");
        assert_eq!(serde_json::to_string(&Value::from(0.5)).unwrap(), "0.5");
        let back: Value = serde_json::from_str("64").unwrap();
        assert_eq!(back, Value::Number(64.0));
    }

    #[test]
    fn array_display_joins_items() {
        let v = Value::from(vec![Value::from(32), Value::from(64)]);
        assert_eq!(v.to_string(), "32,64");
    }
}
