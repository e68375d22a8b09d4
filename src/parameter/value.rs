use crate::types::DataTypeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A parameter value as seen by generic editors and serializers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    DataType(DataTypeId),
}

/// The declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    Bool,
    Integer,
    Number,
    Text,
    DataType,
}

impl ParameterValue {
    pub fn value_type(&self) -> ParameterType {
        match self {
            ParameterValue::Bool(_) => ParameterType::Bool,
            ParameterValue::Integer(_) => ParameterType::Integer,
            ParameterValue::Number(_) => ParameterType::Number,
            ParameterValue::Text(_) => ParameterType::Text,
            ParameterValue::DataType(_) => ParameterType::DataType,
        }
    }

    /// Converts the value into `target` where that is lossless.
    ///
    /// Integers widen to numbers, and text is accepted for data type identifiers.
    /// On failure the found type is returned.
    pub fn coerce(self, target: ParameterType) -> Result<ParameterValue, ParameterType> {
        match (self, target) {
            (value, target) if value.value_type() == target => Ok(value),
            (ParameterValue::Integer(i), ParameterType::Number) => {
                Ok(ParameterValue::Number(i as f64))
            }
            (ParameterValue::Text(s), ParameterType::DataType) => {
                Ok(ParameterValue::DataType(DataTypeId::new(s)))
            }
            (value, _) => Err(value.value_type()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParameterValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Number(n) => Some(*n),
            ParameterValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::Text(s) => Some(s),
            ParameterValue::DataType(id) => Some(id.as_str()),
            _ => None,
        }
    }

    /// Converts a plain JSON scalar. Arrays, objects and null have no counterpart.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(ParameterValue::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(ParameterValue::Integer)
                .or_else(|| n.as_f64().map(ParameterValue::Number)),
            serde_json::Value::String(s) => Some(ParameterValue::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParameterValue::Bool(b) => serde_json::Value::Bool(*b),
            ParameterValue::Integer(i) => serde_json::Value::from(*i),
            ParameterValue::Number(n) => serde_json::Value::from(*n),
            ParameterValue::Text(s) => serde_json::Value::String(s.clone()),
            ParameterValue::DataType(id) => serde_json::Value::String(id.to_string()),
        }
    }
}

impl ParameterType {
    /// The value a fresh parameter of this type starts with.
    pub fn default_value(self) -> ParameterValue {
        match self {
            ParameterType::Bool => ParameterValue::Bool(false),
            ParameterType::Integer => ParameterValue::Integer(0),
            ParameterType::Number => ParameterValue::Number(0.0),
            ParameterType::Text => ParameterValue::Text(String::new()),
            ParameterType::DataType => ParameterValue::DataType(DataTypeId::new("")),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(b) => write!(f, "{}", b),
            ParameterValue::Integer(i) => write!(f, "{}", i),
            ParameterValue::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            ParameterValue::Text(s) => write!(f, "\"{}\"", s),
            ParameterValue::DataType(id) => write!(f, "<{}>", id),
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterType::Bool => "bool",
            ParameterType::Integer => "integer",
            ParameterType::Number => "number",
            ParameterType::Text => "text",
            ParameterType::DataType => "data type",
        };
        f.write_str(name)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Integer(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Number(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

impl From<DataTypeId> for ParameterValue {
    fn from(value: DataTypeId) -> Self {
        ParameterValue::DataType(value)
    }
}

/// The value types a dynamic collection accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AllowedParameterTypes {
    #[default]
    Any,
    Only(BTreeSet<ParameterType>),
}

impl AllowedParameterTypes {
    pub fn only(types: impl IntoIterator<Item = ParameterType>) -> Self {
        AllowedParameterTypes::Only(types.into_iter().collect())
    }

    pub fn allows(&self, value_type: ParameterType) -> bool {
        match self {
            AllowedParameterTypes::Any => true,
            AllowedParameterTypes::Only(set) => set.contains(&value_type),
        }
    }
}
