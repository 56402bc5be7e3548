use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dynamic value flowing between node ports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(j) => Some(j),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Sentinel recorded for a failed node's outputs under the
    /// continue-on-error policy. Downstream nodes read this instead
    /// of crashing on a missing upstream result.
    pub fn failed(message: impl Into<String>) -> Self {
        let mut map = HashMap::new();
        map.insert("failed".to_string(), Value::Bool(true));
        map.insert("error".to_string(), Value::String(message.into()));
        Value::Object(map)
    }

    /// True if this value is a failure sentinel from an upstream node.
    pub fn is_failed(&self) -> bool {
        match self {
            Value::Object(map) => {
                matches!(map.get("failed"), Some(Value::Bool(true)))
            }
            _ => false,
        }
    }

    /// Convert plain JSON into a `Value`, mapping objects and arrays
    /// structurally rather than wrapping them in `Value::Json`.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Self {
        Value::Json(j)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(map: HashMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_sentinel_round_trip() {
        let sentinel = Value::failed("boom");
        assert!(sentinel.is_failed());
        let map = sentinel.as_object().unwrap();
        assert_eq!(map.get("error"), Some(&Value::String("boom".into())));
        assert!(!Value::Number(1.0).is_failed());
        assert!(!Value::Null.is_failed());
    }

    #[test]
    fn from_json_maps_structurally() {
        let json = serde_json::json!({"n": 2, "nested": {"flag": true}, "list": [1, "x"]});
        let value = Value::from_json(json);
        let map = value.as_object().unwrap();
        assert_eq!(map.get("n"), Some(&Value::Number(2.0)));
        let nested = map.get("nested").unwrap().as_object().unwrap();
        assert_eq!(nested.get("flag"), Some(&Value::Bool(true)));
    }
}
