/// JSON value representation.
///
/// Uses `Int(i64)` for integers (not `f64`) to preserve precision on large
/// IDs, and keeps decimal literals as text in `Numeric` so `1e400` or a
/// 30-digit literal survives until a numeric operation forces a coercion.
/// `Object` uses `Vec<(String, Value)>` to preserve key insertion order;
/// operations that need deterministic key order (`.keyvalue()`) sort
/// lexicographically themselves.
///
/// `Datetime` never comes from a JSON document — only the datetime item
/// methods produce it — but it flows through result lists and comparisons
/// like any other value.
use crate::datetime::Datetime;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Numeric(String),
    String(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
    Datetime(Datetime),
}

impl Value {
    /// Returns the canonical jsonpath type name, as produced by `.type()`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Double(_) | Value::Numeric(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Datetime(dt) => dt.type_name(),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Double(_) | Value::Numeric(_))
    }

    /// Looks up a key in an object value. Linear scan — objects keep
    /// insertion order and are typically small.
    pub fn object_get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Double(f)
                } else {
                    // u64 beyond i64::MAX
                    Value::Numeric(n.to_string())
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Value {
    /// Converts back to a `serde_json::Value`. Datetimes render to their
    /// canonical string form; `Numeric` re-parses its literal text.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Double(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Numeric(text) => text
                .parse::<serde_json::Number>()
                .map(serde_json::Value::Number)
                .unwrap_or_else(|_| serde_json::Value::String(text.clone())),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Bool(true).type_name(), "boolean");
        assert_eq!(Value::Int(42).type_name(), "number");
        assert_eq!(Value::Double(3.14).type_name(), "number");
        assert_eq!(Value::Numeric("2.5".into()).type_name(), "number");
        assert_eq!(Value::String("hi".into()).type_name(), "string");
        assert_eq!(Value::Array(vec![]).type_name(), "array");
        assert_eq!(Value::Object(vec![]).type_name(), "object");
    }

    #[test]
    fn from_json_preserves_integers() {
        let v = Value::from(json!({"id": 9007199254740993_i64}));
        assert_eq!(v.object_get("id"), Some(&Value::Int(9007199254740993)));
    }

    #[test]
    fn from_json_large_u64_stays_numeric() {
        let v = Value::from(json!(18446744073709551615_u64));
        assert_eq!(v, Value::Numeric("18446744073709551615".into()));
    }

    #[test]
    fn object_get_missing() {
        let v = Value::from(json!({"a": 1}));
        assert_eq!(v.object_get("b"), None);
        assert_eq!(Value::Int(1).object_get("a"), None);
    }

    #[test]
    fn json_round_trip() {
        let src = json!({"a": [1, 2.5, "x", null, true], "b": {"c": -7}});
        let v = Value::from(src.clone());
        assert_eq!(v.to_json(), src);
    }
}
