//! `serde_json::Value` <-> `Value` conversion utilities

use crate::value::Value;

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::string(s),
            serde_json::Value::Array(arr) => arr.into_iter().map(Value::from).collect(),
            serde_json::Value::Object(obj) => {
                obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(serde_json::Value::from).collect())
            }
            Value::Object(obj) => serde_json::Value::Object(
                obj.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        serde_json::Value::from(&v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_serde_keeps_key_order() {
        let v = Value::from(json!({"z": 1, "a": [true, null, 2.5]}));
        assert_eq!(crate::to_json(&v), r#"{"z":1,"a":[true,null,2.5]}"#);
    }

    #[test]
    fn test_to_serde() {
        let v: Value = [("n", Value::from(3)), ("s", Value::from("x"))]
            .into_iter()
            .collect();
        assert_eq!(serde_json::Value::from(&v), json!({"n": 3, "s": "x"}));
    }

    #[test]
    fn test_non_finite_float_becomes_null() {
        assert_eq!(serde_json::Value::from(Value::Float(f64::NAN)), serde_json::Value::Null);
    }
}
