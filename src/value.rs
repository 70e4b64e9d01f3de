use std::{cmp::Ordering, fmt, sync::Arc};

use indexmap::IndexMap;
use rust_decimal::{Decimal, prelude::FromPrimitive};

/// Insertion-ordered object map.
pub type Map = IndexMap<String, Value>;

/// A JSON value flowing through a filter pipeline.
///
/// Numbers keep the distinction between integers and floats, but the two
/// compare (and test equal) by numeric value, so `1 == 1.0`.
///
/// Strings, arrays and objects live behind an [`Arc`]: cloning a value never
/// copies its contents, and a filter that "changes" data builds a new value
/// that shares every untouched sub-structure with its input.
///
/// # Equality and ordering
///
/// Values are totally ordered:
///
/// `null < false < true < numbers < strings < arrays < objects`
///
/// - numbers by value (integer/float comparisons are exact)
/// - strings by code point
/// - arrays elementwise, then by length
/// - objects by their sorted key lists, then by values in sorted-key order
///
/// Object equality ignores key order; serialization does not.
///
/// # Examples
///
/// ```
/// use jqlite::Value;
///
/// let a = Value::from(1);
/// let b = Value::from(1.0);
/// assert_eq!(a, b);
///
/// assert!(Value::Null < Value::from(false));
/// assert!(Value::from("z") < Value::array(vec![]));
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// JSON null
    Null,

    /// JSON boolean (true/false)
    Boolean(bool),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// Floating-point number
    Float(f64),

    /// UTF-8 string
    String(Arc<str>),

    /// Array of values
    Array(Arc<Vec<Value>>),

    /// Object with unique keys in insertion order
    Object(Arc<Map>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(Arc::from(s.into()))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(items))
    }

    pub fn object(map: Map) -> Self {
        Value::Object(Arc::new(map))
    }

    /// Human-readable type name, as reported by `type` and in type errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Only `null` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Boolean(false))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as integer, flooring floats
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(n) if n.is_finite() => Some(n.floor() as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Object field lookup; `None` for missing keys and non-objects.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
}

fn compare_floats(a: f64, b: f64) -> Ordering {
    // `==` first so that 0.0 and -0.0 stay equal
    if a == b {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

fn compare_int_float(a: i64, b: f64) -> Ordering {
    match Decimal::from_f64(b) {
        Some(bd) if b.is_finite() => Decimal::from(a).cmp(&bd),
        _ => compare_floats(a as f64, b),
    }
}

fn compare_objects(a: &Map, b: &Map) -> Ordering {
    let mut a_keys: Vec<&String> = a.keys().collect();
    let mut b_keys: Vec<&String> = b.keys().collect();
    a_keys.sort();
    b_keys.sort();

    a_keys.cmp(&b_keys).then_with(|| {
        a_keys
            .iter()
            .map(|k| (&a[k.as_str()], &b[k.as_str()]))
            .map(|(x, y)| x.cmp(y))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    })
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => compare_floats(*a, *b),
            (Integer(a), Float(b)) => compare_int_float(*a, *b),
            (Float(a), Integer(b)) => compare_int_float(*b, *a).reverse(),
            // UTF-8 byte order is code point order
            (String(a), String(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Array(a), Array(b)) => a.iter().cmp(b.iter()),
            (Object(a), Object(b)) => compare_objects(a, b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::output::to_json(self))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        i64::try_from(n).map_or(Value::Float(n as f64), Value::Integer)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::object(map)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::array(iter.into_iter().collect())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Value::object(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: &[(&str, Value)]) -> Value {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn test_type_rank_order() {
        let ordered = vec![
            Value::Null,
            Value::from(false),
            Value::from(true),
            Value::from(-3),
            Value::from(2.5),
            Value::from(""),
            Value::from("a"),
            Value::array(vec![]),
            obj(&[]),
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1], "{:?} < {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_mixed_numbers_compare_exactly() {
        assert_eq!(Value::from(3), Value::from(3.0));
        assert!(Value::from(3) < Value::from(3.000001));
        assert!(Value::from(-1.5) < Value::from(-1));
        assert_eq!(Value::from(0.0), Value::from(-0.0));
    }

    #[test]
    fn test_object_equality_ignores_key_order() {
        let a = obj(&[("x", Value::from(1)), ("y", Value::from(2))]);
        let b = obj(&[("y", Value::from(2)), ("x", Value::from(1))]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_object_order_uses_sorted_keys_then_values() {
        let a = obj(&[("a", Value::from(9))]);
        let b = obj(&[("b", Value::from(0))]);
        assert!(a < b);

        let c = obj(&[("b", Value::from(1)), ("a", Value::from(1))]);
        let d = obj(&[("a", Value::from(1)), ("b", Value::from(2))]);
        assert!(c < d);
    }

    #[test]
    fn test_array_order_is_elementwise_then_length() {
        let short = Value::from(vec![Value::from(1)]);
        let long = Value::from(vec![Value::from(1), Value::from(0)]);
        let bigger = Value::from(vec![Value::from(2)]);
        assert!(short < long);
        assert!(long < bigger);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(Value::from(0).is_truthy());
        assert!(Value::from("").is_truthy());
    }
}
