//! Lazy, pull-based evaluation of compiled filters.
//!
//! Running a [`Filter`] against one input yields a [`ValueStream`]: a boxed
//! iterator that computes outputs only as they are pulled. A pipe is a
//! flat-map, so `.[] | select(...)` never holds more than the input array and
//! the element currently in flight.
//!
//! Barrier nodes buffer: `sort_by`, `min_by`, `max_by` work on a complete
//! array, and array construction drains its inner stream.

use std::iter;

use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use tracing::trace;

use crate::{
    ast::{ArithOp, Filter},
    value::{Map, Value},
};

/// Lazy stream of filter outputs, consumed once, front to back.
pub type ValueStream<'a> = Box<dyn Iterator<Item = Result<Value, EvalError>> + 'a>;

/// Errors that can occur during filter evaluation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// Operation applied to a value of the wrong type
    #[error("type error: {0}")]
    TypeError(String),

    /// Division or modulo by zero
    #[error("{0} cannot be divided by zero")]
    DivisionByZero(String),
}

fn type_error<T>(message: String) -> Result<T, EvalError> {
    Err(EvalError::TypeError(message))
}

fn once<'a>(item: Result<Value, EvalError>) -> ValueStream<'a> {
    Box::new(iter::once(item))
}

fn empty<'a>() -> ValueStream<'a> {
    Box::new(iter::empty())
}

/// Defer building a stream until it is first pulled.
fn lazy<'a, F>(build: F) -> ValueStream<'a>
where
    F: FnOnce() -> ValueStream<'a> + 'a,
{
    Box::new(iter::once_with(build).flatten())
}

impl Filter {
    /// Run the filter against a single input.
    ///
    /// # Examples
    ///
    /// ```
    /// use jqlite::{compile, Value};
    ///
    /// let filter = compile(".[] | select(. >= 2)").unwrap();
    /// let input = Value::from(vec![Value::from(1), Value::from(2), Value::from(3)]);
    ///
    /// let out: Vec<Value> = filter.run(input).collect::<Result<_, _>>().unwrap();
    /// assert_eq!(out, vec![Value::from(2), Value::from(3)]);
    /// ```
    pub fn run(&self, input: Value) -> ValueStream<'_> {
        eval(self, input)
    }

    /// Run what follows the leading `.[]` of the filter on one element of
    /// the iterated input.
    ///
    /// Feeding every element of `input` through this yields the same stream
    /// as [`run`](Filter::run) on `input`, when
    /// [`starts_with_iterate`](Filter::starts_with_iterate) holds.
    pub fn run_element(&self, element: Value) -> ValueStream<'_> {
        match self {
            Filter::Iterate => once(Ok(element)),
            Filter::Pipe(left, right) if left.starts_with_iterate() => {
                pipe(left.run_element(element), right)
            }
            other => eval(other, element),
        }
    }

    /// First output of the filter, if any.
    pub fn first(&self, input: Value) -> Result<Option<Value>, EvalError> {
        self.run(input).next().transpose()
    }

    /// First output, or `null` when the filter emits nothing.
    fn first_or_null(&self, input: Value) -> Result<Value, EvalError> {
        Ok(self.first(input)?.unwrap_or(Value::Null))
    }
}

/// Run `filter` against every value of `inputs`, concatenating the outputs.
pub fn evaluate<'a, I>(filter: &'a Filter, inputs: I) -> ValueStream<'a>
where
    I: IntoIterator<Item = Value>,
    I::IntoIter: 'a,
{
    Box::new(inputs.into_iter().flat_map(move |input| eval(filter, input)))
}

fn pipe<'a>(left: ValueStream<'a>, right: &'a Filter) -> ValueStream<'a> {
    Box::new(left.flat_map(move |item| match item {
        Ok(value) => eval(right, value),
        Err(e) => once(Err(e)),
    }))
}

pub fn eval(filter: &Filter, input: Value) -> ValueStream<'_> {
    match filter {
        Filter::Identity => once(Ok(input)),
        Filter::Literal(value) => once(Ok(value.clone())),
        Filter::Field(name) => once(field(&input, name)),
        Filter::Index(index) => Box::new(
            eval(index, input.clone()).map(move |key| key.and_then(|key| index_value(&input, &key))),
        ),
        Filter::Slice { start, end } => once(eval_slice(&input, start.as_deref(), end.as_deref())),
        Filter::Iterate => iterate(input),
        Filter::Object(entries) => once(construct_object(entries, &input)),
        Filter::Array(None) => once(Ok(Value::array(vec![]))),
        Filter::Array(Some(inner)) => {
            once(eval(inner, input).collect::<Result<Vec<_>, _>>().map(Value::array))
        }
        Filter::Pipe(left, right) => pipe(eval(left, input), right),
        Filter::Comma(left, right) => {
            let deferred = input.clone();
            Box::new(eval(left, input).chain(lazy(move || eval(right, deferred))))
        }
        Filter::Select(predicate) => select(predicate, input),
        Filter::SortBy(key) => once(sort_by(key, &input)),
        Filter::MinBy(key) => once(extreme_by(key, &input, "min_by", |candidate, best| candidate < best)),
        Filter::MaxBy(key) => once(extreme_by(key, &input, "max_by", |candidate, best| candidate > best)),
        Filter::Length => once(length(&input)),
        Filter::Keys => once(keys(&input)),
        Filter::Comparison { op, left, right } => {
            let op = *op;
            binary(left, right, input, move |l, r| Ok(Value::Boolean(op.apply(l, r))))
        }
        Filter::Arithmetic { op, left, right } => {
            let op = *op;
            binary(left, right, input, move |l, r| arithmetic(op, l, r))
        }
        Filter::And(left, right) => logical(left, right, input, false),
        Filter::Or(left, right) => logical(left, right, input, true),
        Filter::Not => once(Ok(Value::Boolean(!input.is_truthy()))),
        Filter::Type => once(Ok(Value::from(input.type_name()))),
        Filter::Empty => empty(),
        Filter::Test(pattern) => once(match &input {
            Value::String(s) => Ok(Value::Boolean(pattern.is_match(s))),
            other => type_error(format!("{} cannot be matched, as it is not a string", other.type_name())),
        }),
    }
}

fn field(input: &Value, name: &str) -> Result<Value, EvalError> {
    match input {
        Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
        other => type_error(format!("cannot index {} with {:?}", other.type_name(), name)),
    }
}

/// Resolve a possibly negative index against `len`.
fn abs_index(index: i64, len: usize) -> Option<usize> {
    if index < 0 {
        let back = usize::try_from(index.unsigned_abs()).ok()?;
        len.checked_sub(back)
    } else {
        usize::try_from(index).ok().filter(|i| *i < len)
    }
}

fn index_value(input: &Value, key: &Value) -> Result<Value, EvalError> {
    match (input, key) {
        (Value::Array(items), key) if key.is_number() => {
            let Some(index) = key.as_int() else {
                return Ok(Value::Null);
            };
            Ok(abs_index(index, items.len())
                .map(|i| items[i].clone())
                .unwrap_or(Value::Null))
        }
        (Value::Object(_), Value::String(name)) => field(input, name),
        (Value::Object(_), key) => type_error(format!(
            "cannot index object with {}",
            key.type_name()
        )),
        (Value::Array(_), key) => type_error(format!(
            "cannot index array with {}",
            key.type_name()
        )),
        (other, key) => type_error(format!(
            "cannot index {} with {}",
            other.type_name(),
            key.type_name()
        )),
    }
}

/// Clamp a slice bound into `0..=len`.
fn slice_bound(bound: Option<i64>, len: usize, default: usize) -> usize {
    match bound {
        None => default,
        Some(b) if b < 0 => len.saturating_sub(usize::try_from(b.unsigned_abs()).unwrap_or(usize::MAX)),
        Some(b) => usize::try_from(b).unwrap_or(usize::MAX).min(len),
    }
}

fn eval_bound(bound: Option<&Filter>, input: &Value) -> Result<Option<i64>, EvalError> {
    let Some(bound) = bound else {
        return Ok(None);
    };
    match bound.first_or_null(input.clone())? {
        Value::Null => Ok(None),
        value => match value.as_int() {
            Some(n) => Ok(Some(n)),
            None => type_error(format!(
                "start and end indices of a slice must be numbers, not {}",
                value.type_name()
            )),
        },
    }
}

fn eval_slice(input: &Value, start: Option<&Filter>, end: Option<&Filter>) -> Result<Value, EvalError> {
    let from = eval_bound(start, input)?;
    let upto = eval_bound(end, input)?;

    match input {
        Value::Array(items) => {
            let len = items.len();
            let (from, upto) = (slice_bound(from, len, 0), slice_bound(upto, len, len));
            Ok(Value::array(items[from..upto.max(from)].to_vec()))
        }
        Value::String(s) => {
            let len = s.chars().count();
            let (from, upto) = (slice_bound(from, len, 0), slice_bound(upto, len, len));
            let taken = upto.saturating_sub(from);
            Ok(Value::string(s.chars().skip(from).take(taken).collect::<String>()))
        }
        other => type_error(format!("cannot slice {}", other.type_name())),
    }
}

fn iterate<'a>(input: Value) -> ValueStream<'a> {
    match input {
        Value::Array(items) => {
            Box::new((0..items.len()).map(move |i| Ok::<_, EvalError>(items[i].clone())))
        }
        Value::Object(map) => Box::new((0..map.len()).filter_map(move |i| {
            map.get_index(i).map(|(_, v)| Ok::<_, EvalError>(v.clone()))
        })),
        other => once(type_error(format!("cannot iterate over {}", other.type_name()))),
    }
}

fn construct_object(entries: &[(String, Filter)], input: &Value) -> Result<Value, EvalError> {
    let mut map = Map::with_capacity(entries.len());
    for (key, filter) in entries {
        let value = filter.first_or_null(input.clone())?;
        map.insert(key.clone(), value);
    }
    Ok(Value::object(map))
}

fn select<'a>(predicate: &'a Filter, input: Value) -> ValueStream<'a> {
    match predicate.first(input.clone()) {
        Ok(Some(Value::Boolean(true))) => once(Ok(input)),
        Ok(Some(Value::Boolean(false)) | None) => empty(),
        Ok(Some(other)) => once(type_error(format!(
            "select predicate must produce a boolean, got {}",
            other.type_name()
        ))),
        Err(e) => once(Err(e)),
    }
}

fn barrier_input<'v>(input: &'v Value, name: &str) -> Result<&'v [Value], EvalError> {
    match input {
        Value::Array(items) => Ok(items),
        other => type_error(format!("{} requires an array, got {}", name, other.type_name())),
    }
}

fn sort_by(key: &Filter, input: &Value) -> Result<Value, EvalError> {
    let items = barrier_input(input, "sort_by")?;
    trace!(elements = items.len(), "sort_by barrier");

    let mut keyed = items
        .iter()
        .map(|item| Ok((key.first_or_null(item.clone())?, item)))
        .collect::<Result<Vec<_>, EvalError>>()?;
    // stable: equal keys keep their input order
    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));

    Ok(keyed.into_iter().map(|(_, item)| item.clone()).collect())
}

/// Element whose key wins `better` against every earlier candidate.
///
/// `better` is strict, so ties go to the first occurrence.
fn extreme_by(
    key: &Filter,
    input: &Value,
    name: &str,
    better: fn(&Value, &Value) -> bool,
) -> Result<Value, EvalError> {
    let items = barrier_input(input, name)?;
    trace!(elements = items.len(), "{} barrier", name);

    let mut best: Option<(Value, &Value)> = None;
    for item in items {
        let k = key.first_or_null(item.clone())?;
        let replace = match &best {
            Some((best_key, _)) => better(&k, best_key),
            None => true,
        };
        if replace {
            best = Some((k, item));
        }
    }
    Ok(best.map(|(_, item)| item.clone()).unwrap_or(Value::Null))
}

fn length(input: &Value) -> Result<Value, EvalError> {
    match input {
        Value::Null => Ok(Value::Integer(0)),
        Value::Boolean(_) => type_error("boolean has no length".to_string()),
        Value::Integer(n) => Ok(n
            .checked_abs()
            .map_or(Value::Float((*n as f64).abs()), Value::Integer)),
        Value::Float(n) => Ok(Value::Float(n.abs())),
        Value::String(s) => Ok(Value::from(s.chars().count())),
        Value::Array(items) => Ok(Value::from(items.len())),
        Value::Object(map) => Ok(Value::from(map.len())),
    }
}

fn keys(input: &Value) -> Result<Value, EvalError> {
    match input {
        Value::Object(map) => {
            let mut names: Vec<&String> = map.keys().collect();
            names.sort();
            Ok(names.into_iter().map(|k| Value::from(k.as_str())).collect())
        }
        other => type_error(format!("{} has no keys", other.type_name())),
    }
}

/// Cartesian evaluation: for each output of `left`, for each output of `right`.
fn binary<'a, F>(left: &'a Filter, right: &'a Filter, input: Value, apply: F) -> ValueStream<'a>
where
    F: Fn(&Value, &Value) -> Result<Value, EvalError> + Copy + 'a,
{
    let rhs_input = input.clone();
    Box::new(eval(left, input).flat_map(move |l| match l {
        Ok(l) => Box::new(
            eval(right, rhs_input.clone()).map(move |r| r.and_then(|r| apply(&l, &r))),
        ) as ValueStream<'a>,
        Err(e) => once(Err(e)),
    }))
}

/// `and` (`short_on = false`) / `or` (`short_on = true`), short-circuiting.
fn logical<'a>(left: &'a Filter, right: &'a Filter, input: Value, short_on: bool) -> ValueStream<'a> {
    let rhs_input = input.clone();
    Box::new(eval(left, input).flat_map(move |l| match l {
        Ok(l) if l.is_truthy() == short_on => once(Ok(Value::Boolean(short_on))),
        Ok(_) => Box::new(
            eval(right, rhs_input.clone()).map(|r| r.map(|r| Value::Boolean(r.is_truthy()))),
        ),
        Err(e) => once(Err(e)),
    }))
}

fn arithmetic(op: ArithOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (op, left, right) {
        (_, l, r) if l.is_number() && r.is_number() => numeric(op, l, r),
        (ArithOp::Add, Value::Null, other) | (ArithOp::Add, other, Value::Null) => Ok(other.clone()),
        (ArithOp::Add, Value::String(a), Value::String(b)) => Ok(Value::string(format!("{}{}", a, b))),
        (ArithOp::Add, Value::Array(a), Value::Array(b)) => {
            Ok(a.iter().chain(b.iter()).cloned().collect())
        }
        (ArithOp::Add, Value::Object(a), Value::Object(b)) => {
            let mut merged = (**a).clone();
            for (k, v) in b.iter() {
                merged.insert(k.clone(), v.clone());
            }
            Ok(Value::object(merged))
        }
        (ArithOp::Subtract, Value::Array(a), Value::Array(b)) => {
            Ok(a.iter().filter(|item| !b.contains(*item)).cloned().collect())
        }
        (op, l, r) => type_error(format!(
            "{} and {} cannot be combined with '{}'",
            l.type_name(),
            r.type_name(),
            op.symbol()
        )),
    }
}

fn numeric(op: ArithOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => integer_op(op, *a, *b),
        (Value::Float(a), Value::Float(b)) => float_op(op, *a, *b),
        _ => mixed_op(op, left, right),
    }
}

fn division_by_zero<T>(left: &Value) -> Result<T, EvalError> {
    Err(EvalError::DivisionByZero(left.to_string()))
}

fn integer_op(op: ArithOp, a: i64, b: i64) -> Result<Value, EvalError> {
    let exact = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Subtract => a.checked_sub(b),
        ArithOp::Multiply => a.checked_mul(b),
        ArithOp::Divide => {
            if b == 0 {
                return division_by_zero(&Value::Integer(a));
            }
            if a.checked_rem(b) == Some(0) {
                a.checked_div(b)
            } else {
                None
            }
        }
        ArithOp::Modulo => {
            if b == 0 {
                return division_by_zero(&Value::Integer(a));
            }
            return Ok(Value::Integer(a.wrapping_rem(b)));
        }
    };
    match exact {
        Some(n) => Ok(Value::Integer(n)),
        None => float_op(op, a as f64, b as f64),
    }
}

fn float_op(op: ArithOp, a: f64, b: f64) -> Result<Value, EvalError> {
    let result = match op {
        ArithOp::Add => a + b,
        ArithOp::Subtract => a - b,
        ArithOp::Multiply => a * b,
        ArithOp::Divide => {
            if b == 0.0 {
                return division_by_zero(&Value::Float(a));
            }
            a / b
        }
        ArithOp::Modulo => {
            let (ai, bi) = (a as i64, b as i64);
            if bi == 0 {
                return division_by_zero(&Value::Float(a));
            }
            return Ok(Value::Integer(ai.wrapping_rem(bi)));
        }
    };
    Ok(Value::Float(result))
}

fn to_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Integer(n) => Some(Decimal::from(*n)),
        Value::Float(n) => Decimal::from_f64(*n),
        _ => None,
    }
}

/// Integer/float arithmetic through `Decimal`, so `0.1 + 2` is `2.1` and
/// `1.5 * 2` is the integer `3`.
fn mixed_op(op: ArithOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if let (Some(a), Some(b)) = (to_decimal(left), to_decimal(right)) {
        let exact = match op {
            ArithOp::Add => a.checked_add(b),
            ArithOp::Subtract => a.checked_sub(b),
            ArithOp::Multiply => a.checked_mul(b),
            ArithOp::Divide if b.is_zero() => return division_by_zero(left),
            ArithOp::Divide => a.checked_div(b),
            ArithOp::Modulo => None,
        };
        if let Some(rd) = exact {
            if rd.is_integer()
                && let Some(r) = rd.to_i64()
            {
                return Ok(Value::Integer(r));
            } else if let Some(r) = rd.to_f64() {
                return Ok(Value::Float(r));
            }
        }
    }
    // both are numbers by construction
    let a = left.as_float().unwrap_or(f64::NAN);
    let b = right.as_float().unwrap_or(f64::NAN);
    float_op(op, a, b)
}
