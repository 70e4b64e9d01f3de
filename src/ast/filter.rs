use std::fmt;

use regex::Regex;

use crate::{
    ast::{ArithOp, CompareOp},
    value::Value,
};

/// Compiled filter pipeline.
///
/// A `Filter` is built once by the [`parser`](crate::parser) and never
/// mutated afterwards; the same value can be run against any number of
/// inputs, from any number of threads.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Identity (`.`)
    Identity,

    /// Object field access
    ///
    /// # Examples
    /// ```text
    /// .foo
    /// .["foo"]
    /// ```
    Field(String),

    /// Computed index (`.[n]`, `.[expr]`)
    ///
    /// Numbers index arrays, strings index objects.
    Index(Box<Filter>),

    /// Slice of an array or string (`.[n:m]`, `.[:m]`, `.[n:]`)
    Slice {
        start: Option<Box<Filter>>,
        end: Option<Box<Filter>>,
    },

    /// Iterate array elements or object values (`.[]`)
    Iterate,

    /// Object construction
    ///
    /// # Examples
    /// ```text
    /// {fc, birthYear}
    /// {name: .fc, born: .birthYear}
    /// ```
    Object(Vec<(String, Filter)>),

    /// Array construction (`[expr]`, `[]` when empty)
    Array(Option<Box<Filter>>),

    /// Pipe (`left | right`)
    Pipe(Box<Filter>, Box<Filter>),

    /// Concatenation of two output streams (`left, right`)
    Comma(Box<Filter>, Box<Filter>),

    /// `select(predicate)`
    Select(Box<Filter>),

    /// `sort_by(key)`
    SortBy(Box<Filter>),

    /// `min_by(key)`
    MinBy(Box<Filter>),

    /// `max_by(key)`
    MaxBy(Box<Filter>),

    /// `length`
    Length,

    /// `keys`
    Keys,

    /// Comparison (`==`, `!=`, `<`, `<=`, `>`, `>=`)
    Comparison {
        op: CompareOp,
        left: Box<Filter>,
        right: Box<Filter>,
    },

    /// Arithmetic (`+`, `-`, `*`, `/`, `%`)
    Arithmetic {
        op: ArithOp,
        left: Box<Filter>,
        right: Box<Filter>,
    },

    /// Logical AND (`and`)
    And(Box<Filter>, Box<Filter>),

    /// Logical OR (`or`)
    Or(Box<Filter>, Box<Filter>),

    /// `not`
    Not,

    /// `type`
    Type,

    /// `empty`
    Empty,

    /// `test("regex")`
    Test(Pattern),

    /// Literal value
    Literal(Value),
}

impl Filter {
    pub fn pipe(left: Filter, right: Filter) -> Filter {
        Filter::Pipe(Box::new(left), Box::new(right))
    }

    pub fn comma(left: Filter, right: Filter) -> Filter {
        Filter::Comma(Box::new(left), Box::new(right))
    }

    pub fn field(name: impl Into<String>) -> Filter {
        Filter::Field(name.into())
    }

    /// Height of the tree, counting a leaf as 1.
    ///
    /// Walks with an explicit stack, so it is safe on any tree.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((node, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(node.children().into_iter().map(|child| (child, depth + 1)));
        }
        deepest
    }

    /// True for `.[]` and for pipelines whose first stage is `.[]`.
    pub fn starts_with_iterate(&self) -> bool {
        let mut node = self;
        loop {
            match node {
                Filter::Iterate => return true,
                Filter::Pipe(left, _) => node = left,
                _ => return false,
            }
        }
    }

    fn children(&self) -> Vec<&Filter> {
        match self {
            Filter::Index(inner)
            | Filter::Select(inner)
            | Filter::SortBy(inner)
            | Filter::MinBy(inner)
            | Filter::MaxBy(inner)
            | Filter::Array(Some(inner)) => vec![&**inner],
            Filter::Slice { start, end } => {
                start.as_deref().into_iter().chain(end.as_deref()).collect()
            }
            Filter::Object(entries) => entries.iter().map(|(_, value)| value).collect(),
            Filter::Pipe(left, right)
            | Filter::Comma(left, right)
            | Filter::And(left, right)
            | Filter::Or(left, right)
            | Filter::Comparison { left, right, .. }
            | Filter::Arithmetic { left, right, .. } => vec![&**left, &**right],
            _ => vec![],
        }
    }
}

/// A regular expression compiled at filter compile time.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Pattern)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.0.is_match(haystack)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.as_str())
    }
}
