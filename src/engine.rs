//! Top-level driver: documents in, filter outputs out.
//!
//! [`Engine`] pulls one input at a time from its [`Source`], runs the filter
//! on it, and yields that input's outputs before reading the next one. An
//! error (malformed document or failed evaluation) is yielded in place of the
//! rest of that document's outputs; the engine then moves on to the next
//! document.
//!
//! When the filter starts with `.[]`, [`Engine::streaming`] feeds it the
//! elements of each top-level array as they are parsed, so a huge array is
//! never held in memory at once.

use std::io::BufRead;

use tracing::{debug, trace};

use crate::{
    ast::Filter,
    cancel::CancelToken,
    evaluator::{EvalError, ValueStream},
    parser::ParseError,
    reader::{Documents, Element, Elements, ReadError},
    value::Value,
};
/// Any failure surfaced by the library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Where an [`Engine`] pulls its inputs from.
pub trait Source {
    fn pull(&mut self) -> Option<Result<Element, ReadError>>;

    /// Drop what is left of the current document after an evaluation error.
    fn skip_document(&mut self) {}
}

/// Whole documents from any iterator.
pub struct WholeDocuments<I>(I);

impl<I> Source for WholeDocuments<I>
where
    I: Iterator<Item = Result<Value, ReadError>>,
{
    fn pull(&mut self) -> Option<Result<Element, ReadError>> {
        self.0.next().map(|document| document.map(Element::Document))
    }
}

impl<R: BufRead> Source for Elements<R> {
    fn pull(&mut self) -> Option<Result<Element, ReadError>> {
        self.next()
    }

    fn skip_document(&mut self) {
        Elements::skip_document(self);
    }
}

/// Lazy output stream of a filter applied to a stream of documents.
///
/// # Examples
///
/// ```
/// use jqlite::{compile, Engine, Value};
/// use jqlite::reader::Documents;
///
/// let filter = compile(".name").unwrap();
/// let docs = Documents::from_str("{\"name\": \"a\"}\n{\"name\": \"b\"}");
///
/// let names: Vec<Value> = Engine::new(&filter, docs)
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(names, vec![Value::from("a"), Value::from("b")]);
/// ```
pub struct Engine<'f, S> {
    filter: &'f Filter,
    inputs: S,
    current: Option<ValueStream<'f>>,
    /// `current` came from one element of a streamed array
    in_element: bool,
    cancel: CancelToken,
    pulled: usize,
}

impl<'f, I> Engine<'f, WholeDocuments<I>>
where
    I: Iterator<Item = Result<Value, ReadError>>,
{
    pub fn new(filter: &'f Filter, inputs: I) -> Self {
        Engine::from_source(filter, WholeDocuments(inputs))
    }
}

impl<'f, R: BufRead> Engine<'f, Elements<R>> {
    /// Read documents from `docs`, streaming each top-level array element by
    /// element when the filter starts with `.[]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use jqlite::{compile, Engine, Value};
    /// use jqlite::reader::Documents;
    ///
    /// let filter = compile(".[] | .n").unwrap();
    /// let docs = Documents::from_str("[{\"n\": 1}, {\"n\": 2}]");
    ///
    /// let out: Vec<Value> = Engine::streaming(&filter, docs)
    ///     .collect::<Result<_, _>>()
    ///     .unwrap();
    /// assert_eq!(out, vec![Value::from(1), Value::from(2)]);
    /// ```
    pub fn streaming(filter: &'f Filter, docs: Documents<R>) -> Self {
        Engine::from_source(filter, docs.elements_if(filter.starts_with_iterate()))
    }
}

impl<'f, S: Source> Engine<'f, S> {
    pub fn from_source(filter: &'f Filter, inputs: S) -> Self {
        Engine {
            filter,
            inputs,
            current: None,
            in_element: false,
            cancel: CancelToken::new(),
            pulled: 0,
        }
    }

    /// Stop emitting as soon as `cancel` is set.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Number of inputs pulled so far: whole documents, or elements of
    /// streamed arrays.
    pub fn pulled(&self) -> usize {
        self.pulled
    }
}

impl<'f, S: Source> Iterator for Engine<'f, S> {
    type Item = Result<Value, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.cancel.is_cancelled() {
                if self.current.take().is_some() {
                    debug!(pulled = self.pulled, "evaluation cancelled");
                }
                return None;
            }

            if let Some(stream) = self.current.as_mut() {
                match stream.next() {
                    Some(Ok(value)) => return Some(Ok(value)),
                    Some(Err(e)) => {
                        // errors abort the rest of this document
                        self.current = None;
                        if self.in_element {
                            self.inputs.skip_document();
                        }
                        return Some(Err(e.into()));
                    }
                    None => self.current = None,
                }
            }

            let filter = self.filter;
            match self.inputs.pull()? {
                Ok(Element::Document(document)) => {
                    self.pulled += 1;
                    trace!(pulled = self.pulled, "evaluating document");
                    self.in_element = false;
                    self.current = Some(filter.run(document));
                }
                Ok(Element::Item(item)) => {
                    self.pulled += 1;
                    trace!(pulled = self.pulled, "evaluating array element");
                    self.in_element = true;
                    self.current = Some(filter.run_element(item));
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Run `filter` against already-parsed values.
pub fn run<'f, I>(
    filter: &'f Filter,
    values: I,
) -> Engine<'f, WholeDocuments<impl Iterator<Item = Result<Value, ReadError>>>>
where
    I: IntoIterator<Item = Value>,
{
    Engine::new(filter, values.into_iter().map(Ok::<Value, ReadError>))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compile, reader::Documents};

    #[test]
    fn test_type_error_skips_rest_of_document_only() {
        let filter = compile(".[] | .a").unwrap();
        let docs = Documents::from_str("[{\"a\": 1}, 2, {\"a\": 3}]\n[{\"a\": 4}]");
        let out: Vec<_> = Engine::new(&filter, docs).collect();

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].as_ref().unwrap(), &Value::from(1));
        assert!(matches!(out[1], Err(Error::Eval(EvalError::TypeError(_)))));
        assert_eq!(out[2].as_ref().unwrap(), &Value::from(4));
    }

    #[test]
    fn test_streamed_type_error_skips_rest_of_array() {
        let filter = compile(".[] | .a").unwrap();
        let docs = Documents::from_str("[{\"a\": 1}, 2, {\"a\": 3}]\n[{\"a\": 4}]");
        let out: Vec<_> = Engine::streaming(&filter, docs).collect();

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].as_ref().unwrap(), &Value::from(1));
        assert!(matches!(out[1], Err(Error::Eval(EvalError::TypeError(_)))));
        assert_eq!(out[2].as_ref().unwrap(), &Value::from(4));
    }

    #[test]
    fn test_streaming_matches_whole_documents() {
        let input = "[{\"n\": [1, 2]}, {\"n\": [3]}]\n{\"k\": 5}\n7\n[]";
        for source in [".[] | .n | .[]", ".[].n[]", ".[] | {n} | .n[0]", ".[0]", "."] {
            let filter = compile(source).unwrap();
            let whole: Vec<String> = Engine::new(&filter, Documents::from_str(input))
                .map(|r| r.map(|v| v.to_string()).unwrap_or_else(|e| e.to_string()))
                .collect();
            let streamed: Vec<String> = Engine::streaming(&filter, Documents::from_str(input))
                .map(|r| r.map(|v| v.to_string()).unwrap_or_else(|e| e.to_string()))
                .collect();
            assert_eq!(whole, streamed, "{}", source);
        }
    }

    #[test]
    fn test_cancel_stops_output() {
        let filter = compile(".[]").unwrap();
        let cancel = CancelToken::new();
        let docs = Documents::from_str("[1, 2, 3]").with_cancel(cancel.clone());
        let mut engine = Engine::streaming(&filter, docs).with_cancel(cancel.clone());

        assert_eq!(engine.next().unwrap().unwrap(), Value::from(1));
        cancel.cancel();
        assert!(engine.next().is_none());
    }
}
