//! Streaming JSON reader.
//!
//! [`Documents`] pulls bytes from any [`BufRead`] source and yields one
//! [`Value`] per top-level JSON document. Documents may be separated by any
//! amount of whitespace (a single document, NDJSON, or concatenated values).
//!
//! # Error recovery
//!
//! A malformed document yields a [`SyntaxError`] carrying the byte offset of
//! the fault. What happens next depends on [`OnError`]:
//!
//! - [`OnError::Resync`] keeps reading. A malformed scalar is skipped up to
//!   the next whitespace. A malformed array, object or string skips ahead to
//!   the next line that starts (at column zero) with a byte that can begin a
//!   JSON value.
//! - [`OnError::Stop`] ends the stream.
//!
//! An I/O failure always ends the stream.
//!
//! # Streaming arrays
//!
//! [`Documents::elements`] yields the elements of a top-level array one at a
//! time instead of building the whole array first.
//!
//! # Duplicate keys
//!
//! When an object repeats a key, the last value wins and the key keeps the
//! position of its first occurrence.
//!
//! # Examples
//!
//! ```
//! use jqlite::reader::Documents;
//! use jqlite::Value;
//!
//! let docs: Vec<Value> = Documents::from_slice(b"1 [2]\n{\"a\": 3}")
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(docs.len(), 3);
//! ```

use std::io::{self, BufRead, BufReader, Read};

use tracing::{debug, warn};

use crate::{
    cancel::CancelToken,
    value::{Map, Value},
};

/// Malformed JSON input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("syntax error at byte {offset}: {message}")]
pub struct SyntaxError {
    /// Byte offset of the fault from the start of the stream
    pub offset: usize,
    pub message: String,
}

/// Failure while reading a document.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("read error: {0}")]
    Io(#[from] io::Error),
}

/// What the reader does after a malformed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnError {
    /// Skip to the next plausible document start and continue
    #[default]
    Resync,
    /// End the stream after reporting the error
    Stop,
}

#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    pub on_error: OnError,
    /// Maximum array/object nesting depth
    pub max_depth: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            on_error: OnError::Resync,
            max_depth: 512,
        }
    }
}

/// Byte cursor over a buffered source, tracking the absolute offset.
struct Cursor<R> {
    inner: R,
    offset: usize,
    prev: Option<u8>,
}

impl<R: BufRead> Cursor<R> {
    fn peek(&mut self) -> io::Result<Option<u8>> {
        loop {
            match self.inner.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn bump(&mut self, byte: u8) {
        self.inner.consume(1);
        self.offset += 1;
        self.prev = Some(byte);
    }

    fn next(&mut self) -> io::Result<Option<u8>> {
        let byte = self.peek()?;
        if let Some(b) = byte {
            self.bump(b);
        }
        Ok(byte)
    }

    fn at_line_start(&self) -> bool {
        self.prev == Some(b'\n')
    }
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_value_start(b: u8) -> bool {
    matches!(b, b'{' | b'[' | b'"' | b'-' | b'0'..=b'9' | b't' | b'f' | b'n')
}

fn describe(byte: Option<u8>) -> String {
    match byte {
        None => "end of input".to_string(),
        Some(b) if b.is_ascii_graphic() => format!("'{}'", b as char),
        Some(b) => format!("byte 0x{:02x}", b),
    }
}

/// Lazy iterator over the top-level JSON documents of a byte stream.
pub struct Documents<R> {
    cursor: Cursor<R>,
    options: ReaderOptions,
    cancel: Option<CancelToken>,
    done: bool,
    parsed: usize,
    /// I/O failure hit while recovering, yielded on the next pull
    pending: Option<io::Error>,
}

impl<'a> Documents<&'a [u8]> {
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Documents::new(bytes)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &'a str) -> Self {
        Documents::new(s.as_bytes())
    }
}

impl<R: Read> Documents<BufReader<R>> {
    pub fn from_reader(reader: R) -> Self {
        Documents::new(BufReader::new(reader))
    }
}

impl<R: BufRead> Documents<R> {
    pub fn new(reader: R) -> Self {
        Documents::with_options(reader, ReaderOptions::default())
    }

    pub fn with_options(reader: R, options: ReaderOptions) -> Self {
        Documents {
            cursor: Cursor {
                inner: reader,
                offset: 0,
                prev: None,
            },
            options,
            cancel: None,
            done: false,
            parsed: 0,
            pending: None,
        }
    }

    /// Stop reading at the next document boundary once `token` is cancelled.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Byte offset of the next unread byte.
    pub fn offset(&self) -> usize {
        self.cursor.offset
    }

    /// Collect every document into a single array.
    ///
    /// Fails on the first malformed document regardless of [`OnError`].
    pub fn slurp(mut self) -> Result<Value, ReadError> {
        self.options.on_error = OnError::Stop;
        let items = self.collect::<Result<Vec<_>, _>>()?;
        debug!(documents = items.len(), "slurped input");
        Ok(Value::array(items))
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, ReadError> {
        Err(SyntaxError {
            offset: self.cursor.offset,
            message: message.into(),
        }
        .into())
    }

    fn skip_whitespace(&mut self) -> io::Result<()> {
        while let Some(b) = self.cursor.peek()? {
            if !is_whitespace(b) {
                break;
            }
            self.cursor.bump(b);
        }
        Ok(())
    }

    fn expect_byte(&mut self, expected: u8) -> Result<(), ReadError> {
        match self.cursor.peek()? {
            Some(b) if b == expected => {
                self.cursor.bump(b);
                Ok(())
            }
            other => self.error(format!(
                "expected '{}', found {}",
                expected as char,
                describe(other)
            )),
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, ReadError> {
        match self.cursor.peek()? {
            Some(b'{') => self.parse_object(depth + 1),
            Some(b'[') => self.parse_array(depth + 1),
            Some(b'"') => Ok(Value::string(self.parse_string()?)),
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            Some(b't') => self.parse_literal("true", Value::Boolean(true)),
            Some(b'f') => self.parse_literal("false", Value::Boolean(false)),
            Some(b'n') => self.parse_literal("null", Value::Null),
            other => self.error(format!("expected a JSON value, found {}", describe(other))),
        }
    }

    fn check_depth(&self, depth: usize) -> Result<(), ReadError> {
        if depth > self.options.max_depth {
            return self.error(format!(
                "nesting exceeds maximum depth of {}",
                self.options.max_depth
            ));
        }
        Ok(())
    }

    fn parse_literal(&mut self, word: &str, value: Value) -> Result<Value, ReadError> {
        for expected in word.bytes() {
            match self.cursor.peek()? {
                Some(b) if b == expected => self.cursor.bump(b),
                other => {
                    return self.error(format!(
                        "invalid literal, expected '{}', found {}",
                        word,
                        describe(other)
                    ));
                }
            }
        }
        Ok(value)
    }

    fn parse_object(&mut self, depth: usize) -> Result<Value, ReadError> {
        self.check_depth(depth)?;
        self.expect_byte(b'{')?;
        let mut map = Map::new();

        self.skip_whitespace()?;
        if self.cursor.peek()? == Some(b'}') {
            self.cursor.bump(b'}');
            return Ok(Value::object(map));
        }

        loop {
            self.skip_whitespace()?;
            if self.cursor.peek()? != Some(b'"') {
                let found = self.cursor.peek()?;
                return self.error(format!("expected object key string, found {}", describe(found)));
            }
            let key = self.parse_string()?;
            self.skip_whitespace()?;
            self.expect_byte(b':')?;
            self.skip_whitespace()?;
            let value = self.parse_value(depth)?;
            // last value wins; IndexMap keeps the first position
            map.insert(key, value);

            self.skip_whitespace()?;
            match self.cursor.peek()? {
                Some(b',') => self.cursor.bump(b','),
                Some(b'}') => {
                    self.cursor.bump(b'}');
                    return Ok(Value::object(map));
                }
                other => {
                    return self.error(format!("expected ',' or '}}', found {}", describe(other)));
                }
            }
        }
    }

    fn parse_array(&mut self, depth: usize) -> Result<Value, ReadError> {
        self.check_depth(depth)?;
        self.expect_byte(b'[')?;
        let mut items = Vec::new();

        while let Some(item) = self.array_item(depth, items.is_empty())? {
            items.push(item);
        }
        Ok(Value::array(items))
    }

    /// Next element of an array whose `[` has been consumed, or `None` once
    /// its `]` has been.
    fn array_item(&mut self, depth: usize, first: bool) -> Result<Option<Value>, ReadError> {
        self.skip_whitespace()?;
        match self.cursor.peek()? {
            Some(b']') => {
                self.cursor.bump(b']');
                return Ok(None);
            }
            Some(b',') if !first => {
                self.cursor.bump(b',');
                self.skip_whitespace()?;
            }
            _ if first => {}
            other => {
                return self.error(format!("expected ',' or ']', found {}", describe(other)));
            }
        }
        self.parse_value(depth).map(Some)
    }

    fn parse_string(&mut self) -> Result<String, ReadError> {
        let start = self.cursor.offset;
        self.expect_byte(b'"')?;
        let mut bytes = Vec::new();

        loop {
            match self.cursor.next()? {
                None => return self.error("unterminated string"),
                Some(b'"') => break,
                Some(b'\\') => self.parse_escape(&mut bytes)?,
                Some(b) if b < 0x20 => {
                    return Err(SyntaxError {
                        offset: self.cursor.offset - 1,
                        message: format!("unescaped control character 0x{:02x} in string", b),
                    }
                    .into());
                }
                Some(b) => bytes.push(b),
            }
        }

        String::from_utf8(bytes).map_err(|_| {
            ReadError::Syntax(SyntaxError {
                offset: start,
                message: "invalid UTF-8 in string".to_string(),
            })
        })
    }

    fn parse_escape(&mut self, out: &mut Vec<u8>) -> Result<(), ReadError> {
        let ch = match self.cursor.next()? {
            Some(b'"') => '"',
            Some(b'\\') => '\\',
            Some(b'/') => '/',
            Some(b'b') => '\u{0008}',
            Some(b'f') => '\u{000c}',
            Some(b'n') => '\n',
            Some(b'r') => '\r',
            Some(b't') => '\t',
            Some(b'u') => self.parse_unicode_escape()?,
            other => return self.error(format!("invalid escape sequence, found {}", describe(other))),
        };
        let mut buf = [0u8; 4];
        out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        Ok(())
    }

    fn read_hex4(&mut self) -> Result<u32, ReadError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = match self.cursor.peek()? {
                Some(b) if b.is_ascii_hexdigit() => {
                    self.cursor.bump(b);
                    (b as char).to_digit(16).unwrap_or(0)
                }
                other => {
                    return self.error(format!("expected hex digit in \\u escape, found {}", describe(other)));
                }
            };
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn parse_unicode_escape(&mut self) -> Result<char, ReadError> {
        let high = self.read_hex4()?;
        let code = match high {
            0xD800..=0xDBFF => {
                if self.cursor.next()? != Some(b'\\') || self.cursor.next()? != Some(b'u') {
                    return self.error("unpaired high surrogate in \\u escape");
                }
                let low = self.read_hex4()?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return self.error("invalid low surrogate in \\u escape");
                }
                0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
            }
            0xDC00..=0xDFFF => return self.error("unpaired low surrogate in \\u escape"),
            code => code,
        };
        match char::from_u32(code) {
            Some(ch) => Ok(ch),
            None => self.error("invalid code point in \\u escape"),
        }
    }

    fn take_digits(&mut self, text: &mut String) -> io::Result<usize> {
        let mut count = 0;
        while let Some(b) = self.cursor.peek()? {
            if !b.is_ascii_digit() {
                break;
            }
            self.cursor.bump(b);
            text.push(b as char);
            count += 1;
        }
        Ok(count)
    }

    fn parse_number(&mut self) -> Result<Value, ReadError> {
        let start = self.cursor.offset;
        let mut text = String::new();
        let mut is_float = false;

        if self.cursor.peek()? == Some(b'-') {
            self.cursor.bump(b'-');
            text.push('-');
        }

        match self.cursor.peek()? {
            Some(b'0') => {
                self.cursor.bump(b'0');
                text.push('0');
                if self.cursor.peek()?.is_some_and(|b| b.is_ascii_digit()) {
                    return self.error("leading zeros are not allowed");
                }
            }
            Some(b'1'..=b'9') => {
                self.take_digits(&mut text)?;
            }
            other => return self.error(format!("expected digit, found {}", describe(other))),
        }

        if self.cursor.peek()? == Some(b'.') {
            self.cursor.bump(b'.');
            text.push('.');
            is_float = true;
            if self.take_digits(&mut text)? == 0 {
                let found = self.cursor.peek()?;
                return self.error(format!("expected digit after '.', found {}", describe(found)));
            }
        }

        if let Some(e @ (b'e' | b'E')) = self.cursor.peek()? {
            self.cursor.bump(e);
            text.push('e');
            is_float = true;
            if let Some(sign @ (b'+' | b'-')) = self.cursor.peek()? {
                self.cursor.bump(sign);
                text.push(sign as char);
            }
            if self.take_digits(&mut text)? == 0 {
                let found = self.cursor.peek()?;
                return self.error(format!("expected digit in exponent, found {}", describe(found)));
            }
        }

        if !is_float && let Ok(n) = text.parse::<i64>() {
            return Ok(Value::Integer(n));
        }

        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Value::Float(n)),
            _ => Err(SyntaxError {
                offset: start,
                message: format!("number out of range: {}", text),
            }
            .into()),
        }
    }

    /// Skip to the start of a line that begins with a value-start byte,
    /// past the start of the failed document.
    ///
    /// Returns `false` when the input ends first.
    fn resync(&mut self, failed_at: usize) -> io::Result<bool> {
        while let Some(b) = self.cursor.peek()? {
            if self.cursor.at_line_start() && is_value_start(b) && self.cursor.offset > failed_at {
                warn!(offset = self.cursor.offset, "resynchronized after syntax error");
                return Ok(true);
            }
            self.cursor.bump(b);
        }
        Ok(false)
    }

    /// Skip the rest of a malformed scalar up to the next whitespace.
    fn skip_token(&mut self) -> io::Result<bool> {
        while let Some(b) = self.cursor.peek()? {
            if is_whitespace(b) {
                warn!(offset = self.cursor.offset, "skipped malformed token");
                return Ok(true);
            }
            self.cursor.bump(b);
        }
        Ok(false)
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Move to the first byte of the next document.
    ///
    /// `None` at the end of input, after cancellation, or once the stream
    /// has stopped.
    fn start_document(&mut self) -> Option<Result<u8, ReadError>> {
        if let Some(e) = self.pending.take() {
            self.done = true;
            return Some(Err(e.into()));
        }
        if self.done {
            return None;
        }
        if self.cancelled() {
            debug!(documents = self.parsed, "input closed early");
            self.done = true;
            return None;
        }

        if let Err(e) = self.skip_whitespace() {
            self.done = true;
            return Some(Err(e.into()));
        }
        match self.cursor.peek() {
            Ok(Some(b)) => Some(Ok(b)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }

    fn read_document(&mut self, first: u8) -> Result<Value, ReadError> {
        let start = self.cursor.offset;
        match self.parse_value(0) {
            Ok(value) => {
                self.parsed += 1;
                debug!(offset = start, "parsed document");
                Ok(value)
            }
            Err(err) => Err(self.recover(start, first, err)),
        }
    }

    /// Apply [`OnError`] after the document starting at `start` failed.
    ///
    /// A malformed scalar is skipped up to the next whitespace, so later
    /// documents on the same line survive. A malformed container or string
    /// resynchronizes at the next line that can start a value.
    fn recover(&mut self, start: usize, first: u8, err: ReadError) -> ReadError {
        if !matches!(err, ReadError::Syntax(_)) {
            self.done = true;
            return err;
        }
        if self.options.on_error == OnError::Stop {
            self.done = true;
            return err;
        }

        let resumed = match first {
            b'[' | b'{' | b'"' => self.resync(start),
            _ => self.skip_token(),
        };
        match resumed {
            Ok(true) => {}
            Ok(false) => self.done = true,
            // reported on the next pull
            Err(e) => self.pending = Some(e),
        }
        err
    }

    /// Stream the elements of top-level arrays instead of whole documents.
    ///
    /// Any other top-level document is still read whole.
    pub fn elements(self) -> Elements<R> {
        self.elements_if(true)
    }

    pub(crate) fn elements_if(self, stream_arrays: bool) -> Elements<R> {
        Elements {
            docs: self,
            stream_arrays,
            open: None,
            skipping: false,
        }
    }
}

impl<R: BufRead> Iterator for Documents<R> {
    type Item = Result<Value, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = match self.start_document()? {
            Ok(first) => first,
            Err(e) => return Some(Err(e)),
        };
        Some(self.read_document(first))
    }
}

/// Item of [`Elements`].
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// One element of a top-level array
    Item(Value),
    /// A top-level document that is not an array
    Document(Value),
}

/// Top-level array being streamed.
#[derive(Debug, Clone, Copy)]
struct OpenArray {
    start: usize,
    first: bool,
}

/// Lazy iterator that yields the elements of each top-level array as they
/// are parsed, so only one element is held in memory at a time.
///
/// # Examples
///
/// ```
/// use jqlite::reader::{Documents, Element};
/// use jqlite::Value;
///
/// let mut elements = Documents::from_str("[1, 2] 3").elements();
/// assert_eq!(elements.next().unwrap().unwrap(), Element::Item(Value::Integer(1)));
/// assert_eq!(elements.next().unwrap().unwrap(), Element::Item(Value::Integer(2)));
/// assert_eq!(elements.next().unwrap().unwrap(), Element::Document(Value::Integer(3)));
/// assert!(elements.next().is_none());
/// ```
pub struct Elements<R> {
    docs: Documents<R>,
    stream_arrays: bool,
    open: Option<OpenArray>,
    skipping: bool,
}

impl<R: BufRead> Elements<R> {
    /// Parse and discard what is left of the array being streamed.
    pub fn skip_document(&mut self) {
        if self.open.is_some() {
            self.skipping = true;
        }
    }
}

impl<R: BufRead> Iterator for Elements<R> {
    type Item = Result<Element, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(open) = self.open.as_mut() {
                if self.docs.cancelled() {
                    debug!(documents = self.docs.parsed, "input closed early");
                    self.docs.done = true;
                    self.open = None;
                    return None;
                }
                let OpenArray { start, first } = *open;
                open.first = false;

                match self.docs.array_item(1, first) {
                    Ok(Some(_)) if self.skipping => {}
                    Ok(Some(item)) => return Some(Ok(Element::Item(item))),
                    Ok(None) => {
                        self.open = None;
                        self.skipping = false;
                        self.docs.parsed += 1;
                        debug!(offset = start, "streamed document");
                    }
                    Err(err) => {
                        self.open = None;
                        self.skipping = false;
                        return Some(Err(self.docs.recover(start, b'[', err)));
                    }
                }
                continue;
            }

            let first = match self.docs.start_document()? {
                Ok(first) => first,
                Err(e) => return Some(Err(e)),
            };
            if first != b'[' || !self.stream_arrays {
                return Some(self.docs.read_document(first).map(Element::Document));
            }

            let start = self.docs.cursor.offset;
            if let Err(err) = self.docs.check_depth(1) {
                return Some(Err(self.docs.recover(start, first, err)));
            }
            self.docs.cursor.bump(b'[');
            self.open = Some(OpenArray { start, first: true });
        }
    }
}
