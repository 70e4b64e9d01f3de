//! JSON output serialization.
//!
//! This module renders [`Value`]s as JSON text, either compact or
//! pretty-printed, and provides an [`Emitter`] that writes one document per
//! line to any byte sink.
//!
//! # Features
//!
//! - **Compact output** via [`to_json()`] - no insignificant whitespace
//! - **Pretty output** via [`to_json_pretty()`] - one element per line, 2-space indentation
//! - **Configurable indentation** via [`JsonPrinter::with_indent()`]
//! - **Insertion order** - object keys are written in the order they were built
//!
//! # Examples
//!
//! ```
//! use jqlite::Value;
//! use jqlite::output::{to_json, to_json_pretty};
//!
//! let value = Value::from(vec![Value::from(1), Value::from("two")]);
//!
//! assert_eq!(to_json(&value), r#"[1,"two"]"#);
//! assert_eq!(to_json_pretty(&value), "[\n  1,\n  \"two\"\n]");
//! ```

use std::io::{self, Write};

use crate::value::{Map, Value};

#[derive(Debug, Clone, Copy)]
pub struct JsonPrinter {
    pretty: bool,
    indent: usize,
}

impl JsonPrinter {
    pub fn new(pretty: bool) -> Self {
        JsonPrinter { pretty, indent: 2 }
    }

    /// Spaces per nesting level in pretty mode.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn print(&self, value: &Value) -> String {
        let mut out = String::new();
        self.print_value(&mut out, value, 0);
        out
    }

    pub fn write_to<W: Write>(&self, writer: &mut W, value: &Value) -> io::Result<()> {
        writer.write_all(self.print(value).as_bytes())
    }

    fn print_value(&self, out: &mut String, value: &Value, level: usize) {
        match value {
            Value::Null => out.push_str("null"),
            Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Integer(n) => out.push_str(&n.to_string()),
            Value::Float(n) => out.push_str(&format_float(*n)),
            Value::String(s) => escape_string(out, s),
            Value::Array(items) => self.print_array(out, items, level),
            Value::Object(map) => self.print_object(out, map, level),
        }
    }

    fn print_array(&self, out: &mut String, items: &[Value], level: usize) {
        if items.is_empty() {
            out.push_str("[]");
            return;
        }

        out.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            self.newline(out, level + 1);
            self.print_value(out, item, level + 1);
        }
        self.newline(out, level);
        out.push(']');
    }

    fn print_object(&self, out: &mut String, map: &Map, level: usize) {
        if map.is_empty() {
            out.push_str("{}");
            return;
        }

        out.push('{');
        for (i, (key, value)) in map.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            self.newline(out, level + 1);
            escape_string(out, key);
            out.push(':');
            if self.pretty {
                out.push(' ');
            }
            self.print_value(out, value, level + 1);
        }
        self.newline(out, level);
        out.push('}');
    }

    fn newline(&self, out: &mut String, level: usize) {
        if self.pretty {
            out.push('\n');
            out.extend(std::iter::repeat_n(' ', level * self.indent));
        }
    }
}

/// Shortest round-tripping representation, always with a `.` or exponent.
///
/// JSON has no NaN or infinity: NaN prints as `null`, infinities as the
/// largest finite double.
fn format_float(n: f64) -> String {
    if n.is_nan() {
        "null".to_string()
    } else if n.is_infinite() {
        let max = format!("{:?}", f64::MAX);
        if n < 0.0 { format!("-{}", max) } else { max }
    } else {
        format!("{:?}", n)
    }
}

fn escape_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Writes each value as one JSON document followed by a newline, flushing
/// after every value.
pub struct Emitter<W> {
    writer: W,
    printer: JsonPrinter,
    emitted: usize,
}

impl<W: Write> Emitter<W> {
    pub fn new(writer: W, printer: JsonPrinter) -> Self {
        Emitter {
            writer,
            printer,
            emitted: 0,
        }
    }

    pub fn emit(&mut self, value: &Value) -> io::Result<()> {
        self.printer.write_to(&mut self.writer, value)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.emitted += 1;
        Ok(())
    }

    /// Number of values written so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

// Convenience functions

/// Converts a Value to compact JSON string representation.
///
/// # Examples
///
/// ```
/// use jqlite::Value;
/// use jqlite::output::to_json;
///
/// let value: Value = [("fc", Value::from("Alice")), ("birthYear", Value::from(1900))]
///     .into_iter()
///     .collect();
///
/// assert_eq!(to_json(&value), r#"{"fc":"Alice","birthYear":1900}"#);
/// ```
pub fn to_json(value: &Value) -> String {
    JsonPrinter::new(false).print(value)
}

/// Converts a Value to pretty-printed JSON with 2-space indentation.
///
/// # Examples
///
/// ```
/// use jqlite::Value;
/// use jqlite::output::to_json_pretty;
///
/// let value: Value = [("fc", Value::from("Alice"))].into_iter().collect();
///
/// assert_eq!(to_json_pretty(&value), "{\n  \"fc\": \"Alice\"\n}");
/// ```
pub fn to_json_pretty(value: &Value) -> String {
    JsonPrinter::new(true).print(value)
}
