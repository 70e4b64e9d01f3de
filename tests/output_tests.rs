use jqlite::output::{Emitter, JsonPrinter, to_json, to_json_pretty};
use jqlite::reader::Documents;
use jqlite::Value;

fn json(text: &str) -> Value {
    Documents::from_str(text).next().unwrap().unwrap()
}

#[test]
fn test_compact_has_no_whitespace() {
    let v = json(r#"{ "a" : [ 1 , 2.5 , { } , [ ] ] , "b" : null }"#);
    assert_eq!(to_json(&v), r#"{"a":[1,2.5,{},[]],"b":null}"#);
}

#[test]
fn test_pretty_nesting() {
    let v = json(r#"{"fc": "Alice", "tags": ["x", "y"], "empty": {}}"#);
    let expected = "{\n  \"fc\": \"Alice\",\n  \"tags\": [\n    \"x\",\n    \"y\"\n  ],\n  \"empty\": {}\n}";
    assert_eq!(to_json_pretty(&v), expected);
}

#[test]
fn test_custom_indent() {
    let v = json("[[1]]");
    assert_eq!(JsonPrinter::new(true).with_indent(4).print(&v), "[\n    [\n        1\n    ]\n]");
    assert_eq!(JsonPrinter::new(true).with_indent(0).print(&v), "[\n[\n1\n]\n]");
}

#[test]
fn test_pretty_has_no_trailing_whitespace() {
    let v = json(r#"{"a": [{"b": [1, {}]}], "c": "d"}"#);
    for line in to_json_pretty(&v).lines() {
        assert_eq!(line, line.trim_end());
    }
}

#[test]
fn test_string_escaping() {
    let v = Value::from("quote\" back\\ nl\n tab\t bell\u{7} del\u{7f} é");
    assert_eq!(
        to_json(&v),
        r#""quote\" back\\ nl\n tab\t bell\u0007 del\u007f é""#
    );
}

#[test]
fn test_numbers() {
    assert_eq!(to_json(&Value::from(-12)), "-12");
    assert_eq!(to_json(&Value::from(1.0)), "1.0");
    assert_eq!(to_json(&Value::from(0.1)), "0.1");
    assert_eq!(to_json(&Value::from(1e100)), "1e100");
    assert_eq!(to_json(&Value::from(f64::NAN)), "null");
}

#[test]
fn test_insertion_order_is_serialized() {
    let v: Value = [("z", Value::from(1)), ("a", Value::from(2))].into_iter().collect();
    assert_eq!(to_json(&v), r#"{"z":1,"a":2}"#);
}

#[test]
fn test_pretty_output_round_trips() {
    let text = r#"{"s": "é\n\u0001", "n": [0, -1.5, 1e-7, 12345678901234], "o": {"k": [true, false, null]}}"#;
    let v = json(text);
    assert_eq!(json(&to_json_pretty(&v)), v);
    assert_eq!(json(&to_json(&v)), v);
}

#[test]
fn test_emitter_writes_one_document_per_line() {
    let mut emitter = Emitter::new(Vec::new(), JsonPrinter::new(false));
    emitter.emit(&Value::from(1)).unwrap();
    emitter.emit(&json(r#"{"a": [2]}"#)).unwrap();
    assert_eq!(emitter.emitted(), 2);
    assert_eq!(String::from_utf8(emitter.into_inner()).unwrap(), "1\n{\"a\":[2]}\n");
}
