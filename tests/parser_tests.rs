// tests/parser_tests.rs

use jqlite::ast::{ArithOp, CompareOp, Filter};
use jqlite::parser::{MAX_DEPTH, MAX_NESTING, compile};
use jqlite::value::Value;

fn lit(n: i64) -> Box<Filter> {
    Box::new(Filter::Literal(Value::Integer(n)))
}

// ============================================================================
// Paths
// ============================================================================

#[test]
fn test_identity() {
    assert_eq!(compile(".").unwrap(), Filter::Identity);
}

#[test]
fn test_field_chain() {
    assert_eq!(
        compile(".user.name").unwrap(),
        Filter::pipe(Filter::field("user"), Filter::field("name"))
    );
}

#[test]
fn test_quoted_field() {
    assert_eq!(compile(r#"."first name""#).unwrap(), Filter::field("first name"));
    assert_eq!(compile(r#".["first name"]"#).unwrap(), Filter::field("first name"));
}

#[test]
fn test_iterate_and_index() {
    assert_eq!(compile(".[]").unwrap(), Filter::Iterate);
    assert_eq!(compile(".[0]").unwrap(), Filter::Index(lit(0)));
    assert_eq!(compile(".[-1]").unwrap(), Filter::Index(lit(-1)));
    assert_eq!(
        compile(".items[]").unwrap(),
        Filter::pipe(Filter::field("items"), Filter::Iterate)
    );
}

#[test]
fn test_slices() {
    assert_eq!(
        compile(".[1:3]").unwrap(),
        Filter::Slice {
            start: Some(lit(1)),
            end: Some(lit(3)),
        }
    );
    assert_eq!(
        compile(".[:2]").unwrap(),
        Filter::Slice {
            start: None,
            end: Some(lit(2)),
        }
    );
    assert_eq!(
        compile(".[2:]").unwrap(),
        Filter::Slice {
            start: Some(lit(2)),
            end: None,
        }
    );
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_object_shorthand() {
    assert_eq!(
        compile("{fc, birthYear}").unwrap(),
        Filter::Object(vec![
            ("fc".to_string(), Filter::field("fc")),
            ("birthYear".to_string(), Filter::field("birthYear")),
        ])
    );
}

#[test]
fn test_object_explicit_values() {
    assert_eq!(
        compile(r#"{name: .fc, "born in": .birthYear, null: 1}"#).unwrap(),
        Filter::Object(vec![
            ("name".to_string(), Filter::field("fc")),
            ("born in".to_string(), Filter::field("birthYear")),
            ("null".to_string(), Filter::Literal(Value::Integer(1))),
        ])
    );
}

#[test]
fn test_object_then_iterate() {
    assert_eq!(
        compile("{fc}[]").unwrap(),
        Filter::pipe(
            Filter::Object(vec![("fc".to_string(), Filter::field("fc"))]),
            Filter::Iterate
        )
    );
}

#[test]
fn test_array_construction() {
    assert_eq!(compile("[]").unwrap(), Filter::Array(None));
    assert_eq!(
        compile("[.[] | .a]").unwrap(),
        Filter::Array(Some(Box::new(Filter::pipe(Filter::Iterate, Filter::field("a")))))
    );
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn test_pipe_binds_looser_than_comma() {
    assert_eq!(
        compile(".a | .b, .c").unwrap(),
        Filter::pipe(
            Filter::field("a"),
            Filter::comma(Filter::field("b"), Filter::field("c"))
        )
    );
}

#[test]
fn test_arithmetic_precedence() {
    // Should be: Add(1, Multiply(2, 3))
    match compile("1 + 2 * 3").unwrap() {
        Filter::Arithmetic {
            op: ArithOp::Add,
            left,
            right,
        } => {
            assert_eq!(left, lit(1));
            assert!(matches!(*right, Filter::Arithmetic { op: ArithOp::Multiply, .. }));
        }
        other => panic!("Expected addition, got {:?}", other),
    }
}

#[test]
fn test_parentheses() {
    match compile("(1 + 2) * 3").unwrap() {
        Filter::Arithmetic {
            op: ArithOp::Multiply,
            left,
            ..
        } => assert!(matches!(*left, Filter::Arithmetic { op: ArithOp::Add, .. })),
        other => panic!("Expected multiplication, got {:?}", other),
    }
}

#[test]
fn test_and_binds_tighter_than_or() {
    match compile(".a or .b and .c").unwrap() {
        Filter::Or(_, right) => assert!(matches!(*right, Filter::And(..))),
        other => panic!("Expected or, got {:?}", other),
    }
}

#[test]
fn test_comparison() {
    assert_eq!(
        compile(".birthYear >= 1900").unwrap(),
        Filter::Comparison {
            op: CompareOp::GreaterEqual,
            left: Box::new(Filter::field("birthYear")),
            right: lit(1900),
        }
    );
}

#[test]
fn test_comparison_does_not_chain() {
    let err = compile("1 < 2 < 3").unwrap_err();
    assert_eq!(err.offset, 6);
}

#[test]
fn test_unary_minus() {
    assert_eq!(compile("-3").unwrap(), *lit(-3));
    assert_eq!(
        compile("-.a").unwrap(),
        Filter::Arithmetic {
            op: ArithOp::Subtract,
            left: lit(0),
            right: Box::new(Filter::field("a")),
        }
    );
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_builtin_calls() {
    assert_eq!(
        compile("select(.a)").unwrap(),
        Filter::Select(Box::new(Filter::field("a")))
    );
    assert_eq!(
        compile("sort_by(.birthYear)").unwrap(),
        Filter::SortBy(Box::new(Filter::field("birthYear")))
    );
    assert_eq!(
        compile("min_by(.x)").unwrap(),
        Filter::MinBy(Box::new(Filter::field("x")))
    );
    assert_eq!(
        compile("max_by(.x)").unwrap(),
        Filter::MaxBy(Box::new(Filter::field("x")))
    );
    assert_eq!(compile("length").unwrap(), Filter::Length);
    assert_eq!(compile("keys").unwrap(), Filter::Keys);
    assert_eq!(compile("sort").unwrap(), Filter::SortBy(Box::new(Filter::Identity)));
    assert_eq!(compile("empty").unwrap(), Filter::Empty);
}

#[test]
fn test_regex_compiled_once() {
    match compile(r#"test("^A")"#).unwrap() {
        Filter::Test(pattern) => {
            assert_eq!(pattern.as_str(), "^A");
            assert!(pattern.is_match("Alice"));
        }
        other => panic!("Expected test, got {:?}", other),
    }
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unknown_function() {
    let err = compile(".a | frobnicate").unwrap_err();
    assert_eq!(err.offset, 5);
    assert_eq!(err.message, "unknown function frobnicate/0");
}

#[test]
fn test_wrong_arity() {
    let err = compile("length(.a)").unwrap_err();
    assert_eq!(err.message, "unknown function length/1");
    assert!(compile("select").is_err());
}

#[test]
fn test_invalid_regex() {
    let err = compile(r#"test("[")"#).unwrap_err();
    assert!(err.message.starts_with("invalid regex"));
    assert!(compile("test(.pattern)").is_err());
}

#[test]
fn test_unclosed_bracket() {
    let err = compile(".[").unwrap_err();
    assert_eq!(err.offset, 2);
    assert!(err.to_string().starts_with("parse error at offset 2"));
}

#[test]
fn test_empty_filter() {
    assert_eq!(compile("").unwrap_err().offset, 0);
}

#[test]
fn test_trailing_tokens() {
    assert!(compile(".a )").is_err());
    assert!(compile("{fc").is_err());
}

#[test]
fn test_deep_brackets_rejected() {
    let source = format!("{}.{}", "[".repeat(200_000), "]".repeat(200_000));
    let err = compile(&source).unwrap_err();
    assert_eq!(
        err.message,
        format!("filter nesting exceeds maximum depth of {}", MAX_NESTING)
    );
}

#[test]
fn test_deep_parens_and_negation_rejected() {
    let parens = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
    assert!(compile(&parens).unwrap_err().message.contains("maximum depth"));

    let minus = format!("{}.", "-".repeat(50_000));
    assert!(compile(&minus).unwrap_err().message.contains("maximum depth"));

    let objects = format!("{}1{}", "{a:".repeat(50_000), "}".repeat(50_000));
    assert!(compile(&objects).unwrap_err().message.contains("maximum depth"));
}

#[test]
fn test_long_chains_rejected() {
    let fields = ".a".repeat(100_000);
    let err = compile(&fields).unwrap_err();
    assert_eq!(
        err.message,
        format!("filter nesting exceeds maximum depth of {}", MAX_DEPTH)
    );

    let pipes = vec!["."; 100_000].join(" | ");
    assert!(compile(&pipes).unwrap_err().message.contains("maximum depth"));
}

#[test]
fn test_moderate_nesting_accepted() {
    let brackets = format!("{}.{}", "[".repeat(100), "]".repeat(100));
    assert_eq!(compile(&brackets).unwrap().depth(), 101);

    let pipeline = vec![".a"; 500].join(" | ");
    assert_eq!(compile(&pipeline).unwrap().depth(), 500);
}
