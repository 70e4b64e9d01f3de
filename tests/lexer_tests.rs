// tests/lexer_tests.rs

use jqlite::ast::Token;
use jqlite::lexer::Lexer;

fn tokens(input: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(input);
    let mut out = vec![];
    loop {
        let token = lexer.next_token().unwrap();
        if token == Token::Eof {
            return out;
        }
        out.push(token);
    }
}

// ============================================================================
// Single Character Tokens
// ============================================================================

#[test]
fn test_single_char_tokens() {
    let test_cases = vec![
        ("|", Token::Pipe),
        (",", Token::Comma),
        (":", Token::Colon),
        ("+", Token::Plus),
        ("-", Token::Minus),
        ("*", Token::Star),
        ("/", Token::Slash),
        ("%", Token::Percent),
        ("(", Token::LParen),
        (")", Token::RParen),
        ("[", Token::LBracket),
        ("]", Token::RBracket),
        ("{", Token::LBrace),
        ("}", Token::RBrace),
        (".", Token::Dot),
        ("<", Token::Lt),
        (">", Token::Gt),
    ];

    for (input, expected) in test_cases {
        let mut lexer = Lexer::new(input);
        let token = lexer.next_token().unwrap();
        assert_eq!(token, expected, "Failed for input: {}", input);
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }
}

// ============================================================================
// Two Character Tokens
// ============================================================================

#[test]
fn test_two_char_tokens() {
    let test_cases = vec![
        ("==", Token::EqEq),
        ("!=", Token::NotEq),
        ("<=", Token::LtEq),
        (">=", Token::GtEq),
    ];

    for (input, expected) in test_cases {
        assert_eq!(tokens(input), vec![expected], "Failed for input: {}", input);
    }
}

#[test]
fn test_lone_equals_is_error() {
    let mut lexer = Lexer::new(".a = 1");
    assert_eq!(lexer.next_token().unwrap(), Token::Field("a".to_string()));
    let err = lexer.next_token().unwrap_err();
    assert_eq!(err.offset, 3);
    assert!(err.message.contains("=="));
}

// ============================================================================
// Paths
// ============================================================================

#[test]
fn test_field_tokens() {
    assert_eq!(
        tokens(".fc .birthYear ._private"),
        vec![
            Token::Field("fc".to_string()),
            Token::Field("birthYear".to_string()),
            Token::Field("_private".to_string()),
        ]
    );
}

#[test]
fn test_dot_before_bracket_and_string() {
    assert_eq!(
        tokens(r#".[0] ."first name""#),
        vec![
            Token::Dot,
            Token::LBracket,
            Token::Integer(0),
            Token::RBracket,
            Token::Dot,
            Token::String("first name".to_string()),
        ]
    );
}

#[test]
fn test_dot_with_space_is_not_field() {
    assert_eq!(
        tokens(". fc"),
        vec![Token::Dot, Token::Identifier("fc".to_string())]
    );
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_numbers() {
    assert_eq!(
        tokens("0 42 2.75 1e3 2.5E-2"),
        vec![
            Token::Integer(0),
            Token::Integer(42),
            Token::Float(2.75),
            Token::Float(1000.0),
            Token::Float(0.025),
        ]
    );
}

#[test]
fn test_integer_overflow_becomes_float() {
    assert_eq!(
        tokens("99999999999999999999"),
        vec![Token::Float(99999999999999999999.0)]
    );
}

#[test]
fn test_minus_is_separate_token() {
    assert_eq!(tokens("-1"), vec![Token::Minus, Token::Integer(1)]);
}

#[test]
fn test_string_escapes() {
    assert_eq!(
        tokens(r#""a\"b\\c\n\té😀""#),
        vec![Token::String("a\"b\\c\n\té😀".to_string())]
    );
}

#[test]
fn test_unterminated_string() {
    let mut lexer = Lexer::new(r#"select(.a == "abc"#);
    let err = loop {
        match lexer.next_token() {
            Ok(Token::Eof) => panic!("expected an error"),
            Ok(_) => {}
            Err(e) => break e,
        }
    };
    assert_eq!(err.message, "unterminated string");
    assert_eq!(err.offset, 13);
}

#[test]
fn test_unpaired_surrogate_is_error() {
    let mut lexer = Lexer::new(r#""\ud83d""#);
    assert!(lexer.next_token().is_err());
}

// ============================================================================
// Keywords and identifiers
// ============================================================================

#[test]
fn test_keywords_and_identifiers() {
    assert_eq!(
        tokens("select sort_by and or not true false null"),
        vec![
            Token::Identifier("select".to_string()),
            Token::Identifier("sort_by".to_string()),
            Token::And,
            Token::Or,
            Token::Identifier("not".to_string()),
            Token::Boolean(true),
            Token::Boolean(false),
            Token::Null,
        ]
    );
}

#[test]
fn test_comments_are_skipped() {
    assert_eq!(
        tokens(".a # first field\n| .b"),
        vec![
            Token::Field("a".to_string()),
            Token::Pipe,
            Token::Field("b".to_string()),
        ]
    );
}

#[test]
fn test_unexpected_character() {
    let mut lexer = Lexer::new(".a ; .b");
    lexer.next_token().unwrap();
    let err = lexer.next_token().unwrap_err();
    assert_eq!(err.offset, 3);
    assert_eq!(err.to_string(), "unexpected character ';' at offset 3");
}
