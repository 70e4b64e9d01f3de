use std::mem;

use tracing::debug;

use crate::{
    ast::{ArithOp, CompareOp, Filter, Pattern, Token},
    lexer::{LexError, Lexer},
    value::Value,
};

/// Malformed filter expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error at offset {offset}: {message}")]
pub struct ParseError {
    /// Character offset into the filter text
    pub offset: usize,
    pub message: String,
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            offset: e.offset,
            message: e.message,
        }
    }
}

/// Compile a filter expression.
///
/// # Examples
///
/// ```
/// use jqlite::{compile, Filter};
///
/// let filter = compile(".fc").unwrap();
/// assert_eq!(filter, Filter::field("fc"));
///
/// let err = compile(".[").unwrap_err();
/// assert_eq!(err.offset, 2);
/// ```
pub fn compile(source: &str) -> Result<Filter, ParseError> {
    let mut parser = Parser::new(Lexer::new(source))?;
    let filter = parser.parse()?;
    debug!(filter = ?filter, "compiled filter");
    Ok(filter)
}

/// Deepest `(`, `[`, `{`, call or unary nesting the parser recurses into.
pub const MAX_NESTING: usize = 128;

/// Tallest filter tree the parser builds, counting chains like `a | b | c`.
pub const MAX_DEPTH: usize = 1024;

pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    current_offset: usize,
    nesting: usize,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let current_token = lexer.next_token()?;
        let current_offset = lexer.token_start();
        Ok(Parser {
            lexer,
            current_token,
            current_offset,
            nesting: 0,
        })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current_token = self.lexer.next_token()?;
        self.current_offset = self.lexer.token_start();
        Ok(())
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn unexpected<T>(&self, expected: &str) -> Result<T, ParseError> {
        Err(ParseError {
            offset: self.current_offset,
            message: format!(
                "expected {}, found {}",
                expected,
                self.current_token.describe()
            ),
        })
    }

    fn too_deep<T>(&self, limit: usize) -> Result<T, ParseError> {
        Err(ParseError {
            offset: self.current_offset,
            message: format!("filter nesting exceeds maximum depth of {}", limit),
        })
    }

    /// Depth of a node joining a `left` of known depth with `right`.
    fn joined(&self, left: usize, right: &Filter) -> Result<usize, ParseError> {
        let depth = 1 + left.max(right.depth());
        if depth > MAX_DEPTH {
            return self.too_deep(MAX_DEPTH);
        }
        Ok(depth)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return self.unexpected(&expected.describe());
        }
        self.advance()
    }

    /// Parse a complete filter, requiring all input to be consumed.
    pub fn parse(&mut self) -> Result<Filter, ParseError> {
        let filter = self.parse_pipe()?;
        self.expect(Token::Eof)?;
        Ok(filter)
    }

    /// `a | b | c`, left-associative, lowest precedence
    pub fn parse_pipe(&mut self) -> Result<Filter, ParseError> {
        let mut left = self.parse_comma()?;
        let mut depth = left.depth();

        while self.check(&Token::Pipe) {
            self.advance()?;
            let right = self.parse_comma()?;
            depth = self.joined(depth, &right)?;
            left = Filter::pipe(left, right);
        }
        Ok(left)
    }

    fn parse_comma(&mut self) -> Result<Filter, ParseError> {
        let mut left = self.parse_or()?;
        let mut depth = left.depth();

        while self.check(&Token::Comma) {
            self.advance()?;
            let right = self.parse_or()?;
            depth = self.joined(depth, &right)?;
            left = Filter::comma(left, right);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Filter, ParseError> {
        let mut left = self.parse_and()?;
        let mut depth = left.depth();

        while self.check(&Token::Or) {
            self.advance()?;
            let right = self.parse_and()?;
            depth = self.joined(depth, &right)?;
            left = Filter::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Filter, ParseError> {
        let mut left = self.parse_comparison()?;
        let mut depth = left.depth();

        while self.check(&Token::And) {
            self.advance()?;
            let right = self.parse_comparison()?;
            depth = self.joined(depth, &right)?;
            left = Filter::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Filter, ParseError> {
        let left = self.parse_additive()?;

        let op = match &self.current_token {
            Token::EqEq => CompareOp::Equal,
            Token::NotEq => CompareOp::NotEqual,
            Token::Lt => CompareOp::LessThan,
            Token::Gt => CompareOp::GreaterThan,
            Token::LtEq => CompareOp::LessEqual,
            Token::GtEq => CompareOp::GreaterEqual,
            _ => return Ok(left),
        };
        self.advance()?;
        let right = self.parse_additive()?;

        Ok(Filter::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> Result<Filter, ParseError> {
        let mut left = self.parse_multiplicative()?;
        let mut depth = left.depth();

        loop {
            let op = match &self.current_token {
                Token::Plus => ArithOp::Add,
                Token::Minus => ArithOp::Subtract,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            depth = self.joined(depth, &right)?;
            left = Filter::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Filter, ParseError> {
        let mut left = self.parse_unary()?;
        let mut depth = left.depth();

        loop {
            let op = match &self.current_token {
                Token::Star => ArithOp::Multiply,
                Token::Slash => ArithOp::Divide,
                Token::Percent => ArithOp::Modulo,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary()?;
            depth = self.joined(depth, &right)?;
            left = Filter::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// All nested constructs recurse through here.
    fn parse_unary(&mut self) -> Result<Filter, ParseError> {
        if self.nesting >= MAX_NESTING {
            return self.too_deep(MAX_NESTING);
        }
        self.nesting += 1;
        let filter = self.parse_negation();
        self.nesting -= 1;
        filter
    }

    fn parse_negation(&mut self) -> Result<Filter, ParseError> {
        if !self.check(&Token::Minus) {
            return self.parse_postfix();
        }
        self.advance()?;
        let operand = self.parse_unary()?;

        Ok(match operand {
            Filter::Literal(Value::Integer(n)) if n != i64::MIN => {
                Filter::Literal(Value::Integer(-n))
            }
            Filter::Literal(Value::Float(n)) => Filter::Literal(Value::Float(-n)),
            // 0 - operand
            operand => Filter::Arithmetic {
                op: ArithOp::Subtract,
                left: Box::new(Filter::Literal(Value::Integer(0))),
                right: Box::new(operand),
            },
        })
    }

    /// A primary followed by any number of `.name`, `."name"` and `[...]`
    fn parse_postfix(&mut self) -> Result<Filter, ParseError> {
        let mut filter = self.parse_primary()?;
        let mut depth = filter.depth();

        loop {
            match mem::replace(&mut self.current_token, Token::Eof) {
                Token::Field(name) => {
                    self.advance()?;
                    let suffix = Filter::Field(name);
                    depth = self.joined(depth, &suffix)?;
                    filter = Filter::pipe(filter, suffix);
                }
                Token::Dot => {
                    self.advance()?;
                    let suffix = match mem::replace(&mut self.current_token, Token::Eof) {
                        Token::String(name) => {
                            self.advance()?;
                            Filter::Field(name)
                        }
                        Token::LBracket => {
                            self.advance()?;
                            self.parse_bracket_suffix()?
                        }
                        token => {
                            self.current_token = token;
                            return self.unexpected("field name or '[' after '.'");
                        }
                    };
                    depth = self.joined(depth, &suffix)?;
                    filter = Filter::pipe(filter, suffix);
                }
                Token::LBracket => {
                    self.advance()?;
                    let suffix = self.parse_bracket_suffix()?;
                    depth = self.joined(depth, &suffix)?;
                    filter = Filter::pipe(filter, suffix);
                }
                token => {
                    self.current_token = token;
                    break;
                }
            }
        }
        Ok(filter)
    }

    /// Everything after an opening `[` in a path: `]`, `n]`, `n:m]`, `:m]`
    fn parse_bracket_suffix(&mut self) -> Result<Filter, ParseError> {
        if self.check(&Token::RBracket) {
            self.advance()?;
            return Ok(Filter::Iterate);
        }

        if self.check(&Token::Colon) {
            self.advance()?;
            let end = self.parse_pipe()?;
            self.expect(Token::RBracket)?;
            return Ok(Filter::Slice {
                start: None,
                end: Some(Box::new(end)),
            });
        }

        let start = self.parse_pipe()?;

        if self.check(&Token::Colon) {
            self.advance()?;
            let end = if self.check(&Token::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_pipe()?))
            };
            self.expect(Token::RBracket)?;
            return Ok(Filter::Slice {
                start: Some(Box::new(start)),
                end,
            });
        }

        self.expect(Token::RBracket)?;
        Ok(match start {
            Filter::Literal(Value::String(name)) => Filter::Field(name.to_string()),
            index => Filter::Index(Box::new(index)),
        })
    }

    fn parse_primary(&mut self) -> Result<Filter, ParseError> {
        let offset = self.current_offset;
        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Dot => {
                self.advance()?;
                match mem::replace(&mut self.current_token, Token::Eof) {
                    Token::String(name) => {
                        self.advance()?;
                        Ok(Filter::Field(name))
                    }
                    Token::LBracket => {
                        self.advance()?;
                        self.parse_bracket_suffix()
                    }
                    token => {
                        self.current_token = token;
                        Ok(Filter::Identity)
                    }
                }
            }
            Token::Field(name) => {
                self.advance()?;
                Ok(Filter::Field(name))
            }

            // Literals
            Token::Integer(n) => {
                self.advance()?;
                Ok(Filter::Literal(Value::Integer(n)))
            }
            Token::Float(n) => {
                self.advance()?;
                Ok(Filter::Literal(Value::Float(n)))
            }
            Token::String(s) => {
                self.advance()?;
                Ok(Filter::Literal(Value::string(s)))
            }
            Token::Boolean(b) => {
                self.advance()?;
                Ok(Filter::Literal(Value::Boolean(b)))
            }
            Token::Null => {
                self.advance()?;
                Ok(Filter::Literal(Value::Null))
            }

            Token::LParen => {
                self.advance()?;
                let inner = self.parse_pipe()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => {
                self.advance()?;
                if self.check(&Token::RBracket) {
                    self.advance()?;
                    return Ok(Filter::Array(None));
                }
                let inner = self.parse_pipe()?;
                self.expect(Token::RBracket)?;
                Ok(Filter::Array(Some(Box::new(inner))))
            }
            Token::LBrace => {
                self.advance()?;
                self.parse_object_construction()
            }
            Token::Identifier(name) => {
                self.advance()?;
                let arg = if self.check(&Token::LParen) {
                    self.advance()?;
                    let arg = self.parse_pipe()?;
                    self.expect(Token::RParen)?;
                    Some(arg)
                } else {
                    None
                };
                self.build_call(&name, arg, offset)
            }

            token => {
                self.current_token = token;
                self.unexpected("a filter")
            }
        }
    }

    fn parse_object_construction(&mut self) -> Result<Filter, ParseError> {
        let mut entries = vec![];

        while !self.check(&Token::RBrace) {
            let key = match mem::replace(&mut self.current_token, Token::Eof) {
                Token::Identifier(s) | Token::String(s) => s,
                Token::And => "and".to_string(),
                Token::Or => "or".to_string(),
                Token::Null => "null".to_string(),
                Token::Boolean(b) => b.to_string(),
                token => {
                    self.current_token = token;
                    return self.unexpected("object key");
                }
            };
            self.advance()?;

            let value = if self.check(&Token::Colon) {
                self.advance()?;
                self.parse_or()?
            } else {
                // {fc} is {fc: .fc}
                Filter::Field(key.clone())
            };
            entries.push((key, value));

            if !self.check(&Token::RBrace) {
                if !self.check(&Token::Comma) {
                    return self.unexpected("',' or '}'");
                }
                self.advance()?;
            }
        }

        self.expect(Token::RBrace)?;
        Ok(Filter::Object(entries))
    }

    fn build_call(
        &self,
        name: &str,
        arg: Option<Filter>,
        offset: usize,
    ) -> Result<Filter, ParseError> {
        let filter = match (name, arg) {
            ("select", Some(p)) => Filter::Select(Box::new(p)),
            ("sort_by", Some(k)) => Filter::SortBy(Box::new(k)),
            ("min_by", Some(k)) => Filter::MinBy(Box::new(k)),
            ("max_by", Some(k)) => Filter::MaxBy(Box::new(k)),
            ("test", Some(Filter::Literal(Value::String(re)))) => {
                let pattern = Pattern::new(&re).map_err(|e| ParseError {
                    offset,
                    message: format!("invalid regex in test: {}", e),
                })?;
                Filter::Test(pattern)
            }
            ("test", Some(_)) => {
                return Err(ParseError {
                    offset,
                    message: "test expects a string literal pattern".to_string(),
                });
            }
            ("length", None) => Filter::Length,
            ("keys", None) => Filter::Keys,
            ("sort", None) => Filter::SortBy(Box::new(Filter::Identity)),
            ("not", None) => Filter::Not,
            ("type", None) => Filter::Type,
            ("empty", None) => Filter::Empty,
            (name, arg) => {
                return Err(ParseError {
                    offset,
                    message: format!(
                        "unknown function {}/{}",
                        name,
                        if arg.is_some() { 1 } else { 0 }
                    ),
                });
            }
        };
        Ok(filter)
    }
}
