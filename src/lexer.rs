use crate::ast::Token;

/// Malformed filter text at the character level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct LexError {
    /// Character offset into the filter text
    pub offset: usize,
    pub message: String,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    token_start: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            token_start: 0,
        }
    }

    /// Character offset where the most recently returned token begins.
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn error<T>(&self, offset: usize, message: impl Into<String>) -> Result<T, LexError> {
        Err(LexError {
            offset,
            message: message.into(),
        })
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' {
                while self.current_char().is_some_and(|c| c != '\n') {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_hex4(&mut self) -> Result<u32, LexError> {
        let mut code = 0;
        for _ in 0..4 {
            match self.current_char().and_then(|c| c.to_digit(16)) {
                Some(d) => {
                    code = code * 16 + d;
                    self.advance();
                }
                None => return self.error(self.position, "invalid \\u escape"),
            }
        }
        Ok(code)
    }

    fn read_unicode_escape(&mut self) -> Result<char, LexError> {
        let start = self.position;
        let high = self.read_hex4()?;
        let code = if (0xD800..=0xDBFF).contains(&high) {
            if self.current_char() != Some('\\') || self.peek_char(1) != Some('u') {
                return self.error(start, "unpaired surrogate in \\u escape");
            }
            self.advance();
            self.advance();
            let low = self.read_hex4()?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return self.error(start, "invalid surrogate pair in \\u escape");
            }
            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
        } else {
            high
        };
        match char::from_u32(code) {
            Some(ch) => Ok(ch),
            None => self.error(start, "invalid code point in \\u escape"),
        }
    }

    fn read_string(&mut self) -> Result<String, LexError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance(); // Consume backslash
                    let escaped = match self.current_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('b') => '\u{0008}',
                        Some('f') => '\u{000c}',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('/') => '/',
                        Some('u') => {
                            self.advance();
                            result.push(self.read_unicode_escape()?);
                            continue;
                        }
                        Some(ch) => {
                            return self.error(self.position - 1, format!("invalid escape sequence \\{}", ch));
                        }
                        None => return self.error(start, "unterminated string"),
                    };
                    result.push(escaped);
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        self.error(start, "unterminated string")
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else if (ch == 'e' || ch == 'E')
                && (self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
                    || (matches!(self.peek_char(1), Some('+' | '-'))
                        && self.peek_char(2).is_some_and(|c| c.is_ascii_digit())))
            {
                is_float = true;
                number.push('e');
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.current_char() {
                    number.push(sign);
                    self.advance();
                }
                while let Some(d) = self.current_char().filter(char::is_ascii_digit) {
                    number.push(d);
                    self.advance();
                }
                break;
            } else {
                break;
            }
        }

        if !is_float && let Ok(n) = number.parse::<i64>() {
            return Ok(Token::Integer(n));
        }
        match number.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Token::Float(n)),
            _ => self.error(start, format!("number out of range: {}", number)),
        }
    }

    fn single(&mut self, token: Token) -> Result<Token, LexError> {
        self.advance();
        Ok(token)
    }

    fn double(&mut self, token: Token) -> Result<Token, LexError> {
        self.advance();
        self.advance();
        Ok(token)
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments();
        self.token_start = self.position;

        match self.current_char() {
            None => Ok(Token::Eof),
            Some('.') => {
                if self
                    .peek_char(1)
                    .is_some_and(|c| c.is_alphabetic() || c == '_')
                {
                    self.advance();
                    let name = self.read_identifier();
                    Ok(Token::Field(name))
                } else {
                    self.single(Token::Dot)
                }
            }
            Some('|') => self.single(Token::Pipe),
            Some(',') => self.single(Token::Comma),
            Some(':') => self.single(Token::Colon),
            Some('+') => self.single(Token::Plus),
            Some('-') => self.single(Token::Minus),
            Some('*') => self.single(Token::Star),
            Some('/') => self.single(Token::Slash),
            Some('%') => self.single(Token::Percent),
            Some('=') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::EqEq)
                } else {
                    self.error(self.position, "unexpected '=' (did you mean '=='?)")
                }
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::NotEq)
                } else {
                    self.error(self.position, "unexpected '!' (did you mean '!='?)")
                }
            }
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::GtEq)
                } else {
                    self.single(Token::Gt)
                }
            }
            Some('<') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::LtEq)
                } else {
                    self.single(Token::Lt)
                }
            }
            Some('{') => self.single(Token::LBrace),
            Some('}') => self.single(Token::RBrace),
            Some('(') => self.single(Token::LParen),
            Some(')') => self.single(Token::RParen),
            Some('[') => self.single(Token::LBracket),
            Some(']') => self.single(Token::RBracket),
            Some('"') => self.read_string().map(Token::String),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();

                Ok(match ident.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    "null" => Token::Null,
                    _ => Token::Identifier(ident),
                })
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number(),
            Some(ch) => self.error(self.position, format!("unexpected character '{}'", ch)),
        }
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("and or true false null");
    assert_eq!(lexer.next_token(), Ok(Token::And));
    assert_eq!(lexer.next_token(), Ok(Token::Or));
    assert_eq!(lexer.next_token(), Ok(Token::Boolean(true)));
    assert_eq!(lexer.next_token(), Ok(Token::Boolean(false)));
    assert_eq!(lexer.next_token(), Ok(Token::Null));
}

#[test]
fn test_pipe() {
    let mut lexer = Lexer::new(".[] | select(.x > 5)");
    assert_eq!(lexer.next_token(), Ok(Token::Dot));
    assert_eq!(lexer.next_token(), Ok(Token::LBracket));
    assert_eq!(lexer.next_token(), Ok(Token::RBracket));
    assert_eq!(lexer.next_token(), Ok(Token::Pipe));
    assert_eq!(lexer.next_token(), Ok(Token::Identifier("select".to_string())));
    assert_eq!(lexer.next_token(), Ok(Token::LParen));
    assert_eq!(lexer.next_token(), Ok(Token::Field("x".to_string())));
    assert_eq!(lexer.next_token(), Ok(Token::Gt));
    assert_eq!(lexer.next_token(), Ok(Token::Integer(5)));
    assert_eq!(lexer.next_token(), Ok(Token::RParen));
    assert_eq!(lexer.next_token(), Ok(Token::Eof));
}

#[test]
fn test_token_start_points_past_whitespace() {
    let mut lexer = Lexer::new("  .fc");
    assert_eq!(lexer.next_token(), Ok(Token::Field("fc".to_string())));
    assert_eq!(lexer.token_start(), 2);
}
