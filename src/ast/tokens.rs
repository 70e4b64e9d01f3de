#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 1900
    /// ```
    Integer(i64),

    /// Floating-point number
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 1e3
    /// ```
    Float(f64),

    /// String literal enclosed in double quotes
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// "first name"
    /// ```
    String(String),

    /// Boolean values
    Boolean(bool),

    /// Null value
    Null,

    // Paths
    /// Dot immediately followed by a name
    ///
    /// # Examples
    /// ```text
    /// .fc
    /// .birthYear
    /// ```
    Field(String),

    /// A lone dot: identity, or the start of `.[...]` / `."key"`
    Dot,

    /// Function name
    ///
    /// # Examples
    /// ```text
    /// select
    /// sort_by
    /// length
    /// ```
    Identifier(String),

    // Combinators
    /// Pipe
    ///
    /// # Examples
    /// ```text
    /// .[] | .fc
    /// ```
    Pipe,

    /// Comma, separating object entries or concatenating streams
    Comma,

    /// Colon, in object entries and slices
    Colon,

    // Comparison
    /// Equality operator
    EqEq,

    /// Inequality operator
    NotEq,

    /// Less than
    Lt,

    /// Greater than
    Gt,

    /// Less than or equal
    LtEq,

    /// Greater than or equal
    GtEq,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Logical
    /// Logical AND (word, not symbol)
    And,

    /// Logical OR (word, not symbol)
    Or,

    // Delimiters
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,

    /// End of input
    Eof,
}

impl Token {
    /// Short description used in "expected X, found Y" messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Integer(n) => format!("number {}", n),
            Token::Float(n) => format!("number {}", n),
            Token::String(s) => format!("string {:?}", s),
            Token::Boolean(b) => format!("'{}'", b),
            Token::Null => "'null'".to_string(),
            Token::Field(name) => format!("'.{}'", name),
            Token::Dot => "'.'".to_string(),
            Token::Identifier(name) => format!("'{}'", name),
            Token::Pipe => "'|'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Colon => "':'".to_string(),
            Token::EqEq => "'=='".to_string(),
            Token::NotEq => "'!='".to_string(),
            Token::Lt => "'<'".to_string(),
            Token::Gt => "'>'".to_string(),
            Token::LtEq => "'<='".to_string(),
            Token::GtEq => "'>='".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Percent => "'%'".to_string(),
            Token::And => "'and'".to_string(),
            Token::Or => "'or'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::Eof => "end of filter".to_string(),
        }
    }
}
