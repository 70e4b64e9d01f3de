pub mod ast;
pub mod cancel;
pub mod convert;
pub mod engine;
pub mod evaluator;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod reader;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{Filter, Token};
pub use cancel::CancelToken;
pub use engine::{Engine, Error, Source, WholeDocuments, run};
pub use evaluator::{EvalError, ValueStream, evaluate};
pub use lexer::{LexError, Lexer};
pub use output::{Emitter, JsonPrinter, to_json, to_json_pretty};
pub use parser::{ParseError, Parser, compile};
pub use reader::{Documents, Element, Elements, OnError, ReadError, ReaderOptions, SyntaxError};
pub use value::{Map, Value};
