//! [ParseError], the single error kind raised anywhere in the assembly pipeline

use std::error::Error as StdError;
use std::fmt;

use super::token::Token;

/// The one error kind the tokenizer, parser and emitter raise.
///
/// Nested contexts chain via `cause`: an outer handler wraps a failure with
/// a frame naming the statement or macro it was emitting, and the original
/// error becomes the cause. Printing walks the chain top-down, one line per
/// frame.
#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub token: Token,
    pub cause: Option<Box<ParseError>>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, token: Token) -> ParseError {
        ParseError { message: message.into(), token, cause: None }
    }

    /// Wrap `cause` with an outer frame, matching the "Parsing Statement" /
    /// "Emitting Macro" wrapping described for nested contexts
    pub fn wrap(message: impl Into<String>, token: Token, cause: ParseError) -> ParseError {
        ParseError { message: message.into(), token, cause: Some(Box::new(cause)) }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.token, self.message)
    }
}

impl StdError for ParseError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn StdError + 'static))
    }
}
