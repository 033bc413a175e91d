use thiserror::Error;

use crate::lexer::LexerError;

/// A parsing error with source location.
///
/// `line` and `col` are 1-based positions coming from the lexer spans.
/// For errors at end of input the parser reports the last consumed token's
/// span, so locations are never `0:0`.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error(transparent)]
    Lexer(#[from] LexerError),

    #[error("{line}:{col}: expected {expected}, found {found}")]
    Unexpected {
        expected: String,
        found: String,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: expected {expected}, found end of input")]
    UnexpectedEof {
        expected: String,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: unexpected {found} after the end of the class")]
    TrailingInput {
        found: String,
        line: usize,
        col: usize,
    },
}

impl ParserError {
    /// Source position of the error, if it has one.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            ParserError::Unexpected { line, col, .. }
            | ParserError::UnexpectedEof { line, col, .. }
            | ParserError::TrailingInput { line, col, .. } => Some((*line, *col)),
            ParserError::Lexer(LexerError::UnterminatedString { line, col })
            | ParserError::Lexer(LexerError::UnterminatedComment { line, col })
            | ParserError::Lexer(LexerError::IntegerOutOfRange { line, col, .. })
            | ParserError::Lexer(LexerError::UnrepresentableChar { line, col, .. })
            | ParserError::Lexer(LexerError::StringTooLong { line, col }) => {
                Some((*line, *col))
            }
            ParserError::Lexer(LexerError::Io(_)) => None,
        }
    }
}
