use thiserror::Error;

use crate::lang::Type;
use crate::parser_error::ParserError;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParserError),

    /// A name used in a statement or expression that no declaration binds.
    #[error("{line}:{col}: undefined variable '{name}'\n  hint: declare it with 'var', 'field' or 'static', or as a parameter")]
    UndefinedSymbol {
        name: String,
        line: usize,
        col: usize,
    },

    /// `x.f(..)` where `x` is an `int`, `char` or `boolean`.
    #[error("{line}:{col}: cannot call '{name}' on '{receiver}' of type {ty}")]
    PrimitiveReceiver {
        receiver: String,
        ty: Type,
        name: String,
        line: usize,
        col: usize,
    },
}

impl CompileError {
    /// Source position of the error, if it has one.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            CompileError::Parse(e) => e.position(),
            CompileError::UndefinedSymbol { line, col, .. }
            | CompileError::PrimitiveReceiver { line, col, .. } => Some((*line, *col)),
        }
    }
}
