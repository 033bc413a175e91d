use thiserror::Error;

/// An assembly error; `line` is the 1-based line in the source file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AsmError {
    #[error("line {line}: invalid computation '{text}'")]
    InvalidComputation { text: String, line: usize },

    #[error("line {line}: invalid destination '{text}'")]
    InvalidDestination { text: String, line: usize },

    #[error("line {line}: invalid jump '{text}'")]
    InvalidJump { text: String, line: usize },

    #[error("line {line}: malformed label '{text}'")]
    MalformedLabel { text: String, line: usize },

    #[error("line {line}: label '{name}' is already defined")]
    DuplicateLabel { name: String, line: usize },

    #[error("line {line}: constant {text} does not fit in 15 bits")]
    ConstantOutOfRange { text: String, line: usize },

    #[error("line {line}: '@' needs a constant or a symbol")]
    EmptyAddress { line: usize },

    #[error("line {line}: '{text}' is not a valid symbol")]
    InvalidSymbol { text: String, line: usize },

    #[error("line {line}: no free address left for variable '{name}'")]
    TooManyVariables { name: String, line: usize },
}
