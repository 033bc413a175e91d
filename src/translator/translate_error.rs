use thiserror::Error;

use crate::bytecode::Segment;

/// A single bytecode command that cannot be read or lowered.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("unknown segment '{0}'")]
    UnknownSegment(String),

    #[error("'{command}' takes {expected} argument(s), found {found}")]
    ArgumentCount {
        command: String,
        expected: usize,
        found: usize,
    },

    #[error("'{0}' is not a valid label or function name")]
    InvalidName(String),

    #[error("'{0}' is not a valid index")]
    InvalidIndex(String),

    #[error("cannot pop into the constant segment")]
    PopConstant,

    #[error("index {index} is out of range for segment '{segment}'")]
    IndexOutOfRange { segment: Segment, index: u16 },
}

/// A `CommandError` located in its bytecode file.
#[derive(Debug, Error)]
#[error("{file}:{line}: {source}")]
pub struct TranslateError {
    pub file: String,
    /// 1-based line in the bytecode text, or the command number for a
    /// module loaded from a binary image.
    pub line: usize,
    pub source: CommandError,
}
