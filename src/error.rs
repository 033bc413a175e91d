use std::path::PathBuf;

use thiserror::Error;

use crate::assembler::AsmError;
use crate::bytecode::CompileError;
use crate::parser_error::ParserError;
use crate::translator::TranslateError;

/// Any failure of a toolchain run, tagged with the file it concerns.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{}: {source}", .path.display())]
    Parse { path: PathBuf, source: ParserError },

    #[error("{}: {source}", .path.display())]
    Compile { path: PathBuf, source: CompileError },

    /// Carries its own file name and line.
    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error("{}: {source}", .path.display())]
    Asm { path: PathBuf, source: AsmError },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: cannot derive an output name from a file without an extension", .path.display())]
    MissingExtension { path: PathBuf },

    #[error("{}: bad bytecode image: {source}", .path.display())]
    Image {
        path: PathBuf,
        source: postcard::Error,
    },

    #[error("{}: no {extension} files found", .path.display())]
    NoInputs { path: PathBuf, extension: String },
}
