//! Bytecode-to-assembly translation.
//!
//! `reader` turns bytecode text into `Command`s, `writer` lowers commands to
//! assembly for the stack machine's call-frame protocol.

pub mod reader;
pub mod translate_error;
pub mod writer;

pub use reader::read_commands;
pub use translate_error::{CommandError, TranslateError};
pub use writer::{translate_units, Translator, TranslatorOptions};
