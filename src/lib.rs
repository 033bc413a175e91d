//! A toolchain for the Hack platform.
//!
//! - `lexer`, `parser`, `symbol_table` and `bytecode` compile one class of
//!   the object language to stack-machine bytecode.
//! - `frontend` renders a parsed class as a structural trace.
//! - `translator` lowers bytecode to assembly.
//! - `assembler` turns assembly into 16-bit machine words.

pub mod assembler;
pub mod bytecode;
pub mod char_stream;
pub mod error;
pub mod frontend;
pub mod lang;
pub mod lexer;
pub mod parser;
pub mod parser_error;
pub mod symbol_table;
pub mod token;
pub mod translator;

use std::path::{Path, PathBuf};

pub use error::Error;

/// `input` with its extension replaced by `extension`.
///
/// An input without an extension is refused, so an output can never
/// overwrite its own source.
pub fn output_path(input: &Path, extension: &str) -> Result<PathBuf, Error> {
    if input.extension().is_none() {
        return Err(Error::MissingExtension {
            path: input.to_path_buf(),
        });
    }
    Ok(input.with_extension(extension))
}

/// File stem of `path`, the name a unit's statics and labels are keyed by.
pub fn unit_name(path: &Path) -> Result<String, Error> {
    if path.extension().is_none() {
        return Err(Error::MissingExtension {
            path: path.to_path_buf(),
        });
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::MissingExtension {
            path: path.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("dir/Prog.asm"), "hack").unwrap(),
            PathBuf::from("dir/Prog.hack")
        );
        assert!(matches!(
            output_path(Path::new("dir/Prog"), "hack"),
            Err(Error::MissingExtension { .. })
        ));
    }

    #[test]
    fn test_unit_name() {
        assert_eq!(unit_name(Path::new("a/b/Main.vm")).unwrap(), "Main");
        assert!(unit_name(Path::new("Makefile")).is_err());
    }
}
