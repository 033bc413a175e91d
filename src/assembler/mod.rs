//! Two-pass assembler for the 16-bit target.
//!
//! The first pass binds every `(LABEL)` to the address of the instruction
//! that follows it. The second pass encodes instructions, allocating RAM from
//! address 16 to each symbol that is neither predefined nor a label.

pub mod error;
pub mod instruction;
pub mod symbols;

use log::{debug, trace};

pub use error::AsmError;
pub use instruction::{Address, Computation, Dest, Instruction, Jump};
pub use symbols::{Symbols, VariableAllocator};

/// Removes a `//` comment and every blank from one source line.
fn clean_line(line: &str) -> String {
    let code = match line.find("//") {
        Some(at) => &line[..at],
        None => line,
    };
    code.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Assembles a program into machine words.
pub fn assemble(source: &str) -> Result<Vec<u16>, AsmError> {
    let mut symbols = Symbols::new();
    let mut program: Vec<(usize, Instruction)> = Vec::new();

    // pass 1
    for (i, raw) in source.lines().enumerate() {
        let line = i + 1;
        let text = clean_line(raw);
        if text.is_empty() {
            continue;
        }
        match Instruction::parse(&text, line)? {
            Instruction::Label(name) => {
                let address = program.len() as u16;
                if !symbols.define(&name, address) {
                    return Err(AsmError::DuplicateLabel { name, line });
                }
                trace!("label {} = {}", name, address);
            }
            instruction => program.push((line, instruction)),
        }
    }

    // pass 2
    let mut variables = VariableAllocator::new();
    let mut words = Vec::with_capacity(program.len());
    for (line, instruction) in &program {
        let address = match instruction {
            Instruction::Address(Address::Constant(value)) => *value,
            Instruction::Address(Address::Symbol(name)) => match symbols.get(name) {
                Some(address) => address,
                None => {
                    let address = variables.allocate().ok_or_else(|| AsmError::TooManyVariables {
                        name: name.clone(),
                        line: *line,
                    })?;
                    trace!("variable {} = {}", name, address);
                    // Fresh name, so the binding always succeeds.
                    let _ = symbols.define(name, address);
                    address
                }
            },
            _ => 0,
        };
        words.push(instruction.encode(address));
    }

    debug!("assembled {} instructions", words.len());
    Ok(words)
}

/// Renders words as text, one 16-digit binary word per line.
pub fn render(words: &[u16]) -> String {
    let mut text = String::with_capacity(words.len() * 17);
    for word in words {
        text.push_str(&format!("{:016b}\n", word));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_two_constants() {
        let words = assemble("@2\nD=A\n@3\nD=D+A\n@0\nM=D\n").unwrap();
        let text = render(&words);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "0000000000000010",
                "1110110000010000",
                "0000000000000011",
                "1110000010010000",
                "0000000000000000",
                "1110001100001000",
            ]
        );
    }

    #[test]
    fn test_comments_and_blanks_are_ignored() {
        let words = assemble("// header\n\n  @ 5 // load\n\tD = A ; JGT\n").unwrap();
        assert_eq!(words, vec![5, 0b1110110000010001]);
    }

    #[test]
    fn test_labels_bind_to_next_instruction() {
        let source = "(START)\n@END\n0;JMP\n(END)\n@START\n0;JMP\n";
        let words = assemble(source).unwrap();
        assert_eq!(words[0], 2);
        assert_eq!(words[2], 0);
    }

    #[test]
    fn test_forward_label_is_not_a_variable() {
        let words = assemble("@LOOP\n@i\n(LOOP)\n@i\n@j\n").unwrap();
        assert_eq!(words, vec![2, 16, 16, 17]);
    }

    #[test]
    fn test_predefined_symbols() {
        let words = assemble("@SP\n@THAT\n@R13\n@SCREEN\n@KBD\n").unwrap();
        assert_eq!(words, vec![0, 4, 13, 16384, 24576]);
    }

    #[test]
    fn test_duplicate_labels() {
        assert_eq!(
            assemble("(A)\n@1\n(A)\n"),
            Err(AsmError::DuplicateLabel {
                name: "A".to_string(),
                line: 3
            })
        );
        assert!(matches!(
            assemble("(SP)\n@1\n"),
            Err(AsmError::DuplicateLabel { line: 1, .. })
        ));
    }

    #[test]
    fn test_error_lines_count_blank_lines() {
        let err = assemble("@1\n\n// x\nD=Q\n").unwrap_err();
        assert_eq!(
            err,
            AsmError::InvalidComputation {
                text: "Q".to_string(),
                line: 4
            }
        );
        assert_eq!(err.to_string(), "line 4: invalid computation 'Q'");
    }
}
