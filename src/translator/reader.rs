use crate::bytecode::{ArithmeticOp, Command, Segment};
use crate::translator::translate_error::{CommandError, TranslateError};

/// Reads bytecode text into commands paired with their 1-based line numbers.
///
/// `//` starts a comment that runs to the end of the line; blank lines are
/// skipped. The first malformed line aborts the read.
pub fn read_commands(file: &str, text: &str) -> Result<Vec<(usize, Command)>, TranslateError> {
    let mut commands = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = match raw.find("//") {
            Some(at) => &raw[..at],
            None => raw,
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        let command = parse_command(&words).map_err(|source| TranslateError {
            file: file.to_string(),
            line: i + 1,
            source,
        })?;
        commands.push((i + 1, command));
    }
    Ok(commands)
}

/// Parses one command from its whitespace-separated words.
pub fn parse_command(words: &[&str]) -> Result<Command, CommandError> {
    let Some((&verb, args)) = words.split_first() else {
        return Err(CommandError::UnknownCommand(String::new()));
    };

    if let Some(op) = ArithmeticOp::from_name(verb) {
        arity(verb, args, 0)?;
        return Ok(Command::Arithmetic(op));
    }

    let command = match verb {
        "push" | "pop" => {
            arity(verb, args, 2)?;
            let segment = Segment::from_name(args[0])
                .ok_or_else(|| CommandError::UnknownSegment(args[0].to_string()))?;
            let index = index(args[1])?;
            if verb == "push" {
                Command::Push(segment, index)
            } else {
                Command::Pop(segment, index)
            }
        }
        "label" => {
            arity(verb, args, 1)?;
            check_name(args[0])?;
            Command::Label(args[0].to_string())
        }
        "goto" => {
            arity(verb, args, 1)?;
            check_name(args[0])?;
            Command::Goto(args[0].to_string())
        }
        "if-goto" => {
            arity(verb, args, 1)?;
            check_name(args[0])?;
            Command::IfGoto(args[0].to_string())
        }
        "function" => {
            arity(verb, args, 2)?;
            check_name(args[0])?;
            Command::Function {
                name: args[0].to_string(),
                n_locals: index(args[1])?,
            }
        }
        "call" => {
            arity(verb, args, 2)?;
            check_name(args[0])?;
            Command::Call {
                name: args[0].to_string(),
                n_args: index(args[1])?,
            }
        }
        "return" => {
            arity(verb, args, 0)?;
            Command::Return
        }
        _ => return Err(CommandError::UnknownCommand(verb.to_string())),
    };
    Ok(command)
}

fn arity(command: &str, args: &[&str], expected: usize) -> Result<(), CommandError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(CommandError::ArgumentCount {
            command: command.to_string(),
            expected,
            found: args.len(),
        })
    }
}

/// Accepts `[A-Za-z_.$][A-Za-z0-9_.$]*`, the names labels and functions may
/// carry. `:` is left out so it stays free for translator-made labels.
pub fn check_name(name: &str) -> Result<(), CommandError> {
    let name_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$');
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if name_char(first) && !first.is_ascii_digit() && chars.all(name_char) => {
            Ok(())
        }
        _ => Err(CommandError::InvalidName(name.to_string())),
    }
}

fn index(text: &str) -> Result<u16, CommandError> {
    text.parse()
        .map_err(|_| CommandError::InvalidIndex(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_every_verb() {
        let text = "\
// header comment
function Main.main 2
  push constant 7   // inline
pop local 1

label LOOP
if-goto LOOP
goto END
call Math.multiply 2
add
return
";
        let commands = read_commands("Main", text).unwrap();
        let lines: Vec<usize> = commands.iter().map(|(line, _)| *line).collect();
        assert_eq!(lines, vec![2, 3, 4, 6, 7, 8, 9, 10, 11]);
        assert_eq!(commands[1].1, Command::Push(Segment::Constant, 7));
        assert_eq!(commands[2].1, Command::Pop(Segment::Local, 1));
        assert_eq!(
            commands[6].1,
            Command::Call {
                name: "Math.multiply".to_string(),
                n_args: 2
            }
        );
        assert_eq!(commands[7].1, Command::Arithmetic(ArithmeticOp::Add));
        assert_eq!(commands[8].1, Command::Return);
    }

    #[test]
    fn test_text_protocol_reads_back() {
        let text = "function A.f 1\npush argument 0\nif-goto A$x\nneg\nreturn\n";
        let rendered: String = read_commands("A", text)
            .unwrap()
            .iter()
            .map(|(_, c)| format!("{}\n", c))
            .collect();
        assert_eq!(rendered, text);
    }

    #[test]
    fn test_errors_carry_file_and_line() {
        let err = read_commands("Foo", "push constant 1\n\nmul\n").unwrap_err();
        assert_eq!(err.file, "Foo");
        assert_eq!(err.line, 3);
        assert_eq!(err.source, CommandError::UnknownCommand("mul".to_string()));
        assert_eq!(err.to_string(), "Foo:3: unknown command 'mul'");
    }

    #[test]
    fn test_malformed_commands() {
        assert_eq!(
            parse_command(&["push", "heap", "1"]),
            Err(CommandError::UnknownSegment("heap".to_string()))
        );
        assert_eq!(
            parse_command(&["push", "local", "-1"]),
            Err(CommandError::InvalidIndex("-1".to_string()))
        );
        assert_eq!(
            parse_command(&["pop", "local"]),
            Err(CommandError::ArgumentCount {
                command: "pop".to_string(),
                expected: 2,
                found: 1
            })
        );
        assert!(matches!(
            parse_command(&["add", "1"]),
            Err(CommandError::ArgumentCount { expected: 0, found: 1, .. })
        ));
        assert!(matches!(
            parse_command(&["return", "x"]),
            Err(CommandError::ArgumentCount { .. })
        ));
        assert_eq!(
            parse_command(&[]),
            Err(CommandError::UnknownCommand(String::new()))
        );
    }

    #[test]
    fn test_names_exclude_colon() {
        assert_eq!(
            parse_command(&["label", "ret:B.g.0"]),
            Err(CommandError::InvalidName("ret:B.g.0".to_string()))
        );
        assert_eq!(
            parse_command(&["call", "CMP:TRUE.0", "0"]),
            Err(CommandError::InvalidName("CMP:TRUE.0".to_string()))
        );
        assert_eq!(
            parse_command(&["goto", "1abc"]),
            Err(CommandError::InvalidName("1abc".to_string()))
        );
        assert_eq!(
            parse_command(&["if-goto", "ret.B.g.0"]),
            Ok(Command::IfGoto("ret.B.g.0".to_string()))
        );
        assert_eq!(
            parse_command(&["function", "Main$_x.1", "0"]),
            Ok(Command::Function {
                name: "Main$_x.1".to_string(),
                n_locals: 0
            })
        );
    }
}
