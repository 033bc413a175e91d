use crate::assembler::error::AsmError;
use crate::assembler::symbols::is_symbol;

/// Largest value an address instruction can load.
pub const MAX_ADDRESS: u16 = 0x7fff;

// =============================================================================
// COMPUTATION - the ALU expressions, with `M` folded onto `A`
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Computation {
    Zero,
    One,
    MinusOne,
    D,
    A,
    NotD,
    NotA,
    NegD,
    NegA,
    DPlusOne,
    APlusOne,
    DMinusOne,
    AMinusOne,
    DPlusA,
    DMinusA,
    AMinusD,
    DAndA,
    DOrA,
}

impl Computation {
    /// Parses a computation written over `A` only.
    fn from_text(text: &str) -> Option<Computation> {
        let comp = match text {
            "0" => Computation::Zero,
            "1" => Computation::One,
            "-1" => Computation::MinusOne,
            "D" => Computation::D,
            "A" => Computation::A,
            "!D" => Computation::NotD,
            "!A" => Computation::NotA,
            "-D" => Computation::NegD,
            "-A" => Computation::NegA,
            "D+1" => Computation::DPlusOne,
            "A+1" => Computation::APlusOne,
            "D-1" => Computation::DMinusOne,
            "A-1" => Computation::AMinusOne,
            "D+A" | "A+D" => Computation::DPlusA,
            "D-A" => Computation::DMinusA,
            "A-D" => Computation::AMinusD,
            "D&A" | "A&D" => Computation::DAndA,
            "D|A" | "A|D" => Computation::DOrA,
            _ => return None,
        };
        Some(comp)
    }

    /// The six `c` bits.
    pub fn code(self) -> u16 {
        match self {
            Computation::Zero => 0b101010,
            Computation::One => 0b111111,
            Computation::MinusOne => 0b111010,
            Computation::D => 0b001100,
            Computation::A => 0b110000,
            Computation::NotD => 0b001101,
            Computation::NotA => 0b110001,
            Computation::NegD => 0b001111,
            Computation::NegA => 0b110011,
            Computation::DPlusOne => 0b011111,
            Computation::APlusOne => 0b110111,
            Computation::DMinusOne => 0b001110,
            Computation::AMinusOne => 0b110010,
            Computation::DPlusA => 0b000010,
            Computation::DMinusA => 0b010011,
            Computation::AMinusD => 0b000111,
            Computation::DAndA => 0b000000,
            Computation::DOrA => 0b010101,
        }
    }
}

/// Destination registers of a compute instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dest {
    pub a: bool,
    pub d: bool,
    pub m: bool,
}

impl Dest {
    fn from_text(text: &str) -> Option<Dest> {
        let mut dest = Dest::default();
        for c in text.chars() {
            let slot = match c {
                'A' => &mut dest.a,
                'D' => &mut dest.d,
                'M' => &mut dest.m,
                _ => return None,
            };
            if *slot {
                return None;
            }
            *slot = true;
        }
        Some(dest)
    }

    pub fn code(self) -> u16 {
        (u16::from(self.a) << 2) | (u16::from(self.d) << 1) | u16::from(self.m)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Jump {
    #[default]
    Never,
    Gt,
    Eq,
    Ge,
    Lt,
    Ne,
    Le,
    Always,
}

impl Jump {
    fn from_text(text: &str) -> Option<Jump> {
        let jump = match text {
            "JGT" => Jump::Gt,
            "JEQ" => Jump::Eq,
            "JGE" => Jump::Ge,
            "JLT" => Jump::Lt,
            "JNE" => Jump::Ne,
            "JLE" => Jump::Le,
            "JMP" => Jump::Always,
            _ => return None,
        };
        Some(jump)
    }

    pub fn code(self) -> u16 {
        match self {
            Jump::Never => 0,
            Jump::Gt => 1,
            Jump::Eq => 2,
            Jump::Ge => 3,
            Jump::Lt => 4,
            Jump::Ne => 5,
            Jump::Le => 6,
            Jump::Always => 7,
        }
    }
}

// =============================================================================
// INSTRUCTION - one source line
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Constant(u16),
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `@value`
    Address(Address),
    /// `dest=comp;jump`; `memory` selects `M` over `A` as the ALU operand.
    Compute {
        dest: Dest,
        comp: Computation,
        memory: bool,
        jump: Jump,
    },
    /// `(NAME)`, a pseudo-instruction binding `NAME` to the next address.
    Label(String),
}

impl Instruction {
    /// Parses one line with comments and whitespace already removed.
    pub fn parse(text: &str, line: usize) -> Result<Instruction, AsmError> {
        if let Some(rest) = text.strip_prefix('@') {
            return parse_address(rest, line);
        }
        if text.starts_with('(') {
            return parse_label(text, line);
        }
        parse_compute(text, line)
    }

    /// Machine word for an address or compute instruction, with symbols
    /// already resolved to `address`.
    pub fn encode(&self, address: u16) -> u16 {
        match self {
            Instruction::Address(_) => address,
            Instruction::Compute {
                dest,
                comp,
                memory,
                jump,
            } => {
                0b111 << 13
                    | u16::from(*memory) << 12
                    | comp.code() << 6
                    | dest.code() << 3
                    | jump.code()
            }
            Instruction::Label(_) => 0,
        }
    }
}

fn parse_address(text: &str, line: usize) -> Result<Instruction, AsmError> {
    if text.is_empty() {
        return Err(AsmError::EmptyAddress { line });
    }
    if text.chars().all(|c| c.is_ascii_digit()) {
        return match text.parse::<u16>() {
            Ok(value) if value <= MAX_ADDRESS => Ok(Instruction::Address(Address::Constant(value))),
            _ => Err(AsmError::ConstantOutOfRange {
                text: text.to_string(),
                line,
            }),
        };
    }
    if !is_symbol(text) {
        return Err(AsmError::InvalidSymbol {
            text: text.to_string(),
            line,
        });
    }
    Ok(Instruction::Address(Address::Symbol(text.to_string())))
}

fn parse_label(text: &str, line: usize) -> Result<Instruction, AsmError> {
    match text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(name) if is_symbol(name) => Ok(Instruction::Label(name.to_string())),
        _ => Err(AsmError::MalformedLabel {
            text: text.to_string(),
            line,
        }),
    }
}

fn parse_compute(text: &str, line: usize) -> Result<Instruction, AsmError> {
    let (dest_text, rest) = match text.split_once('=') {
        Some((dest, rest)) => (Some(dest), rest),
        None => (None, text),
    };
    let (comp_text, jump_text) = match rest.split_once(';') {
        Some((comp, jump)) => (comp, Some(jump)),
        None => (rest, None),
    };

    let dest = match dest_text {
        Some(d) => Dest::from_text(d).filter(|_| !d.is_empty()).ok_or_else(|| {
            AsmError::InvalidDestination {
                text: d.to_string(),
                line,
            }
        })?,
        None => Dest::default(),
    };

    let jump = match jump_text {
        Some(j) => Jump::from_text(j).ok_or_else(|| AsmError::InvalidJump {
            text: j.to_string(),
            line,
        })?,
        None => Jump::Never,
    };

    let invalid_comp = || AsmError::InvalidComputation {
        text: comp_text.to_string(),
        line,
    };
    let memory = comp_text.contains('M');
    if memory && comp_text.contains('A') {
        return Err(invalid_comp());
    }
    let comp = Computation::from_text(&comp_text.replace('M', "A")).ok_or_else(invalid_comp)?;

    Ok(Instruction::Compute {
        dest,
        comp,
        memory,
        jump,
    })
}
