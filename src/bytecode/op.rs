use serde::{Deserialize, Serialize};

// =============================================================================
// SEGMENT - addressing regions for push/pop
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    Constant,
    Local,
    Argument,
    This,
    That,
    Pointer,
    Temp,
    Static,
}

impl Segment {
    pub fn from_name(name: &str) -> Option<Segment> {
        let segment = match name {
            "constant" => Segment::Constant,
            "local" => Segment::Local,
            "argument" => Segment::Argument,
            "this" => Segment::This,
            "that" => Segment::That,
            "pointer" => Segment::Pointer,
            "temp" => Segment::Temp,
            "static" => Segment::Static,
            _ => return None,
        };
        Some(segment)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Local => "local",
            Segment::Argument => "argument",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
            Segment::Static => "static",
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ARITHMETIC - stack arithmetic and logic
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithmeticOp {
    // ( x y -- x op y )
    Add,
    Sub,
    And,
    Or,

    // ( x -- op x )
    Neg,
    Not,

    // ( x y -- bool ), true is -1
    Eq,
    Gt,
    Lt,
}

impl ArithmeticOp {
    pub fn from_name(name: &str) -> Option<ArithmeticOp> {
        let op = match name {
            "add" => ArithmeticOp::Add,
            "sub" => ArithmeticOp::Sub,
            "and" => ArithmeticOp::And,
            "or" => ArithmeticOp::Or,
            "neg" => ArithmeticOp::Neg,
            "not" => ArithmeticOp::Not,
            "eq" => ArithmeticOp::Eq,
            "gt" => ArithmeticOp::Gt,
            "lt" => ArithmeticOp::Lt,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::And => "and",
            ArithmeticOp::Or => "or",
            ArithmeticOp::Neg => "neg",
            ArithmeticOp::Not => "not",
            ArithmeticOp::Eq => "eq",
            ArithmeticOp::Gt => "gt",
            ArithmeticOp::Lt => "lt",
        }
    }
}

// =============================================================================
// COMMAND - one line of bytecode
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Arithmetic(ArithmeticOp),
    Push(Segment, u16),
    Pop(Segment, u16),

    // Control flow, labels are local to the enclosing function
    Label(String),
    Goto(String),
    IfGoto(String),

    // Functions
    Function { name: String, n_locals: u16 },
    Call { name: String, n_args: u16 },
    Return,
}

impl std::fmt::Display for Command {
    /// Formats the command in the line-oriented text protocol.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Arithmetic(op) => write!(f, "{}", op.as_str()),
            Command::Push(segment, index) => write!(f, "push {} {}", segment, index),
            Command::Pop(segment, index) => write!(f, "pop {} {}", segment, index),
            Command::Label(label) => write!(f, "label {}", label),
            Command::Goto(label) => write!(f, "goto {}", label),
            Command::IfGoto(label) => write!(f, "if-goto {}", label),
            Command::Function { name, n_locals } => write!(f, "function {} {}", name, n_locals),
            Command::Call { name, n_args } => write!(f, "call {} {}", name, n_args),
            Command::Return => write!(f, "return"),
        }
    }
}
