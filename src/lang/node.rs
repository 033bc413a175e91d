use crate::lexer::Span;

/// A statement inside a subroutine body.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let name = value;` or `let name[index] = value;`
    Let {
        name: String,
        index: Option<Expression>,
        value: Expression,
        span: Span,
    },

    /// `if (condition) { ... } else { ... }`
    If {
        condition: Expression,
        then_branch: Vec<Statement>,
        else_branch: Option<Vec<Statement>>,
    },

    /// `while (condition) { ... }`
    While {
        condition: Expression,
        body: Vec<Statement>,
    },

    /// `do call;` The call's result is discarded.
    Do(SubroutineCall),

    /// `return;` or `return value;`
    Return(Option<Expression>),
}

/// `term (op term)*`
///
/// There is no operator precedence: the operators apply strictly left to
/// right, in the order they appear in `rest`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub first: Term,
    pub rest: Vec<(BinaryOp, Term)>,
}

impl Expression {
    pub fn single(term: Term) -> Self {
        Expression {
            first: term,
            rest: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    // ───────────────────────────── Constants ────────────────────────────
    Integer(u16),
    Str(String),
    Keyword(KeywordConstant),

    // ───────────────────────────── Variables ────────────────────────────
    /// Plain variable reference.
    Var { name: String, span: Span },

    /// `name[index]`
    Index {
        name: String,
        index: Box<Expression>,
        span: Span,
    },

    // ───────────────────────────── Compound ─────────────────────────────
    Call(SubroutineCall),

    /// `( expression )`
    Paren(Box<Expression>),

    /// `-term` / `~term`
    Unary(UnaryOp, Box<Term>),
}

/// `name(args)`, `qualifier.name(args)`
///
/// Whether `qualifier` is a variable or a class name is decided by the
/// compiler against the symbol table in scope at the call site.
#[derive(Debug, Clone, PartialEq)]
pub struct SubroutineCall {
    pub qualifier: Option<String>,
    pub name: String,
    pub args: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Lt,
    Gt,
    Eq,
}

impl BinaryOp {
    pub fn from_symbol(c: char) -> Option<BinaryOp> {
        let op = match c {
            '+' => BinaryOp::Add,
            '-' => BinaryOp::Sub,
            '*' => BinaryOp::Mul,
            '/' => BinaryOp::Div,
            '&' => BinaryOp::And,
            '|' => BinaryOp::Or,
            '<' => BinaryOp::Lt,
            '>' => BinaryOp::Gt,
            '=' => BinaryOp::Eq,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
            BinaryOp::And => '&',
            BinaryOp::Or => '|',
            BinaryOp::Lt => '<',
            BinaryOp::Gt => '>',
            BinaryOp::Eq => '=',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn from_symbol(c: char) -> Option<UnaryOp> {
        match c {
            '-' => Some(UnaryOp::Neg),
            '~' => Some(UnaryOp::Not),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            UnaryOp::Neg => '-',
            UnaryOp::Not => '~',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordConstant {
    True,
    False,
    Null,
    This,
}
