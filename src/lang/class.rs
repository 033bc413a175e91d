use super::node::Statement;
use crate::lexer::Span;

/// Declared type of a variable, parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Char,
    Boolean,
    /// A class name used as a type.
    Class(String),
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Char => write!(f, "char"),
            Type::Boolean => write!(f, "boolean"),
            Type::Class(name) => write!(f, "{}", name),
        }
    }
}

/// `class Name { classVarDec* subroutineDec* }`
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub name: String,
    pub vars: Vec<ClassVarDec>,
    pub subroutines: Vec<SubroutineDec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassVarKind {
    Static,
    Field,
}

/// `static int a, b;` / `field Point p;`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassVarDec {
    pub kind: ClassVarKind,
    pub ty: Type,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

/// One `constructor`, `function` or `method` with its body.
#[derive(Debug, Clone, PartialEq)]
pub struct SubroutineDec {
    pub kind: SubroutineKind,
    /// `None` for `void`.
    pub return_type: Option<Type>,
    pub name: String,
    pub params: Vec<Parameter>,
    pub locals: Vec<VarDec>,
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub ty: Type,
    pub name: String,
}

/// `var int i, j;`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDec {
    pub ty: Type,
    pub names: Vec<String>,
}
