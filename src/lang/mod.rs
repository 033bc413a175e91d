//! # Syntax tree
//!
//! The tree the parser builds for one class. It is consumed by the
//! structural-trace writer and by the bytecode compiler.
//!
//! ## Documentation conventions
//!
//! - Grammar fragments are written in the source language's own syntax.
//! - `span` fields point at the identifier that names the construct, so that
//!   late errors (undefined names) can still report a source position.

pub mod class;
pub mod node;

pub use class::{Class, ClassVarDec, ClassVarKind, Parameter, SubroutineDec, SubroutineKind, Type, VarDec};
pub use node::{BinaryOp, Expression, KeywordConstant, Statement, SubroutineCall, Term, UnaryOp};
