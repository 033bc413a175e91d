use std::io::BufRead;

use log::debug;

use crate::{
    bytecode::{ArithmeticOp, CompileError, Emitter, Segment, VmModule},
    lang::{
        BinaryOp, Class, ClassVarKind, Expression, KeywordConstant, Statement, SubroutineCall,
        SubroutineDec, SubroutineKind, Term, Type, UnaryOp,
    },
    lexer::{Lexer, Span},
    parser::Parser,
    symbol_table::{Kind, Symbol, SymbolTable},
};

/// Lowers a parsed class to bytecode.
///
/// Names are resolved against a two-scope symbol table that is rebuilt for
/// every class and reset for every subroutine. Output goes to any `Emitter`.
pub struct Compiler<E> {
    emitter: E,
    symbols: SymbolTable,
    class_name: String,

    /// Per-subroutine counters for `if` / `while` label suffixes.
    if_count: usize,
    while_count: usize,
}

impl<E: Emitter> Compiler<E> {
    pub fn new(emitter: E) -> Self {
        Self {
            emitter,
            symbols: SymbolTable::new(),
            class_name: String::new(),
            if_count: 0,
            while_count: 0,
        }
    }

    pub fn into_emitter(self) -> E {
        self.emitter
    }

    pub fn compile_class(&mut self, class: &Class) -> Result<(), CompileError> {
        debug!("compiling class {}", class.name);
        self.symbols = SymbolTable::new();
        self.class_name = class.name.clone();

        for dec in &class.vars {
            let kind = match dec.kind {
                ClassVarKind::Static => Kind::Static,
                ClassVarKind::Field => Kind::Field,
            };
            for name in &dec.names {
                self.symbols.define(name, dec.ty.clone(), kind);
            }
        }

        for subroutine in &class.subroutines {
            self.compile_subroutine(subroutine)?;
        }
        Ok(())
    }

    // ──────────────────────────── Subroutines ───────────────────────────

    fn compile_subroutine(&mut self, sub: &SubroutineDec) -> Result<(), CompileError> {
        self.symbols.start_subroutine();
        self.if_count = 0;
        self.while_count = 0;

        if sub.kind == SubroutineKind::Method {
            let this_type = Type::Class(self.class_name.clone());
            self.symbols.define("this", this_type, Kind::Argument);
        }
        for param in &sub.params {
            self.symbols.define(&param.name, param.ty.clone(), Kind::Argument);
        }
        for dec in &sub.locals {
            for name in &dec.names {
                self.symbols.define(name, dec.ty.clone(), Kind::Local);
            }
        }

        let name = format!("{}.{}", self.class_name, sub.name);
        self.emitter.function(&name, self.symbols.var_count(Kind::Local));

        match sub.kind {
            SubroutineKind::Constructor => {
                let size = self.symbols.var_count(Kind::Field);
                self.emitter.push(Segment::Constant, size);
                self.emitter.call("Memory.alloc", 1);
                self.emitter.pop(Segment::Pointer, 0);
            }
            SubroutineKind::Method => {
                self.emitter.push(Segment::Argument, 0);
                self.emitter.pop(Segment::Pointer, 0);
            }
            SubroutineKind::Function => {}
        }

        self.compile_statements(&sub.statements)
    }

    // ──────────────────────────── Statements ────────────────────────────

    fn compile_statements(&mut self, statements: &[Statement]) -> Result<(), CompileError> {
        for statement in statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn compile_statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
        match statement {
            Statement::Let {
                name,
                index: None,
                value,
                span,
            } => {
                let target = self.resolve(name, *span)?;
                self.compile_expression(value)?;
                self.emitter.pop(target.kind.segment(), target.index);
            }

            Statement::Let {
                name,
                index: Some(index),
                value,
                span,
            } => {
                // The target address is computed before the value, so it is
                // parked in temp 0 while `that` is pointed at the element.
                let target = self.resolve(name, *span)?;
                self.emitter.push(target.kind.segment(), target.index);
                self.compile_expression(index)?;
                self.emitter.arithmetic(ArithmeticOp::Add);
                self.compile_expression(value)?;
                self.emitter.pop(Segment::Temp, 0);
                self.emitter.pop(Segment::Pointer, 1);
                self.emitter.push(Segment::Temp, 0);
                self.emitter.pop(Segment::That, 0);
            }

            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let n = self.if_count;
                self.if_count += 1;
                let if_true = format!("IF_TRUE{}", n);
                let if_false = format!("IF_FALSE{}", n);

                self.compile_expression(condition)?;
                self.emitter.if_goto(&if_true);
                self.emitter.goto(&if_false);
                self.emitter.label(&if_true);
                self.compile_statements(then_branch)?;

                match else_branch {
                    Some(else_branch) => {
                        let if_end = format!("IF_END{}", n);
                        self.emitter.goto(&if_end);
                        self.emitter.label(&if_false);
                        self.compile_statements(else_branch)?;
                        self.emitter.label(&if_end);
                    }
                    None => self.emitter.label(&if_false),
                }
            }

            Statement::While { condition, body } => {
                let n = self.while_count;
                self.while_count += 1;
                let start = format!("WHILE_EXP{}", n);
                let end = format!("WHILE_END{}", n);

                self.emitter.label(&start);
                self.compile_expression(condition)?;
                self.emitter.arithmetic(ArithmeticOp::Not);
                self.emitter.if_goto(&end);
                self.compile_statements(body)?;
                self.emitter.goto(&start);
                self.emitter.label(&end);
            }

            Statement::Do(call) => {
                self.compile_call(call)?;
                self.emitter.pop(Segment::Temp, 0);
            }

            Statement::Return(value) => {
                if let Some(value) = value {
                    self.compile_expression(value)?;
                }
                self.emitter.ret();
            }
        }
        Ok(())
    }

    // ──────────────────────────── Expressions ───────────────────────────

    fn compile_expression(&mut self, expr: &Expression) -> Result<(), CompileError> {
        self.compile_term(&expr.first)?;
        for (op, term) in &expr.rest {
            self.compile_term(term)?;
            match op {
                BinaryOp::Add => self.emitter.arithmetic(ArithmeticOp::Add),
                BinaryOp::Sub => self.emitter.arithmetic(ArithmeticOp::Sub),
                BinaryOp::And => self.emitter.arithmetic(ArithmeticOp::And),
                BinaryOp::Or => self.emitter.arithmetic(ArithmeticOp::Or),
                BinaryOp::Lt => self.emitter.arithmetic(ArithmeticOp::Lt),
                BinaryOp::Gt => self.emitter.arithmetic(ArithmeticOp::Gt),
                BinaryOp::Eq => self.emitter.arithmetic(ArithmeticOp::Eq),
                BinaryOp::Mul => self.emitter.call("Math.multiply", 2),
                BinaryOp::Div => self.emitter.call("Math.divide", 2),
            }
        }
        Ok(())
    }

    fn compile_term(&mut self, term: &Term) -> Result<(), CompileError> {
        match term {
            Term::Integer(n) => self.emitter.push(Segment::Constant, *n),

            // The lexer bounds both the length and every character code.
            Term::Str(s) => {
                self.emitter.push(Segment::Constant, s.chars().count() as u16);
                self.emitter.call("String.new", 1);
                for ch in s.chars() {
                    self.emitter.push(Segment::Constant, ch as u32 as u16);
                    self.emitter.call("String.appendChar", 2);
                }
            }

            Term::Keyword(KeywordConstant::True) => {
                self.emitter.push(Segment::Constant, 0);
                self.emitter.arithmetic(ArithmeticOp::Not);
            }
            Term::Keyword(KeywordConstant::False) | Term::Keyword(KeywordConstant::Null) => {
                self.emitter.push(Segment::Constant, 0);
            }
            Term::Keyword(KeywordConstant::This) => self.emitter.push(Segment::Pointer, 0),

            Term::Var { name, span } => {
                let symbol = self.resolve(name, *span)?;
                self.emitter.push(symbol.kind.segment(), symbol.index);
            }

            Term::Index { name, index, span } => {
                let symbol = self.resolve(name, *span)?;
                self.emitter.push(symbol.kind.segment(), symbol.index);
                self.compile_expression(index)?;
                self.emitter.arithmetic(ArithmeticOp::Add);
                self.emitter.pop(Segment::Pointer, 1);
                self.emitter.push(Segment::That, 0);
            }

            Term::Call(call) => self.compile_call(call)?,

            Term::Paren(inner) => self.compile_expression(inner)?,

            Term::Unary(op, operand) => {
                self.compile_term(operand)?;
                match op {
                    UnaryOp::Neg => self.emitter.arithmetic(ArithmeticOp::Neg),
                    UnaryOp::Not => self.emitter.arithmetic(ArithmeticOp::Not),
                }
            }
        }
        Ok(())
    }

    /// Lowers a subroutine call.
    ///
    /// - `var.name(..)` where `var` is in scope: method call on that object.
    /// - `Class.name(..)`: plain call.
    /// - `name(..)`: method call on `this`.
    fn compile_call(&mut self, call: &SubroutineCall) -> Result<(), CompileError> {
        let n_args = call.args.len() as u16;

        let (target, n_args) = match &call.qualifier {
            Some(qualifier) => match self.symbols.lookup(qualifier).cloned() {
                Some(Symbol {
                    ty: Type::Class(class),
                    kind,
                    index,
                }) => {
                    self.emitter.push(kind.segment(), index);
                    (format!("{}.{}", class, call.name), n_args + 1)
                }
                Some(object) => {
                    return Err(CompileError::PrimitiveReceiver {
                        receiver: qualifier.clone(),
                        ty: object.ty,
                        name: call.name.clone(),
                        line: call.span.line,
                        col: call.span.col,
                    });
                }
                None => (format!("{}.{}", qualifier, call.name), n_args),
            },
            None => {
                self.emitter.push(Segment::Pointer, 0);
                (format!("{}.{}", self.class_name, call.name), n_args + 1)
            }
        };

        for arg in &call.args {
            self.compile_expression(arg)?;
        }
        self.emitter.call(&target, n_args);
        Ok(())
    }

    fn resolve(&self, name: &str, span: Span) -> Result<Symbol, CompileError> {
        self.symbols
            .lookup(name)
            .cloned()
            .ok_or_else(|| CompileError::UndefinedSymbol {
                name: name.to_string(),
                line: span.line,
                col: span.col,
            })
    }
}

/// Parses and compiles one class read from `reader` into a module named `name`.
pub fn compile_reader<R: BufRead>(name: &str, reader: R) -> Result<VmModule, CompileError> {
    let class = Parser::new(Lexer::from_reader(reader)).parse()?;
    let mut compiler = Compiler::new(VmModule::new(name));
    compiler.compile_class(&class)?;
    Ok(compiler.into_emitter())
}

/// Parses and compiles one class from source text.
pub fn compile_source(name: &str, source: &str) -> Result<VmModule, CompileError> {
    compile_reader(name, source.as_bytes())
}
