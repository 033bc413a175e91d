use crate::lang::{
    Class, ClassVarDec, ClassVarKind, Expression, KeywordConstant, Statement, SubroutineCall,
    SubroutineDec, SubroutineKind, Term, Type,
};
use crate::token::{Keyword, Token};

const INDENT: &str = "  ";

/// Renders the structural trace of a parsed class.
///
/// Every grammar production becomes an element pair and every token a leaf
/// such as `<keyword> class </keyword>`. The tree carries every token the
/// source had, so the trace is rebuilt from it rather than recorded during
/// parsing.
pub struct StructureWriter {
    out: String,
    depth: usize,
}

impl Default for StructureWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureWriter {
    pub fn new() -> Self {
        StructureWriter {
            out: String::new(),
            depth: 0,
        }
    }

    pub fn write(mut self, class: &Class) -> String {
        self.class(class);
        self.out
    }

    fn open(&mut self, tag: &str) {
        self.line(&format!("<{}>", tag));
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth -= 1;
        self.line(&format!("</{}>", tag));
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn token(&mut self, token: Token) {
        let tag = token.kind().tag();
        self.line(&format!("<{}> {} </{}>", tag, escape(&token.text()), tag));
    }

    fn keyword(&mut self, k: Keyword) {
        self.token(Token::Keyword(k));
    }

    fn symbol(&mut self, c: char) {
        self.token(Token::Symbol(c));
    }

    fn identifier(&mut self, name: &str) {
        self.token(Token::Identifier(name.to_string()));
    }

    fn ty(&mut self, ty: &Type) {
        match ty {
            Type::Int => self.keyword(Keyword::Int),
            Type::Char => self.keyword(Keyword::Char),
            Type::Boolean => self.keyword(Keyword::Boolean),
            Type::Class(name) => self.identifier(name),
        }
    }

    fn names(&mut self, names: &[String]) {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.symbol(',');
            }
            self.identifier(name);
        }
    }

    // ───────────────────────────── Program ──────────────────────────────

    fn class(&mut self, class: &Class) {
        self.open("class");
        self.keyword(Keyword::Class);
        self.identifier(&class.name);
        self.symbol('{');
        for dec in &class.vars {
            self.class_var_dec(dec);
        }
        for sub in &class.subroutines {
            self.subroutine_dec(sub);
        }
        self.symbol('}');
        self.close("class");
    }

    fn class_var_dec(&mut self, dec: &ClassVarDec) {
        self.open("classVarDec");
        self.keyword(match dec.kind {
            ClassVarKind::Static => Keyword::Static,
            ClassVarKind::Field => Keyword::Field,
        });
        self.ty(&dec.ty);
        self.names(&dec.names);
        self.symbol(';');
        self.close("classVarDec");
    }

    fn subroutine_dec(&mut self, sub: &SubroutineDec) {
        self.open("subroutineDec");
        self.keyword(match sub.kind {
            SubroutineKind::Constructor => Keyword::Constructor,
            SubroutineKind::Function => Keyword::Function,
            SubroutineKind::Method => Keyword::Method,
        });
        match &sub.return_type {
            Some(ty) => self.ty(ty),
            None => self.keyword(Keyword::Void),
        }
        self.identifier(&sub.name);

        self.symbol('(');
        self.open("parameterList");
        for (i, param) in sub.params.iter().enumerate() {
            if i > 0 {
                self.symbol(',');
            }
            self.ty(&param.ty);
            self.identifier(&param.name);
        }
        self.close("parameterList");
        self.symbol(')');

        self.open("subroutineBody");
        self.symbol('{');
        for dec in &sub.locals {
            self.open("varDec");
            self.keyword(Keyword::Var);
            self.ty(&dec.ty);
            self.names(&dec.names);
            self.symbol(';');
            self.close("varDec");
        }
        self.statements(&sub.statements);
        self.symbol('}');
        self.close("subroutineBody");

        self.close("subroutineDec");
    }

    // ──────────────────────────── Statements ────────────────────────────

    fn statements(&mut self, statements: &[Statement]) {
        self.open("statements");
        for statement in statements {
            self.statement(statement);
        }
        self.close("statements");
    }

    fn block(&mut self, statements: &[Statement]) {
        self.symbol('{');
        self.statements(statements);
        self.symbol('}');
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Let {
                name, index, value, ..
            } => {
                self.open("letStatement");
                self.keyword(Keyword::Let);
                self.identifier(name);
                if let Some(index) = index {
                    self.symbol('[');
                    self.expression(index);
                    self.symbol(']');
                }
                self.symbol('=');
                self.expression(value);
                self.symbol(';');
                self.close("letStatement");
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.open("ifStatement");
                self.keyword(Keyword::If);
                self.symbol('(');
                self.expression(condition);
                self.symbol(')');
                self.block(then_branch);
                if let Some(else_branch) = else_branch {
                    self.keyword(Keyword::Else);
                    self.block(else_branch);
                }
                self.close("ifStatement");
            }
            Statement::While { condition, body } => {
                self.open("whileStatement");
                self.keyword(Keyword::While);
                self.symbol('(');
                self.expression(condition);
                self.symbol(')');
                self.block(body);
                self.close("whileStatement");
            }
            Statement::Do(call) => {
                self.open("doStatement");
                self.keyword(Keyword::Do);
                self.call(call);
                self.symbol(';');
                self.close("doStatement");
            }
            Statement::Return(value) => {
                self.open("returnStatement");
                self.keyword(Keyword::Return);
                if let Some(value) = value {
                    self.expression(value);
                }
                self.symbol(';');
                self.close("returnStatement");
            }
        }
    }

    // ──────────────────────────── Expressions ───────────────────────────

    fn expression(&mut self, expr: &Expression) {
        self.open("expression");
        self.term(&expr.first);
        for (op, term) in &expr.rest {
            self.symbol(op.symbol());
            self.term(term);
        }
        self.close("expression");
    }

    fn term(&mut self, term: &Term) {
        self.open("term");
        match term {
            Term::Integer(n) => self.token(Token::IntegerConstant(*n)),
            Term::Str(s) => self.token(Token::StringConstant(s.clone())),
            Term::Keyword(k) => self.keyword(match k {
                KeywordConstant::True => Keyword::True,
                KeywordConstant::False => Keyword::False,
                KeywordConstant::Null => Keyword::Null,
                KeywordConstant::This => Keyword::This,
            }),
            Term::Var { name, .. } => self.identifier(name),
            Term::Index { name, index, .. } => {
                self.identifier(name);
                self.symbol('[');
                self.expression(index);
                self.symbol(']');
            }
            Term::Call(call) => self.call(call),
            Term::Paren(inner) => {
                self.symbol('(');
                self.expression(inner);
                self.symbol(')');
            }
            Term::Unary(op, operand) => {
                self.symbol(op.symbol());
                self.term(operand);
            }
        }
        self.close("term");
    }

    fn call(&mut self, call: &SubroutineCall) {
        self.open("subroutineCall");
        if let Some(qualifier) = &call.qualifier {
            self.identifier(qualifier);
            self.symbol('.');
        }
        self.identifier(&call.name);
        self.symbol('(');
        self.open("expressionList");
        for (i, arg) in call.args.iter().enumerate() {
            if i > 0 {
                self.symbol(',');
            }
            self.expression(arg);
        }
        self.close("expressionList");
        self.symbol(')');
        self.close("subroutineCall");
    }
}

/// Replaces `<`, `>` and `&` with their entities.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
