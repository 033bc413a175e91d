use std::io::BufRead;

use crate::lang::{
    BinaryOp, Class, ClassVarDec, ClassVarKind, Expression, KeywordConstant, Parameter, Statement,
    SubroutineCall, SubroutineDec, SubroutineKind, Term, Type, UnaryOp, VarDec,
};
use crate::lexer::{Lexer, Span, Spanned};
use crate::parser_error::ParserError;
use crate::token::{Keyword, Token};

/// Recursive-descent parser for one class.
///
/// The parser pulls tokens from the lexer on demand and never looks further
/// than one token past the current one. Where the grammar needs that second
/// token (an identifier followed by `[`, `(` or `.`), it consumes the
/// identifier, peeks, and pushes the identifier back.
///
/// Every `parse_*` method consumes exactly the tokens of its production and
/// leaves the lexer on the first token of whatever follows. The first token
/// that does not fit aborts the parse; there is no recovery.
pub struct Parser<R> {
    lexer: Lexer<R>,
    /// Span of the most recently consumed token.
    ///
    /// Used to give end-of-input errors a real location.
    last_span: Option<Span>,
}

impl<R: BufRead> Parser<R> {
    pub fn new(lexer: Lexer<R>) -> Self {
        Parser {
            lexer,
            last_span: None,
        }
    }

    // ─────────────────────────── Token helpers ──────────────────────────

    /// Peeks the next token without consuming it.
    fn peek(&mut self) -> Result<Option<Token>, ParserError> {
        Ok(self.lexer.view_next()?.map(|s| s.token.clone()))
    }

    fn peek_symbol(&mut self) -> Result<Option<char>, ParserError> {
        Ok(match self.lexer.view_next()? {
            Some(Spanned {
                token: Token::Symbol(c),
                ..
            }) => Some(*c),
            _ => None,
        })
    }

    fn peek_is_symbol(&mut self, c: char) -> Result<bool, ParserError> {
        Ok(self.peek_symbol()? == Some(c))
    }

    /// Returns the next keyword if it is one of `options`.
    fn peek_keyword(&mut self, options: &[Keyword]) -> Result<Option<Keyword>, ParserError> {
        Ok(match self.lexer.view_next()? {
            Some(Spanned {
                token: Token::Keyword(k),
                ..
            }) if options.contains(k) => Some(*k),
            _ => None,
        })
    }

    /// Consumes the next token; end of input is an error naming `expected`.
    fn next(&mut self, expected: &str) -> Result<Spanned, ParserError> {
        match self.lexer.advance()? {
            Some(spanned) => {
                self.last_span = Some(spanned.span);
                Ok(spanned)
            }
            None => Err(self.eof(expected)),
        }
    }

    fn eof(&self, expected: &str) -> ParserError {
        let span = self.last_span.unwrap_or(Span { line: 1, col: 1 });
        ParserError::UnexpectedEof {
            expected: expected.to_string(),
            line: span.line,
            col: span.col,
        }
    }

    fn expect_symbol(&mut self, c: char) -> Result<Span, ParserError> {
        let expected = format!("'{}'", c);
        let spanned = self.next(&expected)?;
        if spanned.token.is_symbol(c) {
            Ok(spanned.span)
        } else {
            Err(unexpected(&expected, &spanned))
        }
    }

    fn expect_keyword(&mut self, options: &[Keyword]) -> Result<Keyword, ParserError> {
        let expected = options
            .iter()
            .map(|k| format!("'{}'", k))
            .collect::<Vec<_>>()
            .join(" or ");
        let spanned = self.next(&expected)?;
        match spanned.token {
            Token::Keyword(k) if options.contains(&k) => Ok(k),
            _ => Err(unexpected(&expected, &spanned)),
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<(String, Span), ParserError> {
        let spanned = self.next(what)?;
        match spanned.token {
            Token::Identifier(name) => Ok((name, spanned.span)),
            _ => Err(unexpected(what, &spanned)),
        }
    }

    // ───────────────────────────── Program ──────────────────────────────

    /// Parses the single class a source file holds.
    ///
    /// Anything after the closing `}` of the class is an error.
    pub fn parse(&mut self) -> Result<Class, ParserError> {
        let class = self.parse_class()?;
        if let Some(spanned) = self.lexer.advance()? {
            return Err(ParserError::TrailingInput {
                found: spanned.token.to_string(),
                line: spanned.span.line,
                col: spanned.span.col,
            });
        }
        Ok(class)
    }

    /// ```text
    /// class Name { classVarDec* subroutineDec* }
    /// ```
    fn parse_class(&mut self) -> Result<Class, ParserError> {
        self.expect_keyword(&[Keyword::Class])?;
        let (name, _) = self.expect_identifier("class name")?;
        self.expect_symbol('{')?;

        let mut vars = Vec::new();
        while self
            .peek_keyword(&[Keyword::Static, Keyword::Field])?
            .is_some()
        {
            vars.push(self.parse_class_var_dec()?);
        }

        let mut subroutines = Vec::new();
        while self
            .peek_keyword(&[Keyword::Constructor, Keyword::Function, Keyword::Method])?
            .is_some()
        {
            subroutines.push(self.parse_subroutine_dec()?);
        }

        self.expect_symbol('}')?;
        Ok(Class {
            name,
            vars,
            subroutines,
        })
    }

    /// ```text
    /// (static | field) type name (, name)* ;
    /// ```
    fn parse_class_var_dec(&mut self) -> Result<ClassVarDec, ParserError> {
        let kind = match self.expect_keyword(&[Keyword::Static, Keyword::Field])? {
            Keyword::Static => ClassVarKind::Static,
            _ => ClassVarKind::Field,
        };
        let ty = self.parse_type()?;
        let names = self.parse_name_list()?;
        self.expect_symbol(';')?;
        Ok(ClassVarDec { kind, ty, names })
    }

    /// `name (, name)*`
    fn parse_name_list(&mut self) -> Result<Vec<String>, ParserError> {
        let mut names = vec![self.expect_identifier("variable name")?.0];
        while self.peek_is_symbol(',')? {
            self.expect_symbol(',')?;
            names.push(self.expect_identifier("variable name")?.0);
        }
        Ok(names)
    }

    fn peek_is_type(&mut self) -> Result<bool, ParserError> {
        Ok(match self.peek()? {
            Some(Token::Identifier(_)) => true,
            Some(Token::Keyword(k)) => matches!(k, Keyword::Int | Keyword::Char | Keyword::Boolean),
            _ => false,
        })
    }

    /// `int | char | boolean | ClassName`
    fn parse_type(&mut self) -> Result<Type, ParserError> {
        let expected = "type";
        let spanned = self.next(expected)?;
        match spanned.token {
            Token::Keyword(Keyword::Int) => Ok(Type::Int),
            Token::Keyword(Keyword::Char) => Ok(Type::Char),
            Token::Keyword(Keyword::Boolean) => Ok(Type::Boolean),
            Token::Identifier(name) => Ok(Type::Class(name)),
            _ => Err(unexpected(expected, &spanned)),
        }
    }

    // ──────────────────────────── Subroutines ───────────────────────────

    /// ```text
    /// (constructor | function | method) (void | type) name ( parameterList ) subroutineBody
    /// ```
    fn parse_subroutine_dec(&mut self) -> Result<SubroutineDec, ParserError> {
        let kind = match self.expect_keyword(&[
            Keyword::Constructor,
            Keyword::Function,
            Keyword::Method,
        ])? {
            Keyword::Constructor => SubroutineKind::Constructor,
            Keyword::Function => SubroutineKind::Function,
            _ => SubroutineKind::Method,
        };

        let return_type = if self.peek_keyword(&[Keyword::Void])?.is_some() {
            self.expect_keyword(&[Keyword::Void])?;
            None
        } else {
            Some(self.parse_type()?)
        };

        let (name, span) = self.expect_identifier("subroutine name")?;
        self.expect_symbol('(')?;
        let params = self.parse_parameter_list()?;
        self.expect_symbol(')')?;

        let (locals, statements) = self.parse_subroutine_body()?;

        Ok(SubroutineDec {
            kind,
            return_type,
            name,
            params,
            locals,
            statements,
            span,
        })
    }

    /// `[ type name (, type name)* ]`
    fn parse_parameter_list(&mut self) -> Result<Vec<Parameter>, ParserError> {
        let mut params = Vec::new();
        if !self.peek_is_type()? {
            return Ok(params);
        }

        loop {
            let ty = self.parse_type()?;
            let (name, _) = self.expect_identifier("parameter name")?;
            params.push(Parameter { ty, name });

            if !self.peek_is_symbol(',')? {
                break;
            }
            self.expect_symbol(',')?;
        }
        Ok(params)
    }

    /// `{ varDec* statements }`
    fn parse_subroutine_body(&mut self) -> Result<(Vec<VarDec>, Vec<Statement>), ParserError> {
        self.expect_symbol('{')?;

        let mut locals = Vec::new();
        while self.peek_keyword(&[Keyword::Var])?.is_some() {
            locals.push(self.parse_var_dec()?);
        }

        let statements = self.parse_statements()?;
        self.expect_symbol('}')?;
        Ok((locals, statements))
    }

    /// `var type name (, name)* ;`
    fn parse_var_dec(&mut self) -> Result<VarDec, ParserError> {
        self.expect_keyword(&[Keyword::Var])?;
        let ty = self.parse_type()?;
        let names = self.parse_name_list()?;
        self.expect_symbol(';')?;
        Ok(VarDec { ty, names })
    }

    // ──────────────────────────── Statements ────────────────────────────

    fn parse_statements(&mut self) -> Result<Vec<Statement>, ParserError> {
        let mut statements = Vec::new();
        while let Some(keyword) = self.peek_keyword(&[
            Keyword::Let,
            Keyword::If,
            Keyword::While,
            Keyword::Do,
            Keyword::Return,
        ])? {
            let statement = match keyword {
                Keyword::Let => self.parse_let()?,
                Keyword::If => self.parse_if()?,
                Keyword::While => self.parse_while()?,
                Keyword::Do => self.parse_do()?,
                _ => self.parse_return()?,
            };
            statements.push(statement);
        }
        Ok(statements)
    }

    /// `let name ([ expression ])? = expression ;`
    fn parse_let(&mut self) -> Result<Statement, ParserError> {
        self.expect_keyword(&[Keyword::Let])?;
        let (name, span) = self.expect_identifier("variable name")?;

        let index = if self.peek_is_symbol('[')? {
            self.expect_symbol('[')?;
            let index = self.parse_expression()?;
            self.expect_symbol(']')?;
            Some(index)
        } else {
            None
        };

        self.expect_symbol('=')?;
        let value = self.parse_expression()?;
        self.expect_symbol(';')?;

        Ok(Statement::Let {
            name,
            index,
            value,
            span,
        })
    }

    /// `if ( expression ) { statements } (else { statements })?`
    fn parse_if(&mut self) -> Result<Statement, ParserError> {
        self.expect_keyword(&[Keyword::If])?;
        let condition = self.parse_condition()?;
        let then_branch = self.parse_block()?;

        let else_branch = if self.peek_keyword(&[Keyword::Else])?.is_some() {
            self.expect_keyword(&[Keyword::Else])?;
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// `while ( expression ) { statements }`
    fn parse_while(&mut self) -> Result<Statement, ParserError> {
        self.expect_keyword(&[Keyword::While])?;
        let condition = self.parse_condition()?;
        let body = self.parse_block()?;
        Ok(Statement::While { condition, body })
    }

    fn parse_condition(&mut self) -> Result<Expression, ParserError> {
        self.expect_symbol('(')?;
        let condition = self.parse_expression()?;
        self.expect_symbol(')')?;
        Ok(condition)
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, ParserError> {
        self.expect_symbol('{')?;
        let statements = self.parse_statements()?;
        self.expect_symbol('}')?;
        Ok(statements)
    }

    /// `do subroutineCall ;`
    fn parse_do(&mut self) -> Result<Statement, ParserError> {
        self.expect_keyword(&[Keyword::Do])?;
        let call = self.parse_subroutine_call()?;
        self.expect_symbol(';')?;
        Ok(Statement::Do(call))
    }

    /// `return expression? ;`
    fn parse_return(&mut self) -> Result<Statement, ParserError> {
        self.expect_keyword(&[Keyword::Return])?;
        let value = if self.peek_is_symbol(';')? {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_symbol(';')?;
        Ok(Statement::Return(value))
    }

    // ──────────────────────────── Expressions ───────────────────────────

    /// `term (op term)*`, flat and left to right.
    fn parse_expression(&mut self) -> Result<Expression, ParserError> {
        let first = self.parse_term()?;
        let mut rest = Vec::new();

        while let Some(op) = self.peek_symbol()?.and_then(BinaryOp::from_symbol) {
            self.next("operator")?;
            rest.push((op, self.parse_term()?));
        }

        Ok(Expression { first, rest })
    }

    /// Parses a single term.
    ///
    /// An identifier needs one token of lookahead: `[` makes it an array
    /// access, `(` or `.` a subroutine call, anything else a variable.
    fn parse_term(&mut self) -> Result<Term, ParserError> {
        let expected = "term";
        let spanned = self.next(expected)?;

        let term = match spanned.token {
            Token::IntegerConstant(n) => Term::Integer(n),
            Token::StringConstant(s) => Term::Str(s),
            Token::Keyword(Keyword::True) => Term::Keyword(KeywordConstant::True),
            Token::Keyword(Keyword::False) => Term::Keyword(KeywordConstant::False),
            Token::Keyword(Keyword::Null) => Term::Keyword(KeywordConstant::Null),
            Token::Keyword(Keyword::This) => Term::Keyword(KeywordConstant::This),

            Token::Symbol('(') => {
                let inner = self.parse_expression()?;
                self.expect_symbol(')')?;
                Term::Paren(Box::new(inner))
            }

            Token::Symbol(c) => match UnaryOp::from_symbol(c) {
                Some(op) => Term::Unary(op, Box::new(self.parse_term()?)),
                None => return Err(unexpected(expected, &spanned)),
            },

            Token::Identifier(ref name) => {
                let name = name.clone();
                let span = spanned.span;
                match self.peek_symbol()? {
                    Some('[') => {
                        self.expect_symbol('[')?;
                        let index = self.parse_expression()?;
                        self.expect_symbol(']')?;
                        Term::Index {
                            name,
                            index: Box::new(index),
                            span,
                        }
                    }
                    Some('(') | Some('.') => {
                        self.lexer.pushback(spanned);
                        Term::Call(self.parse_subroutine_call()?)
                    }
                    _ => Term::Var { name, span },
                }
            }

            _ => return Err(unexpected(expected, &spanned)),
        };

        Ok(term)
    }

    /// ```text
    /// name ( expressionList )
    /// qualifier . name ( expressionList )
    /// ```
    fn parse_subroutine_call(&mut self) -> Result<SubroutineCall, ParserError> {
        let (first, span) = self.expect_identifier("subroutine name")?;

        let (qualifier, name) = if self.peek_is_symbol('.')? {
            self.expect_symbol('.')?;
            let (name, _) = self.expect_identifier("subroutine name")?;
            (Some(first), name)
        } else {
            (None, first)
        };

        self.expect_symbol('(')?;
        let args = self.parse_expression_list()?;
        self.expect_symbol(')')?;

        Ok(SubroutineCall {
            qualifier,
            name,
            args,
            span,
        })
    }

    /// `[ expression (, expression)* ]`
    fn parse_expression_list(&mut self) -> Result<Vec<Expression>, ParserError> {
        let mut args = Vec::new();
        if self.peek_is_symbol(')')? {
            return Ok(args);
        }

        args.push(self.parse_expression()?);
        while self.peek_is_symbol(',')? {
            self.expect_symbol(',')?;
            args.push(self.parse_expression()?);
        }
        Ok(args)
    }
}

fn unexpected(expected: &str, found: &Spanned) -> ParserError {
    ParserError::Unexpected {
        expected: expected.to_string(),
        found: found.token.to_string(),
        line: found.span.line,
        col: found.span.col,
    }
}

/// Parses a complete class from source text.
pub fn parse_source(source: &str) -> Result<Class, ParserError> {
    Parser::new(Lexer::new(source)).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Class {
        parse_source(source).unwrap()
    }

    /// Wraps `body` in `class T { function void f() { ... } }` and returns its statements.
    fn statements(body: &str) -> Vec<Statement> {
        let source = format!("class T {{ function void f() {{ {} }} }}", body);
        parse(&source).subroutines.remove(0).statements
    }

    fn expr(source: &str) -> Expression {
        match statements(&format!("return {};", source)).remove(0) {
            Statement::Return(Some(e)) => e,
            other => panic!("expected return with value, got {:?}", other),
        }
    }

    #[test]
    fn test_minimal_class() {
        let class = parse("class Main { function void main() { return; } }");
        assert_eq!(class.name, "Main");
        assert!(class.vars.is_empty());
        assert_eq!(class.subroutines.len(), 1);

        let main = &class.subroutines[0];
        assert_eq!(main.kind, SubroutineKind::Function);
        assert_eq!(main.return_type, None);
        assert_eq!(main.name, "main");
        assert_eq!(main.statements, vec![Statement::Return(None)]);
    }

    #[test]
    fn test_class_vars_and_signatures() {
        let class = parse(
            "class Point {
                field int x, y;
                static Point origin;
                constructor Point new(int ax, int ay) { return this; }
                method int getX() { return x; }
            }",
        );
        assert_eq!(class.vars.len(), 2);
        assert_eq!(class.vars[0].kind, ClassVarKind::Field);
        assert_eq!(class.vars[0].names, vec!["x", "y"]);
        assert_eq!(class.vars[1].ty, Type::Class("Point".to_string()));

        let new = &class.subroutines[0];
        assert_eq!(new.kind, SubroutineKind::Constructor);
        assert_eq!(new.return_type, Some(Type::Class("Point".to_string())));
        assert_eq!(
            new.params,
            vec![
                Parameter {
                    ty: Type::Int,
                    name: "ax".to_string()
                },
                Parameter {
                    ty: Type::Int,
                    name: "ay".to_string()
                },
            ]
        );
        assert_eq!(class.subroutines[1].kind, SubroutineKind::Method);
    }

    #[test]
    fn test_var_decs() {
        let class = parse(
            "class A { function void f() { var int i, j; var Array a; let i = 0; return; } }",
        );
        let f = &class.subroutines[0];
        assert_eq!(f.locals.len(), 2);
        assert_eq!(f.locals[0].names, vec!["i", "j"]);
        assert_eq!(f.locals[1].ty, Type::Class("Array".to_string()));
        assert_eq!(f.statements.len(), 2);
    }

    #[test]
    fn test_flat_left_to_right_expression() {
        let e = expr("1 + 2 * 3");
        assert_eq!(e.first, Term::Integer(1));
        assert_eq!(
            e.rest,
            vec![
                (BinaryOp::Add, Term::Integer(2)),
                (BinaryOp::Mul, Term::Integer(3))
            ]
        );
    }

    #[test]
    fn test_identifier_disambiguation() {
        assert!(matches!(expr("a").first, Term::Var { ref name, .. } if name == "a"));

        match expr("a[i + 1]").first {
            Term::Index { name, index, .. } => {
                assert_eq!(name, "a");
                assert_eq!(index.rest.len(), 1);
            }
            other => panic!("expected index, got {:?}", other),
        }

        match expr("p.getX()").first {
            Term::Call(call) => {
                assert_eq!(call.qualifier.as_deref(), Some("p"));
                assert_eq!(call.name, "getX");
                assert!(call.args.is_empty());
            }
            other => panic!("expected call, got {:?}", other),
        }

        match expr("max(1, b)").first {
            Term::Call(call) => {
                assert_eq!(call.qualifier, None);
                assert_eq!(call.name, "max");
                assert_eq!(call.args.len(), 2);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_call_span_points_at_first_identifier() {
        match expr("Math.abs(x)").first {
            Term::Call(call) => assert_eq!(call.span, Span { line: 1, col: 38 }),
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_and_parens() {
        let e = expr("-(x) & ~true");
        assert!(matches!(e.first, Term::Unary(UnaryOp::Neg, ref inner) if matches!(**inner, Term::Paren(_))));
        assert_eq!(e.rest.len(), 1);
        assert_eq!(
            e.rest[0],
            (
                BinaryOp::And,
                Term::Unary(UnaryOp::Not, Box::new(Term::Keyword(KeywordConstant::True)))
            )
        );
    }

    #[test]
    fn test_statements() {
        let s = statements(
            "let a[1] = \"hi\";
             if (x < 3) { do Output.println(); } else { let x = null; }
             while (~(x = 0)) { let x = x - 1; }
             return x;",
        );
        assert_eq!(s.len(), 4);
        assert!(matches!(&s[0], Statement::Let { index: Some(_), value, .. } if value.first == Term::Str("hi".to_string())));
        assert!(matches!(&s[1], Statement::If { else_branch: Some(b), .. } if b.len() == 1));
        assert!(matches!(&s[2], Statement::While { body, .. } if body.len() == 1));
        assert!(matches!(&s[3], Statement::Return(Some(_))));
    }

    #[test]
    fn test_if_without_else() {
        let s = statements("if (true) { } return;");
        assert!(matches!(&s[0], Statement::If { then_branch, else_branch: None, .. } if then_branch.is_empty()));
    }

    #[test]
    fn test_missing_semicolon_reports_position() {
        let err = parse_source("class A {\n  function void f() {\n    return\n  }\n}").unwrap_err();
        match err {
            ParserError::Unexpected {
                expected,
                found,
                line,
                col,
            } => {
                assert_eq!(expected, "term");
                assert_eq!(found, "'}'");
                assert_eq!((line, col), (4, 3));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_keyword() {
        let err = parse_source("klass A { }").unwrap_err();
        assert!(matches!(err, ParserError::Unexpected { ref expected, line: 1, col: 1, .. } if expected == "'class'"));
    }

    #[test]
    fn test_unexpected_eof() {
        let err = parse_source("class A {\n  field int x;").unwrap_err();
        assert!(
            matches!(err, ParserError::UnexpectedEof { ref expected, line: 2, col: 14 } if expected == "'}'"),
            "got {:?}",
            err
        );
    }

    #[test]
    fn test_trailing_input() {
        let err = parse_source("class A { } class B { }").unwrap_err();
        assert!(matches!(err, ParserError::TrailingInput { line: 1, col: 13, .. }));
    }

    #[test]
    fn test_call_requires_parens() {
        let err = parse_source("class A { function void f() { do g; return; } }").unwrap_err();
        assert!(matches!(err, ParserError::Unexpected { ref expected, .. } if expected == "'('"));
    }

    #[test]
    fn test_lexer_errors_propagate() {
        let err = parse_source("class A { function void f() { return \"open; } }").unwrap_err();
        assert!(matches!(err, ParserError::Lexer(_)));
        assert_eq!(err.position(), Some((1, 38)));
    }

    #[test]
    fn test_comments_are_invisible() {
        let class = parse(
            "/** doc */ class /* here */ A { // trailing
             function void f() { return; } }",
        );
        assert_eq!(class.name, "A");
    }
}
