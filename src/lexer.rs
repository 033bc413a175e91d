use std::io::{BufRead, Cursor};

use log::trace;
use thiserror::Error;

use crate::char_stream::CharStream;
use crate::token::{Keyword, Token};

/// Largest integer constant the language accepts.
pub const MAX_INTEGER: u16 = 32767;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

#[derive(Debug, Error)]
pub enum LexerError {
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{line}:{col}: unterminated string literal")]
    UnterminatedString { line: usize, col: usize },

    #[error("{line}:{col}: unterminated block comment")]
    UnterminatedComment { line: usize, col: usize },

    #[error("{line}:{col}: integer constant {text} is out of range (0..={max})", max = MAX_INTEGER)]
    IntegerOutOfRange { text: String, line: usize, col: usize },

    #[error("{line}:{col}: character {ch:?} has no code in 0..={max}", max = MAX_INTEGER)]
    UnrepresentableChar { ch: char, line: usize, col: usize },

    #[error("{line}:{col}: string constant is longer than {max} characters", max = MAX_INTEGER)]
    StringTooLong { line: usize, col: usize },
}

/// Pull-based tokenizer.
///
/// Tokens are classified lazily from the character stream. `view_next`
/// memoizes the classified token on the lookahead stack, `advance` pops it, and
/// `pushback` returns an already consumed token to the front of the stream.
/// The stack is unbounded, so nested lookahead is safe.
pub struct Lexer<R> {
    stream: CharStream<R>,
    lookahead: Vec<Spanned>,
}

impl Lexer<Cursor<Vec<u8>>> {
    pub fn new(source: &str) -> Self {
        Lexer::from_reader(Cursor::new(source.as_bytes().to_vec()))
    }
}

impl<R: BufRead> Lexer<R> {
    pub fn from_reader(reader: R) -> Self {
        Lexer {
            stream: CharStream::new(reader),
            lookahead: Vec::new(),
        }
    }

    fn span(&self) -> Span {
        let (line, col) = self.stream.position();
        Span { line, col }
    }

    /// Skips whitespace, `// ...` line comments and `/* ... */` block comments.
    ///
    /// A `/` that does not open a comment is pushed back together with the
    /// character that followed it.
    fn skip_to_next(&mut self) -> Result<(), LexerError> {
        loop {
            let start = self.span();
            match self.stream.next()? {
                None => return Ok(()),
                Some(ch) if ch.is_whitespace() => continue,
                Some('/') => match self.stream.next()? {
                    Some('/') => self.skip_line_comment()?,
                    Some('*') => self.skip_block_comment(start)?,
                    other => {
                        self.stream.pushback(other);
                        self.stream.pushback(Some('/'));
                        return Ok(());
                    }
                },
                Some(ch) => {
                    self.stream.pushback(Some(ch));
                    return Ok(());
                }
            }
        }
    }

    fn skip_line_comment(&mut self) -> Result<(), LexerError> {
        while let Some(ch) = self.stream.next()? {
            if ch == '\n' {
                break;
            }
        }
        Ok(())
    }

    /// Scans for the first `*/`. Block comments do not nest.
    fn skip_block_comment(&mut self, start: Span) -> Result<(), LexerError> {
        let mut prev = self.stream.next()?;
        loop {
            if prev.is_none() {
                return Err(LexerError::UnterminatedComment {
                    line: start.line,
                    col: start.col,
                });
            }
            let cur = self.stream.next()?;
            if prev == Some('*') && cur == Some('/') {
                return Ok(());
            }
            prev = cur;
        }
    }

    /// Every character of a string constant must have a code that fits an
    /// integer constant, and so must the length.
    fn read_string(&mut self, span: Span) -> Result<Token, LexerError> {
        let mut string = String::new();
        let mut len = 0u16;
        loop {
            let at = self.span();
            match self.stream.next()? {
                Some('"') => return Ok(Token::StringConstant(string)),
                Some('\n') | None => {
                    return Err(LexerError::UnterminatedString {
                        line: span.line,
                        col: span.col,
                    });
                }
                Some(ch) if u32::from(ch) > u32::from(MAX_INTEGER) => {
                    return Err(LexerError::UnrepresentableChar {
                        ch,
                        line: at.line,
                        col: at.col,
                    });
                }
                Some(_) if len == MAX_INTEGER => {
                    return Err(LexerError::StringTooLong {
                        line: span.line,
                        col: span.col,
                    });
                }
                Some(ch) => {
                    string.push(ch);
                    len += 1;
                }
            }
        }
    }

    fn read_integer(&mut self, span: Span) -> Result<Token, LexerError> {
        let mut digits = String::new();
        loop {
            match self.stream.next()? {
                Some(ch) if ch.is_ascii_digit() => digits.push(ch),
                other => {
                    self.stream.pushback(other);
                    break;
                }
            }
        }

        match digits.parse::<u16>() {
            Ok(value) if value <= MAX_INTEGER => Ok(Token::IntegerConstant(value)),
            _ => Err(LexerError::IntegerOutOfRange {
                text: digits,
                line: span.line,
                col: span.col,
            }),
        }
    }

    fn read_word(&mut self) -> Result<Token, LexerError> {
        let mut word = String::new();
        loop {
            match self.stream.next()? {
                Some(ch) if ch.is_alphanumeric() || ch == '_' => word.push(ch),
                other => {
                    self.stream.pushback(other);
                    break;
                }
            }
        }

        Ok(match Keyword::from_word(&word) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Identifier(word),
        })
    }

    /// Classifies the next token straight from the character stream.
    fn read_token(&mut self) -> Result<Option<Spanned>, LexerError> {
        self.skip_to_next()?;
        let span = self.span();

        let token = match self.stream.next()? {
            None => return Ok(None),
            Some('"') => self.read_string(span)?,
            Some(ch) if ch.is_ascii_digit() => {
                self.stream.pushback(Some(ch));
                self.read_integer(span)?
            }
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                self.stream.pushback(Some(ch));
                self.read_word()?
            }
            Some(ch) => Token::Symbol(ch),
        };

        trace!("{}:{} {:?}", span.line, span.col, token);
        Ok(Some(Spanned { token, span }))
    }

    /// Skips interstitial whitespace and comments; true if a real token remains.
    pub fn has_more_tokens(&mut self) -> Result<bool, LexerError> {
        if !self.lookahead.is_empty() {
            return Ok(true);
        }
        self.skip_to_next()?;
        Ok(!self.stream.at_end())
    }

    /// Returns the next token without consuming it.
    ///
    /// Repeated calls before `advance` return the same token.
    pub fn view_next(&mut self) -> Result<Option<&Spanned>, LexerError> {
        if self.lookahead.is_empty() {
            if let Some(token) = self.read_token()? {
                self.lookahead.push(token);
            }
        }
        Ok(self.lookahead.last())
    }

    /// Consumes and returns the next token.
    pub fn advance(&mut self) -> Result<Option<Spanned>, LexerError> {
        match self.lookahead.pop() {
            Some(token) => Ok(Some(token)),
            None => self.read_token(),
        }
    }

    /// Returns a consumed token to the front of the stream.
    pub fn pushback(&mut self, token: Spanned) {
        self.lookahead.push(token);
    }

    /// Drains the whole stream into a token list.
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexerError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.advance()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}
