use crate::frontend::structure::escape;
use crate::lexer::Spanned;
use crate::token::{Token, TokenKind};

/// Token listing for `--tokens`.
pub struct TokenDumper {
    pub color: bool,
    pub xml: bool, // if true, renders a flat `<tokens>` element instead of a listing
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            xml: false,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const BLU: &'static str = "\x1b[34m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn xml(mut self) -> Self {
        self.xml = true;
        self.color = false;
        self
    }

    pub fn dump(&self, tokens: &[Spanned]) {
        print!("{}", self.render(tokens));
    }

    pub fn render(&self, tokens: &[Spanned]) -> String {
        let mut out = String::new();
        if self.xml {
            out.push_str("<tokens>\n");
        }
        for s in tokens {
            out.push_str(&self.render_one(s));
            out.push('\n');
        }
        if self.xml {
            out.push_str("</tokens>\n");
        }
        out
    }

    fn render_one(&self, s: &Spanned) -> String {
        if self.xml {
            let tag = s.token.kind().tag();
            return format!("<{}> {} </{}>", tag, escape(&s.token.text()), tag);
        }

        let colr = if self.color { self.color(&s.token) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };
        format!(
            "[{:02}:{:02}] {}{:<8} {}{}",
            s.span.line,
            s.span.col,
            colr,
            self.kind(&s.token),
            s.token.text(),
            reset
        )
    }

    fn kind(&self, t: &Token) -> &'static str {
        match t.kind() {
            TokenKind::Keyword => "KEYWORD",
            TokenKind::Identifier => "IDENT",
            TokenKind::Symbol => "SYMBOL",
            TokenKind::IntegerConstant => "INT",
            TokenKind::StringConstant => "STRING",
        }
    }

    fn color(&self, t: &Token) -> &'static str {
        match t.kind() {
            TokenKind::Keyword => Self::BLU,
            TokenKind::Identifier => Self::YEL,
            TokenKind::Symbol => Self::MAG,
            TokenKind::IntegerConstant => Self::CYN,
            TokenKind::StringConstant => Self::GRN,
        }
    }
}
