use std::fmt::Write;

use crate::frontend::token::{Token, TokenKind};

/// Prints a token stream one token per line, for `--tokens`.
pub struct TokenDumper {
    pub color: bool,
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self { color: true }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const RED: &'static str = "\x1b[31m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn dump(&self, tokens: &[Token]) {
        print!("{}", self.render(tokens));
    }

    pub fn render(&self, tokens: &[Token]) -> String {
        let mut out = String::new();
        for token in tokens {
            self.render_one(&mut out, token);
        }
        out
    }

    fn render_one(&self, out: &mut String, token: &Token) {
        let group = Self::group(token.kind);
        let colr = if self.color { Self::color(token.kind) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        let _ = writeln!(
            out,
            "[{:02}:{:02}] {}{:<8} {:<16} {}{}",
            token.line,
            token.col,
            colr,
            group,
            format!("{:?}", token.kind),
            token,
            reset
        );
    }

    fn group(kind: TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            EndOfFile | EndOfInput => "END",
            Error => "ERROR",

            Unum | Inum | Fnum | Onum => "NUMBER",
            QString => "STRING",
            Symbol => "SYMBOL",

            OpenSquare | CloseSquare | OpenCurly | CloseCurly | OpenParen | CloseParen => {
                "BRACKET"
            }
            Comma | Semicolon | Colon | Dot => "PUNCT",

            Add | Sub | Mul | Slash | Mod | Inc | Dec | Not | And | Or | Assign => "OP",
            Equality | Neq | Lt | Gt | Lte | Gte => "CMP",

            _ => "KEYWORD",
        }
    }

    fn color(kind: TokenKind) -> &'static str {
        match Self::group(kind) {
            "END" => Self::DIM,
            "ERROR" => Self::RED,
            "STRING" => Self::GRN,
            "NUMBER" => Self::CYN,
            "SYMBOL" => Self::YEL,
            "OP" | "CMP" => Self::MAG,
            _ => Self::RESET,
        }
    }
}
