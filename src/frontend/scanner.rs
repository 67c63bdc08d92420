use std::path::Path;

use crate::diagnostics::{Diagnostics, Location};
use crate::frontend::input::{Input, InputError, InputStack};
use crate::frontend::token::{Token, TokenKind, keyword_or_symbol};

const MAX_HEX_ESCAPE_DIGITS: usize = 8;
const MAX_DECIMAL_ESCAPE_DIGITS: usize = 10;
const MAX_OCTAL_ESCAPE_DIGITS: usize = 3;

/// Block comment automaton. `/*` has already been consumed on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentState {
    Body,
    SawStar,
    Closed,
}

/// Turns the characters of the input stack into tokens, one per call.
#[derive(Debug, Default)]
pub struct Scanner {
    input: InputStack,
    buffer: String,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_file(&mut self, path: impl AsRef<Path>) -> Result<(), InputError> {
        self.input.open_file(path)
    }

    pub fn open_string(&mut self, text: &str) -> Result<(), InputError> {
        self.input.open_string(text)
    }

    pub fn open_named_string(&mut self, name: &str, text: &str) -> Result<(), InputError> {
        self.input.open_named_string(name, text)
    }

    pub fn input(&self) -> &InputStack {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputStack {
        &mut self.input
    }

    pub fn location(&self) -> Option<Location> {
        self.input.location()
    }

    // ==========================================================================
    // Character helpers
    // ==========================================================================

    fn get(&mut self) -> Input {
        self.input.next_char()
    }

    fn unget(&mut self, ch: Input) {
        self.input.unget(ch);
    }

    fn push(&mut self, ch: Input) {
        if let Input::Char(c) = ch {
            self.buffer.push(c);
        }
    }

    fn skip_ws(&mut self) {
        loop {
            let ch = self.get();
            if !ch.is_space() {
                self.unget(ch);
                return;
            }
        }
    }

    /// Error recovery: swallow everything up to the next whitespace, which
    /// is left in the input.
    fn eat_until_ws(&mut self) {
        loop {
            let ch = self.get();
            if ch.is_space() || ch.is_end() {
                self.unget(ch);
                return;
            }
            self.push(ch);
        }
    }

    fn eat_single_line(&mut self) {
        loop {
            let ch = self.get();
            if ch.is('\n') || ch.is_end() {
                self.unget(ch);
                return;
            }
        }
    }

    fn eat_multi_line(&mut self, diag: &mut Diagnostics) {
        let mut state = CommentState::Body;
        while state != CommentState::Closed {
            let ch = self.get();
            if ch.is_end() {
                diag.syntax("unterminated comment", self.location());
                return;
            }
            state = match (state, ch) {
                (_, Input::Char('*')) => CommentState::SawStar,
                (CommentState::SawStar, Input::Char('/')) => CommentState::Closed,
                _ => CommentState::Body,
            };
        }
    }

    // ==========================================================================
    // Numbers
    // ==========================================================================

    /// Entry point for every literal that starts with a digit.
    fn read_number_top(&mut self, diag: &mut Diagnostics) -> TokenKind {
        let first = self.get();
        self.push(first);

        if !first.is('0') {
            loop {
                let ch = self.get();
                if ch.is_digit() {
                    self.push(ch);
                } else if ch.is('.') {
                    self.push(ch);
                    return self.read_float_number(diag);
                } else {
                    self.unget(ch);
                    return TokenKind::Inum;
                }
            }
        }

        let ch = self.get();
        match ch {
            Input::Char('x' | 'X') => {
                self.push(ch);
                self.read_hex_number()
            }
            Input::Char('.') => {
                self.push(ch);
                self.read_float_number(diag)
            }
            _ if ch.is_octal_digit() => {
                self.push(ch);
                let kind = self.read_octal_number(diag);
                if kind == TokenKind::Onum {
                    // the leading 0 only marks the base
                    self.buffer.remove(0);
                }
                kind
            }
            _ if ch.is_digit() => {
                self.push(ch);
                self.malformed_number("octal", diag)
            }
            _ => {
                self.unget(ch);
                TokenKind::Inum
            }
        }
    }

    fn read_hex_number(&mut self) -> TokenKind {
        loop {
            let ch = self.get();
            if ch.is_hex_digit() {
                self.push(ch);
            } else {
                self.unget(ch);
                return TokenKind::Unum;
            }
        }
    }

    fn read_octal_number(&mut self, diag: &mut Diagnostics) -> TokenKind {
        loop {
            let ch = self.get();
            if ch.is_octal_digit() {
                self.push(ch);
            } else if ch.is_digit() {
                self.push(ch);
                return self.malformed_number("octal", diag);
            } else {
                self.unget(ch);
                return TokenKind::Onum;
            }
        }
    }

    /// Called after the `.` has been consumed.
    fn read_float_number(&mut self, diag: &mut Diagnostics) -> TokenKind {
        let mut ch = self.get();
        while ch.is_digit() {
            self.push(ch);
            ch = self.get();
        }

        if !matches!(ch, Input::Char('e' | 'E')) {
            self.unget(ch);
            return TokenKind::Fnum;
        }
        self.push(ch);

        let mut ch = self.get();
        if matches!(ch, Input::Char('+' | '-')) {
            self.push(ch);
            ch = self.get();
        }
        if !ch.is_digit() {
            self.unget(ch);
            return self.malformed_number("float", diag);
        }

        while ch.is_digit() {
            self.push(ch);
            ch = self.get();
        }
        self.unget(ch);
        TokenKind::Fnum
    }

    /// Swallow the remaining digits of a bad literal and report it once.
    fn malformed_number(&mut self, what: &str, diag: &mut Diagnostics) -> TokenKind {
        loop {
            let ch = self.get();
            if ch.is_digit() {
                self.push(ch);
            } else {
                self.unget(ch);
                break;
            }
        }
        diag.syntax(
            format!("malformed {} number: {}", what, self.buffer),
            self.location(),
        );
        TokenKind::Error
    }

    // ==========================================================================
    // Strings
    // ==========================================================================

    /// Read up to `max` digits of `radix`. With a `limit`, a digit that would
    /// take the value past it is left in the input. Returns the value, the
    /// number of digits used and the first character that was not used.
    fn read_escape_digits(&mut self, radix: u32, max: usize, limit: Option<u64>) -> (u64, usize, Input) {
        let mut value: u64 = 0;
        let mut digits = 0;
        while digits < max {
            let ch = self.get();
            let next = ch
                .char()
                .and_then(|c| c.to_digit(radix))
                .map(|d| value * radix as u64 + d as u64)
                .filter(|v| limit.is_none_or(|limit| *v <= limit));
            match next {
                Some(v) => {
                    value = v;
                    digits += 1;
                }
                None => {
                    self.unget(ch);
                    return (value, digits, ch);
                }
            }
        }
        (value, digits, Input::Char(' '))
    }

    fn push_escape_value(&mut self, value: i64, diag: &mut Diagnostics) {
        match u32::try_from(value).ok().and_then(char::from_u32) {
            Some(c) => self.buffer.push(c),
            None => diag.warning(
                format!("escape value {} is not a valid character. Ignored.", value),
                self.location(),
            ),
        }
    }

    fn escape_warning(&mut self, what: &str, stop: Input, diag: &mut Diagnostics) {
        let shown = match stop {
            Input::Char(c) => c.to_string(),
            _ => "end of file".to_string(),
        };
        diag.warning(
            format!(
                "invalid {} escape code in string: '{}' is not a {} digit. Ignored.",
                what, shown, what
            ),
            self.location(),
        );
    }

    fn hex_escape(&mut self, diag: &mut Diagnostics) {
        let (value, digits, stop) = self.read_escape_digits(16, MAX_HEX_ESCAPE_DIGITS, Some(0xFF));
        if digits == 0 {
            self.escape_warning("hex", stop, diag);
        } else {
            self.push_escape_value(value as i64, diag);
        }
    }

    fn octal_escape(&mut self, diag: &mut Diagnostics) {
        let (value, digits, stop) = self.read_escape_digits(8, MAX_OCTAL_ESCAPE_DIGITS, None);
        if digits == 0 {
            self.escape_warning("octal", stop, diag);
        } else {
            self.push_escape_value(value as i64, diag);
        }
    }

    fn decimal_escape(&mut self, diag: &mut Diagnostics) {
        let sign = self.get();
        let negative = match sign {
            Input::Char('-') => true,
            Input::Char('+') => false,
            _ => {
                self.unget(sign);
                false
            }
        };

        let (value, digits, stop) = self.read_escape_digits(10, MAX_DECIMAL_ESCAPE_DIGITS, None);
        if digits == 0 {
            self.escape_warning("decimal", stop, diag);
            return;
        }
        let value = value as i64;
        self.push_escape_value(if negative { -value } else { value }, diag);
    }

    /// The backslash has been consumed. Returns false when the input ended.
    fn string_escape(&mut self, diag: &mut Diagnostics) -> bool {
        let ch = self.get();
        let Input::Char(c) = ch else {
            return false;
        };
        match c {
            'x' | 'X' => self.hex_escape(diag),
            'd' | 'D' => self.decimal_escape(diag),
            '0' => self.octal_escape(diag),
            'n' => self.buffer.push('\n'),
            'r' => self.buffer.push('\r'),
            't' => self.buffer.push('\t'),
            'b' => self.buffer.push('\x08'),
            'f' => self.buffer.push('\x0c'),
            'v' => self.buffer.push('\x0b'),
            other => self.buffer.push(other),
        }
        true
    }

    fn unterminated_string(&mut self, diag: &mut Diagnostics) -> TokenKind {
        diag.syntax("unterminated string", self.location());
        TokenKind::Error
    }

    fn line_break_in_string(&mut self, diag: &mut Diagnostics) -> TokenKind {
        diag.syntax("line breaks are not allowed in a string.", self.location());
        self.eat_until_ws();
        TokenKind::Error
    }

    fn read_dquote(&mut self, diag: &mut Diagnostics) -> TokenKind {
        loop {
            match self.get() {
                Input::Char('"') => return TokenKind::QString,
                Input::Char('\\') => {
                    if !self.string_escape(diag) {
                        return self.unterminated_string(diag);
                    }
                }
                Input::Char('\n') => return self.line_break_in_string(diag),
                Input::Char(c) => self.buffer.push(c),
                Input::EndOfFile | Input::EndOfInput => return self.unterminated_string(diag),
            }
        }
    }

    /// Verbatim: no escape processing at all.
    fn read_squote(&mut self, diag: &mut Diagnostics) -> TokenKind {
        loop {
            match self.get() {
                Input::Char('\'') => return TokenKind::QString,
                Input::Char('\n') => return self.line_break_in_string(diag),
                Input::Char(c) => self.buffer.push(c),
                Input::EndOfFile | Input::EndOfInput => return self.unterminated_string(diag),
            }
        }
    }

    // ==========================================================================
    // Words and punctuation
    // ==========================================================================

    fn read_word(&mut self) -> TokenKind {
        loop {
            let ch = self.get();
            match ch {
                Input::Char(c) if c.is_ascii_alphanumeric() || c == '_' => self.buffer.push(c),
                _ => {
                    self.unget(ch);
                    return keyword_or_symbol(&self.buffer);
                }
            }
        }
    }

    /// Extend a one-character operator to a two-character one when the next
    /// character is one of `pairs`.
    fn one_or_two(&mut self, single: TokenKind, pairs: &[(char, TokenKind)]) -> TokenKind {
        let ch = self.get();
        if let Input::Char(c) = ch {
            if let Some((_, kind)) = pairs.iter().find(|(second, _)| *second == c) {
                self.buffer.push(c);
                return *kind;
            }
        }
        self.unget(ch);
        single
    }

    /// `None` means the character was ignored.
    fn read_punct(&mut self, ch: char, diag: &mut Diagnostics) -> Option<TokenKind> {
        use TokenKind::*;

        if ch == '_' {
            self.unget(Input::Char('_'));
            return Some(self.read_word());
        }

        self.buffer.push(ch);
        let kind = match ch {
            '*' => Mul,
            '%' => Mod,
            ',' => Comma,
            ';' => Semicolon,
            ':' => Colon,
            '[' => OpenSquare,
            ']' => CloseSquare,
            '{' => OpenCurly,
            '}' => CloseCurly,
            '(' => OpenParen,
            ')' => CloseParen,
            '.' => Dot,
            '|' => Or,
            '&' => And,
            '=' => self.one_or_two(Assign, &[('=', Equality)]),
            '<' => self.one_or_two(Lt, &[('=', Lte), ('>', Neq)]),
            '>' => self.one_or_two(Gt, &[('=', Gte)]),
            '-' => self.one_or_two(Sub, &[('-', Dec)]),
            '+' => self.one_or_two(Add, &[('+', Inc)]),
            '!' => self.one_or_two(Not, &[('=', Neq)]),
            _ => {
                diag.warning(
                    format!(
                        "unrecognized character in input: '{}' (0x{:02X}). Ignored.",
                        ch, ch as u32
                    ),
                    self.location(),
                );
                self.buffer.clear();
                return None;
            }
        };
        Some(kind)
    }

    /// A `/` has been read: comment or division.
    fn comment_or_operator(&mut self, diag: &mut Diagnostics) -> Option<TokenKind> {
        let ch = self.get();
        match ch {
            Input::Char('/') => {
                self.eat_single_line();
                None
            }
            Input::Char('*') => {
                self.eat_multi_line(diag);
                None
            }
            _ => {
                self.unget(ch);
                self.buffer.push('/');
                Some(TokenKind::Slash)
            }
        }
    }

    // ==========================================================================
    // Interface
    // ==========================================================================

    /// Produce the next token. Comments and ignored characters never come
    /// out as tokens; reaching the end of a source yields END_OF_FILE and an
    /// empty stack yields END_OF_INPUT.
    pub fn next_token(&mut self, diag: &mut Diagnostics) -> Token {
        loop {
            self.skip_ws();
            self.buffer.clear();

            let ch = self.get();
            let kind = match ch {
                Input::EndOfFile => Some(TokenKind::EndOfFile),
                Input::EndOfInput => Some(TokenKind::EndOfInput),
                Input::Char('"') => Some(self.read_dquote(diag)),
                Input::Char('\'') => Some(self.read_squote(diag)),
                Input::Char('/') => self.comment_or_operator(diag),
                Input::Char(c) if c.is_ascii_digit() => {
                    self.unget(ch);
                    Some(self.read_number_top(diag))
                }
                Input::Char(c) if c.is_ascii_alphabetic() => {
                    self.unget(ch);
                    Some(self.read_word())
                }
                Input::Char(c) if c.is_ascii_punctuation() => self.read_punct(c, diag),
                Input::Char(c) => {
                    diag.warning(
                        format!(
                            "Unknown character, ignoring. (0x{:02X}) ({}) '{}'",
                            c as u32, c as u32, c
                        ),
                        self.location(),
                    );
                    None
                }
            };

            if let Some(kind) = kind {
                let token = self.make_token(kind);
                if kind == TokenKind::EndOfFile {
                    self.input.finish_frame();
                }
                tracing::trace!(kind = ?token.kind, text = %token.text, line = token.line, col = token.col, "token");
                return token;
            }
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        let (line, col) = match self.input.location() {
            Some(loc) => (loc.line, loc.col),
            None => (0, 0),
        };
        Token::new(kind, self.buffer.clone(), line, col)
    }

    /// Scan until END_OF_INPUT. The final token is included.
    pub fn tokenize(&mut self, diag: &mut Diagnostics) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token(diag);
            let done = token.kind == TokenKind::EndOfInput;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }
}
