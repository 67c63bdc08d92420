//! Nested input sources.

use std::path::Path;

use thiserror::Error;

use crate::diagnostics::Location;

/// Maximum number of simultaneously open sources.
pub const MAX_FILE_NESTING: usize = 15;

/// Name given to in-memory sources opened without an explicit name.
pub const STRING_SOURCE_NAME: &str = "REPL";

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Maximum file nesting depth exceeded.")]
    NestingTooDeep,

    #[error("Cannot open input file: \"{name}\": {source}")]
    CannotOpen {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Input file is not valid UTF-8: \"{name}\": {source}")]
    NotUtf8 {
        name: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// One character read from the stack, or one of the two end markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Char(char),
    EndOfFile,
    EndOfInput,
}

impl Input {
    pub fn char(self) -> Option<char> {
        match self {
            Input::Char(c) => Some(c),
            _ => None,
        }
    }

    pub fn is(self, c: char) -> bool {
        self == Input::Char(c)
    }

    /// The C `isspace` set: space, tab, newline, vertical tab, form feed,
    /// carriage return.
    pub fn is_space(self) -> bool {
        matches!(self, Input::Char(' ' | '\t' | '\n' | '\x0b' | '\x0c' | '\r'))
    }

    pub fn is_digit(self) -> bool {
        matches!(self, Input::Char(c) if c.is_ascii_digit())
    }

    pub fn is_hex_digit(self) -> bool {
        matches!(self, Input::Char(c) if c.is_ascii_hexdigit())
    }

    pub fn is_octal_digit(self) -> bool {
        matches!(self, Input::Char('0'..='7'))
    }

    pub fn is_end(self) -> bool {
        matches!(self, Input::EndOfFile | Input::EndOfInput)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    File,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Active,
    /// END_OF_FILE was delivered; the frame still answers position queries.
    PendingClose,
    Closed,
}

#[derive(Debug)]
struct Frame {
    name: String,
    kind: SourceKind,
    chars: Vec<char>,
    pos: usize,
    pushback: Vec<char>,
    line: usize,
    col: usize,
    // column the previous line ended at, restored when a newline is pushed back
    last_col: usize,
    state: FrameState,
}

impl Frame {
    fn new(name: String, kind: SourceKind, text: &str) -> Self {
        Self {
            name,
            kind,
            chars: text.chars().collect(),
            pos: 0,
            pushback: Vec::new(),
            line: 1,
            col: 1,
            last_col: 1,
            state: FrameState::Active,
        }
    }

    fn read(&mut self) -> Option<char> {
        let ch = match self.pushback.pop() {
            Some(ch) => ch,
            None => {
                let ch = *self.chars.get(self.pos)?;
                self.pos += 1;
                ch
            }
        };

        if ch == '\n' {
            self.line += 1;
            self.last_col = self.col;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn unread(&mut self, ch: char) {
        self.pushback.push(ch);
        if ch == '\n' {
            self.line = self.line.saturating_sub(1).max(1);
            self.col = self.last_col;
        } else if self.col > 1 {
            self.col -= 1;
        } else {
            self.col = 1;
        }
    }
}

/// Stack of open input sources, top frame last.
#[derive(Debug, Default)]
pub struct InputStack {
    frames: Vec<Frame>,
}

impl InputStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a file source. The whole file is read up front.
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> Result<(), InputError> {
        let path = path.as_ref();
        let name = path.display().to_string();
        self.check_depth()?;

        let bytes = std::fs::read(path).map_err(|source| InputError::CannotOpen {
            name: name.clone(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|source| InputError::NotUtf8 {
            name: name.clone(),
            source,
        })?;
        self.push(Frame::new(name, SourceKind::File, &text));
        Ok(())
    }

    /// Push an in-memory source named `REPL`.
    pub fn open_string(&mut self, text: &str) -> Result<(), InputError> {
        self.open_named_string(STRING_SOURCE_NAME, text)
    }

    pub fn open_named_string(&mut self, name: &str, text: &str) -> Result<(), InputError> {
        self.check_depth()?;
        self.push(Frame::new(name.to_string(), SourceKind::String, text));
        Ok(())
    }

    fn check_depth(&self) -> Result<(), InputError> {
        if self.frames.len() >= MAX_FILE_NESTING {
            return Err(InputError::NestingTooDeep);
        }
        Ok(())
    }

    fn push(&mut self, frame: Frame) {
        tracing::debug!(name = %frame.name, kind = ?frame.kind, depth = self.frames.len() + 1, "input source opened");
        self.frames.push(frame);
    }

    /// Read the next character from the top frame.
    ///
    /// A frame whose END_OF_FILE has been delivered is popped first.
    pub fn next_char(&mut self) -> Input {
        if self
            .frames
            .last()
            .is_some_and(|f| f.state == FrameState::PendingClose)
        {
            self.close_top();
        }

        match self.frames.last_mut() {
            Some(frame) => match frame.read() {
                Some(ch) => Input::Char(ch),
                None => Input::EndOfFile,
            },
            None => Input::EndOfInput,
        }
    }

    /// Push a character back with exact line/column rollback. End markers
    /// are regenerated by the source itself, so pushing them back is a no-op.
    pub fn unget(&mut self, input: Input) {
        if let (Input::Char(ch), Some(frame)) = (input, self.frames.last_mut()) {
            frame.unread(ch);
        }
    }

    /// Mark the top frame as finished: its END_OF_FILE token has been built.
    pub fn finish_frame(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.state = FrameState::PendingClose;
        }
    }

    fn close_top(&mut self) {
        if let Some(mut frame) = self.frames.pop() {
            frame.state = FrameState::Closed;
            tracing::debug!(name = %frame.name, depth = self.frames.len(), "input source closed");
        }
    }

    /// Drop every frame.
    pub fn close_all(&mut self) {
        while !self.frames.is_empty() {
            self.close_top();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn top_state(&self) -> Option<FrameState> {
        self.frames.last().map(|f| f.state)
    }

    pub fn top_kind(&self) -> Option<SourceKind> {
        self.frames.last().map(|f| f.kind)
    }

    /// Name of the top source, or `"no open file"`.
    pub fn name(&self) -> &str {
        self.frames
            .last()
            .map(|f| f.name.as_str())
            .unwrap_or("no open file")
    }

    /// Line of the top source, or -1.
    pub fn line(&self) -> i64 {
        self.frames.last().map(|f| f.line as i64).unwrap_or(-1)
    }

    /// Column of the top source, or -1.
    pub fn col(&self) -> i64 {
        self.frames.last().map(|f| f.col as i64).unwrap_or(-1)
    }

    pub fn location(&self) -> Option<Location> {
        self.frames
            .last()
            .map(|f| Location::new(f.name.clone(), f.line, f.col))
    }
}
