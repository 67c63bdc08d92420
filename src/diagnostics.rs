//! Error and warning reporting.

use std::fmt;

/// A position inside a named input source.
///
/// `line` and `col` are 1-based, exactly as tracked by the input stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub name: String,
    pub line: usize,
    pub col: usize,
}

impl Location {
    pub fn new(name: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            name: name.into(),
            line,
            col,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.name, self.line, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    SyntaxError,
    Warning,
    RuntimeError,
    RuntimeWarning,
    Fatal,
}

impl Severity {
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Severity::SyntaxError | Severity::RuntimeError | Severity::Fatal
        )
    }

    fn label(self) -> &'static str {
        match self {
            Severity::SyntaxError => "Syntax Error",
            Severity::Warning => "Warning",
            Severity::RuntimeError => "RUNTIME ERROR",
            Severity::RuntimeWarning => "RUNTIME WARNING",
            Severity::Fatal => "FATAL ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<Location>,
}

impl fmt::Display for Diagnostic {
    /// Formats as `<label>: <file>: <line>: <col>: <message>`; the location
    /// part is dropped when it is unknown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}: {}: {}", self.severity.label(), loc, self.message),
            None => write!(f, "{}: {}", self.severity.label(), self.message),
        }
    }
}

/// Collects diagnostics for one session.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
    echo: bool,
}

impl Diagnostics {
    /// A silent sink. Reports are only recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that also prints every report to stderr.
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    pub fn report(&mut self, severity: Severity, message: impl Into<String>, location: Option<Location>) {
        let diagnostic = Diagnostic {
            severity,
            message: message.into(),
            location,
        };

        if severity.is_error() {
            self.errors += 1;
        } else {
            self.warnings += 1;
        }

        tracing::debug!(?severity, message = %diagnostic.message, "diagnostic reported");

        if self.echo {
            eprintln!("{}", diagnostic);
        }
        self.entries.push(diagnostic);
    }

    pub fn syntax(&mut self, message: impl Into<String>, location: Option<Location>) {
        self.report(Severity::SyntaxError, message, location);
    }

    pub fn warning(&mut self, message: impl Into<String>, location: Option<Location>) {
        self.report(Severity::Warning, message, location);
    }

    pub fn runtime_error(&mut self, message: impl Into<String>) {
        self.report(Severity::RuntimeError, message, None);
    }

    pub fn runtime_warning(&mut self, message: impl Into<String>) {
        self.report(Severity::RuntimeWarning, message, None);
    }

    pub fn fatal(&mut self, message: impl Into<String>) {
        self.report(Severity::Fatal, message, None);
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Number of recorded reports of one severity.
    pub fn count_of(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|d| d.severity == severity).count()
    }
}
