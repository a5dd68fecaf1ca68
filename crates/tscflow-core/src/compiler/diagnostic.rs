//! Compiler diagnostics and the parser for `tsc` console output.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// Informational message.
    Info,
    /// Warning message. Output is still produced for the affected unit.
    Warning,
    /// Error message.
    Error,
}

impl DiagnosticSeverity {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A compiler diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level.
    pub severity: DiagnosticSeverity,
    /// Compiler code, e.g. `TS2322`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Source file path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Line number (1-indexed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Column number (1-indexed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl Diagnostic {
    fn with_severity(severity: DiagnosticSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            file: None,
            line: None,
            column: None,
        }
    }

    /// Create a new error diagnostic.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Error, message)
    }

    /// Create a new warning diagnostic.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Warning, message)
    }

    /// Create a new informational diagnostic.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Info, message)
    }

    /// Set the diagnostic code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set the source file without a position.
    #[must_use]
    pub fn with_file(mut self, file: PathBuf) -> Self {
        self.file = Some(file);
        self
    }

    /// Set the source location.
    #[must_use]
    pub fn with_location(mut self, file: PathBuf, line: u32, column: u32) -> Self {
        self.file = Some(file);
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }

    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.severity == DiagnosticSeverity::Warning
    }

    /// Numeric part of a `TSnnnn` code.
    #[must_use]
    pub fn code_number(&self) -> Option<u32> {
        self.code
            .as_deref()
            .and_then(|c| c.strip_prefix("TS"))
            .and_then(|n| n.parse().ok())
    }

    /// Whether this is a semantic (type-level) diagnostic rather than a
    /// syntactic or option diagnostic. `tsc` numbers syntax errors below 2000.
    #[must_use]
    pub fn is_semantic(&self) -> bool {
        self.code_number().is_some_and(|n| (2000..5000).contains(&n) || n >= 7000)
    }

    /// Apply `map` to the file path, if any.
    #[must_use]
    pub fn map_file(mut self, map: impl FnOnce(&Path) -> PathBuf) -> Self {
        if let Some(file) = self.file.take() {
            self.file = Some(map(&file));
        }
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}", file.display())?;
            if let (Some(line), Some(col)) = (self.line, self.column) {
                write!(f, "({line},{col})")?;
            }
            write!(f, ": ")?;
        }
        write!(f, "{}", self.severity)?;
        if let Some(code) = &self.code {
            write!(f, " {code}")?;
        }
        write!(f, ": {}", self.message)
    }
}

fn located_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // `file(line,col): error TS1005: msg` (classic) or
        // `file:line:col - error TS1005: msg` (pretty, colors stripped).
        Regex::new(
            r"^(?:(.+?)\((\d+),(\d+)\): |(.+?):(\d+):(\d+) - )(error|warning|message) TS(\d+): (.*)$",
        )
        .expect("valid diagnostic regex")
    })
}

fn global_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(error|warning|message) TS(\d+): (.*)$").expect("valid diagnostic regex")
    })
}

fn severity_of(category: &str) -> DiagnosticSeverity {
    match category {
        "warning" => DiagnosticSeverity::Warning,
        "message" => DiagnosticSeverity::Info,
        _ => DiagnosticSeverity::Error,
    }
}

/// Parse `tsc` console output into diagnostics.
///
/// Indented lines following a diagnostic are appended to its message.
/// Lines that match no known shape are ignored.
#[must_use]
pub fn parse_tsc_output(output: &str) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    for raw in output.lines() {
        let line = raw.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        let located = located_regex().captures(line).map(|caps| {
            let group = |classic: usize, pretty: usize| {
                caps.get(classic)
                    .or_else(|| caps.get(pretty))
                    .map_or("", |m| m.as_str())
            };
            Diagnostic::with_severity(severity_of(&caps[7]), &caps[9])
                .with_code(format!("TS{}", &caps[8]))
                .with_location(
                    PathBuf::from(group(1, 4)),
                    group(2, 5).parse().unwrap_or(0),
                    group(3, 6).parse().unwrap_or(0),
                )
        });
        if let Some(diag) = located {
            diagnostics.push(diag);
            continue;
        }

        if let Some(caps) = global_regex().captures(line) {
            diagnostics.push(
                Diagnostic::with_severity(severity_of(&caps[1]), &caps[3])
                    .with_code(format!("TS{}", &caps[2])),
            );
            continue;
        }

        if raw.starts_with(char::is_whitespace) {
            if let Some(last) = diagnostics.last_mut() {
                last.message.push('\n');
                last.message.push_str(line.trim());
            }
        }
    }

    diagnostics
}

/// Settle the final severity of diagnostics once the emit outcome is known.
///
/// `tsc` prints every problem as `error`. A semantic error in a unit the
/// compiler still emitted did not stop the build and is reported as a
/// warning; syntax and option errors stay errors.
#[must_use]
pub fn classify(diagnostics: Vec<Diagnostic>, outputs_generated: bool) -> Vec<Diagnostic> {
    diagnostics
        .into_iter()
        .map(|mut diag| {
            if diag.is_error() && outputs_generated && diag.is_semantic() {
                diag.severity = DiagnosticSeverity::Warning;
            }
            diag
        })
        .collect()
}
