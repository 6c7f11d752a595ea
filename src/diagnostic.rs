//! Diagnostic accumulation for the compiler pipeline
//!
//! Every phase (lexer, parser, type checker) reports failures as
//! [`Diagnostic`] values collected into a [`DiagnosticBag`] rather than
//! bailing on the first problem, so a single run can report as many
//! independent issues as possible. Modeled on the teacher's
//! `lint::{Severity, LintDiagnostic}` pair.

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

/// Severity level for a diagnostic.
///
/// `Warning` still counts toward the error total for the purposes of
/// "does this program compile" (spec 4.4-a: an un-modified `var` is a
/// warning-level diagnostic that still halts compilation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Which pipeline phase raised a diagnostic, for filtering and for the
/// error-taxonomy grouping in spec 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lexical,
    Syntactic,
    Semantic,
    Internal,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Lexical => write!(f, "lex"),
            Phase::Syntactic => write!(f, "parse"),
            Phase::Semantic => write!(f, "check"),
            Phase::Internal => write!(f, "internal"),
        }
    }
}

/// A single, human-readable compiler diagnostic carrying source position.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub phase: Phase,
    pub file: Rc<str>,
    /// 1-indexed line, for display.
    pub line: usize,
    /// 1-indexed column, for display.
    pub column: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn error(phase: Phase, file: Rc<str>, line: usize, column: usize, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            phase,
            file,
            line,
            column,
            message: message.into(),
        }
    }

    pub fn warning(phase: Phase, file: Rc<str>, line: usize, column: usize, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            phase,
            file,
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file, self.line, self.column, self.severity, self.message
        )
    }
}

/// Accumulates diagnostics across a single compilation.
///
/// A phase keeps traversing and pushing diagnostics for as long as it can
/// do so safely, then stops; the driver prints every accumulated message
/// on failure (spec 7, propagation policy).
#[derive(Debug, Default, Clone)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        DiagnosticBag { diagnostics: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: DiagnosticBag) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Render every diagnostic, one per line, in detection order.
    pub fn format(&self) -> String {
        self.diagnostics
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> Rc<str> {
        Rc::from("main.uya")
    }

    #[test]
    fn bag_tracks_errors_vs_warnings() {
        let mut bag = DiagnosticBag::new();
        assert!(!bag.has_errors());
        bag.push(Diagnostic::warning(Phase::Semantic, file(), 1, 1, "unused var 'x'"));
        assert!(!bag.has_errors());
        bag.push(Diagnostic::error(Phase::Semantic, file(), 2, 1, "type mismatch"));
        assert!(bag.has_errors());
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn display_includes_position_and_severity() {
        let d = Diagnostic::error(Phase::Syntactic, file(), 10, 4, "expected ';'");
        assert_eq!(d.to_string(), "main.uya:10:4: error: expected ';'");
    }
}
