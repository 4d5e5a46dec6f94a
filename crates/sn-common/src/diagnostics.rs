//! Diagnostics - structured compile errors.
//!
//! Every user-visible failure is a `Diagnostic` carrying the file, line,
//! error kind, and a human message. Diagnostics render as
//! `filename:line: kind: message`, optionally followed by a remedial hint.

use std::fmt;

/// The closed set of error kinds the compiler reports.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ParseError,
    Redeclaration,
    UndefinedName,
    TypeMismatch,
    InvalidOperand,
    InvalidMemoryQualifier,
    InvalidReturnType,
    ArityMismatch,
    BreakOutsideLoop,
    InternalConsistency,
    IoError,
    RuntimeObjectMissing,
    CCompilerMissing,
}

impl ErrorKind {
    /// Stable lowercase name used in rendered diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ParseError => "parse error",
            ErrorKind::Redeclaration => "redeclaration",
            ErrorKind::UndefinedName => "undefined name",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::InvalidOperand => "invalid operand",
            ErrorKind::InvalidMemoryQualifier => "invalid memory qualifier",
            ErrorKind::InvalidReturnType => "invalid return type",
            ErrorKind::ArityMismatch => "arity mismatch",
            ErrorKind::BreakOutsideLoop => "break outside loop",
            ErrorKind::InternalConsistency => "internal consistency error",
            ErrorKind::IoError => "io error",
            ErrorKind::RuntimeObjectMissing => "runtime object missing",
            ErrorKind::CCompilerMissing => "c compiler missing",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single compile diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub file: String,
    pub line: u32,
    pub message: String,
    /// Optional remedial hint, printed on its own line after the message.
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn new(
        kind: ErrorKind,
        file: impl Into<String>,
        line: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            file: file.into(),
            line,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.file, self.line, self.kind, self.message
        )?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {hint}")?;
        }
        Ok(())
    }
}

/// Accumulates diagnostics across a compiler pass.
///
/// Passes push into the sink and keep going; callers inspect the collected
/// list once the pass finishes.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(
        &mut self,
        kind: ErrorKind,
        file: impl Into<String>,
        line: u32,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::new(kind, file, line, message));
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_file_line_kind_message() {
        let d = Diagnostic::new(ErrorKind::TypeMismatch, "main.sn", 3, "expected int, found str");
        assert_eq!(
            d.to_string(),
            "main.sn:3: type mismatch: expected int, found str"
        );
    }

    #[test]
    fn hint_renders_on_second_line() {
        let d = Diagnostic::new(ErrorKind::CCompilerMissing, "main.sn", 0, "gcc not found")
            .with_hint("install gcc or set SN_CC");
        let rendered = d.to_string();
        assert!(rendered.ends_with("\n  hint: install gcc or set SN_CC"));
    }

    #[test]
    fn sink_accumulates_in_order() {
        let mut sink = DiagnosticSink::new();
        sink.error(ErrorKind::UndefinedName, "a.sn", 1, "unknown variable 'x'");
        sink.error(ErrorKind::Redeclaration, "a.sn", 2, "'y' is already declared");
        assert_eq!(sink.len(), 2);
        let kinds: Vec<_> = sink.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, [ErrorKind::UndefinedName, ErrorKind::Redeclaration]);
    }
}
