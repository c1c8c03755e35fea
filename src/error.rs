//! Errors and the per-run diagnostic log.
//!
//! Nothing in this crate prints. Every condition a caller may care about is pushed into a
//! [Diagnostics] log as a [Diagnostic], carrying the [SourceSpan] of the offending node.
//! Hard errors are described by [ConvertError] and recorded with [Severity::Error].

use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Position of a node in the original source text, as reported by the front end.
///
/// The default (line 0) span is used by nodes synthesized during conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct SourceSpan {
    pub line: u32,
    pub column: u32,
}
impl SourceSpan {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
    pub fn is_synthetic(&self) -> bool {
        self.line == 0
    }
}
impl Display for SourceSpan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: SourceSpan,
}
impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}{}: {}", self.span, level, self.message)
    }
}

/// Hard errors. Each one aborts the statement or declaration it was found in, never the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("Entry point '{0}' not found")]
    MissingEntryPoint(String),
    #[error("Invalid semantic '{0}'")]
    InvalidSemantic(String),
    #[error("Invalid register '{0}'")]
    InvalidRegister(String),
    #[error("No type available for semantic '{semantic}' bound to '{builtin}'")]
    UnresolvedSemantic { semantic: String, builtin: String },
    #[error("Missing semantic on entry point {0}")]
    MissingSemantic(String),
    #[error("Unable to find a free slot for uniform {name} ({slots} slots)")]
    BindingExhausted { name: String, slots: u32 },
    #[error("Invalid layout binding for variable [{0}]")]
    InvalidBinding(String),
    #[error("Unable to unroll for statement [{0}]")]
    NotUnrollable(String),
    #[error("Unsupported sampling call {method} with {args} arguments on {texture}")]
    UnsupportedSampling { method: String, texture: String, args: usize },
    #[error("Unable to resolve texture or sampler for call {0}")]
    UnresolvedTexture(String),
    #[error("Array initializer for {name} has {found} values, expected {expected}")]
    ArrayDimensionMismatch { name: String, expected: u32, found: u32 },
    #[error("Initializer for {name} has {found} values, expected {expected}")]
    InitializerMismatch { name: String, expected: u32, found: u32 },
    #[error("{construct} is not supported by the target profile")]
    MissingCapability { construct: String },
    #[error("Unsupported construct: {0}")]
    Unsupported(String),
}

/// Accumulated log of one conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}
impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning(&mut self, message: impl Into<String>, span: SourceSpan) {
        let message = message.into();
        tracing::warn!(%span, "{}", message);
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            message,
            span,
        });
    }

    pub fn error(&mut self, error: ConvertError, span: SourceSpan) {
        tracing::debug!(%span, %error, "conversion error");
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            message: error.to_string(),
            span,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
