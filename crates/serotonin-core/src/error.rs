//! Typed error vocabulary for the Serotonin compiler.
//!
//! Every kind fatal to a compilation is represented here as one variant, the
//! way `kbnf`'s grammar crate derives its error surface with `thiserror`
//! rather than threading `String` around by hand. Each variant carries a
//! [`SourceSpan`] when one is available so diagnostics can point at source;
//! the rendered message is built once at construction time via the `at_*`
//! helpers below rather than re-derived in `Display`.

use std::fmt;

/// A position in a source file, 1-indexed for user-facing display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
}

impl SourceSpan {
    pub fn new(line: usize, column: usize) -> Self {
        SourceSpan { line, column }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

fn suffix(span: Option<SourceSpan>) -> String {
    match span {
        Some(s) => format!(" at {s}"),
        None => String::new(),
    }
}

/// The shape of the terms observed at a failed call site, used to make
/// `NoMatch` diagnostics concrete without re-deriving it from the rule list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservedShape(pub Vec<String>);

impl fmt::Display for ObservedShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Every fatal error kind named by the compiler's error handling design.
#[derive(Debug, thiserror::Error)]
pub enum SerotoninError {
    #[error("lex error{suffix}: {message}")]
    LexError {
        message: String,
        suffix: String,
        span: Option<SourceSpan>,
    },

    #[error("parse error{suffix}: {message}")]
    ParseError {
        message: String,
        suffix: String,
        span: Option<SourceSpan>,
    },

    #[error("unresolved import '{name}': not found on library search path")]
    UnresolvedImport { name: String },

    #[error("no rule matches call to '{name}' (arity {arity}) with observed shape {shape}")]
    NoMatch {
        name: String,
        arity: usize,
        shape: ObservedShape,
    },

    #[error(
        "call to '{name}' requires {needed} reducible predecessor(s) but only {available} \
         were available, and no zero-arity rule applies"
    )]
    ArityInsufficient {
        name: String,
        needed: usize,
        available: usize,
    },

    #[error("unclosed quotation{suffix}")]
    QuotationUnclosed {
        suffix: String,
        span: Option<SourceSpan>,
    },

    #[error("unclosed macro brace{suffix}")]
    BraceUnclosed {
        suffix: String,
        span: Option<SourceSpan>,
    },

    #[error("tape underflow: data pointer moved left of cell 0")]
    TapeUnderflow,

    #[error("staged evaluation exceeded its instruction budget ({limit} instructions)")]
    StagedTimeout { limit: u64 },

    #[error("reduction exceeded its step budget ({limit} steps)")]
    ReductionOverflow { limit: u64 },

    #[error("macro '{name}' has no registered handler")]
    MacroUnknown { name: String },

    #[error("macro '{name}' failed: {message}")]
    MacroError { name: String, message: String },
}

impl SerotoninError {
    pub fn lex(message: impl Into<String>, span: Option<SourceSpan>) -> Self {
        SerotoninError::LexError {
            message: message.into(),
            suffix: suffix(span),
            span,
        }
    }

    pub fn parse(message: impl Into<String>, span: Option<SourceSpan>) -> Self {
        SerotoninError::ParseError {
            message: message.into(),
            suffix: suffix(span),
            span,
        }
    }

    pub fn quotation_unclosed(span: Option<SourceSpan>) -> Self {
        SerotoninError::QuotationUnclosed {
            suffix: suffix(span),
            span,
        }
    }

    pub fn brace_unclosed(span: Option<SourceSpan>) -> Self {
        SerotoninError::BraceUnclosed {
            suffix: suffix(span),
            span,
        }
    }
}

pub type Result<T> = std::result::Result<T, SerotoninError>;
