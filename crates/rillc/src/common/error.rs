//! Error types and diagnostic reporting

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use std::fmt;
use thiserror::Error;

use super::Span;
use crate::features::Feature;

/// Where a parse failure points: the anchor token's text and its 1-based
/// line and column, resolved by re-scanning the source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Literal text under the anchor span
    pub text: String,
    /// 1-based line of the span start
    pub line: u32,
    /// 1-based column of the span start
    pub column: u32,
    pub span: Span,
}

impl SourceInfo {
    /// Resolve a span against the source it came from. Out-of-range
    /// spans clamp to the end of the buffer.
    pub fn new(source: &str, span: Span) -> Self {
        let start = span.start.min(source.len());
        let end = span.end.clamp(start, source.len());
        let mut line = 1u32;
        let mut column = 1u32;
        for ch in source[..start].chars() {
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Self {
            text: source[start..end].to_string(),
            line,
            column,
            span,
        }
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            write!(f, "{}:{} near '{}'", self.line, self.column, self.text)
        }
    }
}

/// A classified parse failure. Every variant that could locate its
/// anchor carries a [`SourceInfo`] and the text of the offending source
/// line; `Parsing` is the fallback for anything unclassifiable,
/// including "no token available" states.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("lexical error at {span:?}: {message}")]
    Lexer { message: String, span: Span },

    #[error("ambiguous statement at {info}")]
    Ambiguous { info: SourceInfo, excerpt: String },

    #[error("invalid assignment target at {info}")]
    Assignment { info: SourceInfo, excerpt: String },

    #[error("feature '{feature}' is not enabled at {info}")]
    Feature {
        feature: Feature,
        info: SourceInfo,
        excerpt: String,
    },

    #[error("parsing error: {message}")]
    Parsing {
        message: String,
        info: Option<SourceInfo>,
        excerpt: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    /// A generic parsing failure with no location
    pub fn parsing(message: impl Into<String>) -> Self {
        Self::Parsing {
            message: message.into(),
            info: None,
            excerpt: String::new(),
        }
    }

    /// Location of the failure, when one was obtainable
    pub fn info(&self) -> Option<&SourceInfo> {
        match self {
            CompileError::Ambiguous { info, .. }
            | CompileError::Assignment { info, .. }
            | CompileError::Feature { info, .. } => Some(info),
            CompileError::Parsing { info, .. } => info.as_ref(),
            CompileError::Lexer { .. } | CompileError::Io(_) => None,
        }
    }

    /// Text of the offending source line, when one was obtainable
    pub fn excerpt(&self) -> Option<&str> {
        match self {
            CompileError::Ambiguous { excerpt, .. }
            | CompileError::Assignment { excerpt, .. }
            | CompileError::Feature { excerpt, .. } => Some(excerpt.as_str()),
            CompileError::Parsing { info, excerpt, .. } => {
                info.as_ref().map(|_| excerpt.as_str())
            }
            CompileError::Lexer { .. } | CompileError::Io(_) => None,
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Diagnostic reporter for pretty error output
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(ColorChoice::Auto),
            config: term::Config::default(),
        }
    }

    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        self.files.add(name.into(), source.into())
    }

    pub fn report_error(&self, file_id: usize, error: &CompileError) {
        let diagnostic = match error {
            CompileError::Lexer { message, span } => Diagnostic::error()
                .with_message("Lexical error")
                .with_labels(vec![
                    Label::primary(file_id, span.start..span.end).with_message(message),
                ]),

            CompileError::Ambiguous { info, .. } => Diagnostic::error()
                .with_message("Ambiguous statement")
                .with_labels(vec![
                    Label::primary(file_id, info.span.start..info.span.end)
                        .with_message("statement boundary is ambiguous here"),
                ]),

            CompileError::Assignment { info, .. } => Diagnostic::error()
                .with_message("Invalid assignment target")
                .with_labels(vec![
                    Label::primary(file_id, info.span.start..info.span.end)
                        .with_message("this cannot be assigned to"),
                ]),

            CompileError::Feature { feature, info, .. } => Diagnostic::error()
                .with_message(format!("feature '{}' is not enabled", feature))
                .with_labels(vec![
                    Label::primary(file_id, info.span.start..info.span.end)
                        .with_message(format!("requires the {} capability", feature)),
                ]),

            CompileError::Parsing { message, info, .. } => {
                let diagnostic =
                    Diagnostic::error().with_message(format!("Parsing error: {}", message));
                match info {
                    Some(info) => diagnostic.with_labels(vec![
                        Label::primary(file_id, info.span.start..info.span.end)
                            .with_message(message),
                    ]),
                    None => diagnostic,
                }
            }

            CompileError::Io(err) => {
                Diagnostic::error().with_message(format!("IO error: {}", err))
            }
        };

        let _ = term::emit(&mut self.writer.lock(), &self.config, &self.files, &diagnostic);
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}
