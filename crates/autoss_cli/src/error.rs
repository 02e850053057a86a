//! Errors of a command-line run and their diagnostic codes.

use autoss_config::ConfigError;
use autoss_core::error::E307;
use autoss_core::StateError;
use autoss_diagnostics::{Category, Diagnostic, DiagnosticCode, Label};
use autoss_source::Span;
use autoss_syntax::SyntaxError;
use std::path::PathBuf;

/// An input file that cannot be processed.
pub const E310: DiagnosticCode = DiagnosticCode::new(Category::Error, 310);
/// A configuration file that cannot be loaded.
pub const E311: DiagnosticCode = DiagnosticCode::new(Category::Error, 311);
/// Source files with syntax errors.
pub const E312: DiagnosticCode = DiagnosticCode::new(Category::Error, 312);
/// An external tool failed.
pub const T100: DiagnosticCode = DiagnosticCode::new(Category::Tool, 100);
/// Reading or writing a file failed.
pub const T101: DiagnosticCode = DiagnosticCode::new(Category::Tool, 101);

/// Any failure of an `autoss` run.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// An input file is missing, not a regular file, unreadable or not a
    /// Verilog source.
    #[error("invalid input `{}`: {reason}", path.display())]
    InvalidSourceInput {
        /// The offending path.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// The preprocessor or the syntax exporter failed.
    #[error("`{tool}` failed: {message}")]
    ExternalTool {
        /// Command that was run.
        tool: String,
        /// Exit status or spawn error, with the tool's stderr.
        message: String,
    },

    /// The built-in front end reported syntax errors.
    #[error("{count} syntax error(s) in the inputs")]
    ParseErrors {
        /// Number of errors reported.
        count: usize,
    },

    /// An I/O error outside input validation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The generator rejected the design.
    #[error(transparent)]
    State(#[from] StateError),

    /// A syntax tree could not be loaded.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

impl CliError {
    pub(crate) fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        CliError::InvalidSourceInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Converts the error into a renderable diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            CliError::State(e) => e.to_diagnostic(),
            CliError::Syntax(e) => {
                let span = e.span().unwrap_or(Span::DUMMY);
                let diag = Diagnostic::error(E307, self.to_string(), span);
                if span.is_dummy() {
                    diag
                } else {
                    diag.with_label(Label::primary(span, ""))
                }
            }
            CliError::InvalidSourceInput { .. } => {
                Diagnostic::error(E310, self.to_string(), Span::DUMMY)
                    .with_help("inputs must be readable `.v` or `.sv` files")
            }
            CliError::Config(_) => Diagnostic::error(E311, self.to_string(), Span::DUMMY),
            CliError::ParseErrors { .. } => Diagnostic::error(E312, self.to_string(), Span::DUMMY),
            CliError::ExternalTool { .. } => Diagnostic::error(T100, self.to_string(), Span::DUMMY)
                .with_help("install Verible or pass `--frontend builtin`"),
            CliError::Io(_) => Diagnostic::error(T101, self.to_string(), Span::DUMMY),
        }
    }
}
