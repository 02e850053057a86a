//! Structured diagnostics for the save-state generator.
//!
//! Every fatal condition (unknown module, conflicting register declaration,
//! violated reset assumption, tool failure, ...) is turned into a
//! [`Diagnostic`] carrying a severity, a [`DiagnosticCode`], the
//! module/instance locus in its message and, when known, the source span.
//! The thread-safe [`DiagnosticSink`] collects them from parallel parse
//! workers and the [`TerminalRenderer`] prints them rustc-style.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod label;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use label::{Label, LabelStyle};
pub use renderer::{DiagnosticRenderer, JsonRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
