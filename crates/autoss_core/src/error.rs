//! Errors raised while analyzing and instrumenting a design.
//!
//! Codes `E300`–`E307` cover the fatal conditions of the generator; `E399`
//! marks internal errors.

use crate::expr::ExprError;
use autoss_diagnostics::{Category, Diagnostic, DiagnosticCode, Label};
use autoss_source::Span;
use autoss_syntax::SyntaxError;

/// Root or instantiated module not defined in any input.
pub const E300: DiagnosticCode = DiagnosticCode::new(Category::Error, 300);
/// Two definitions of one module name.
pub const E301: DiagnosticCode = DiagnosticCode::new(Category::Error, 301);
/// Two declarations of a register with different shapes.
pub const E302: DiagnosticCode = DiagnosticCode::new(Category::Error, 302);
/// Positional and named parameter overrides on one instance.
pub const E303: DiagnosticCode = DiagnosticCode::new(Category::Error, 303);
/// A reset-sensitive block whose first `if` does not test the reset.
pub const E304: DiagnosticCode = DiagnosticCode::new(Category::Error, 304);
/// A module that instantiates itself, directly or indirectly.
pub const E305: DiagnosticCode = DiagnosticCode::new(Category::Error, 305);
/// A malformed or unevaluable size expression.
pub const E306: DiagnosticCode = DiagnosticCode::new(Category::Error, 306);
/// A syntax tree without the expected structure.
pub const E307: DiagnosticCode = DiagnosticCode::new(Category::Error, 307);
/// A bug in the generator.
pub const E399: DiagnosticCode = DiagnosticCode::new(Category::Error, 399);

/// A fatal error of the save-state generator.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// A module name has no definition.
    #[error("module `{name}` not found{}", referenced_by.as_ref().map(|r| format!(" (referenced by `{r}`)")).unwrap_or_default())]
    ModuleNotFound {
        /// The missing module.
        name: String,
        /// The `module.instance` that references it; `None` for the root.
        referenced_by: Option<String>,
        /// The instance, if any.
        span: Span,
    },

    /// Two inputs define the same module.
    #[error("module `{name}` is defined in both `{first}` and `{second}`")]
    DuplicateModule {
        /// The module name.
        name: String,
        /// File of the first definition.
        first: String,
        /// File of the second definition.
        second: String,
        /// The second definition.
        span: Span,
    },

    /// A register is declared twice with different dimensions.
    #[error("conflicting declarations of `{register}` in module `{module}`: `{first}` vs `{second}`")]
    ConflictingDeclaration {
        /// Enclosing module.
        module: String,
        /// Register name.
        register: String,
        /// Shape of the first declaration.
        first: String,
        /// Shape of the second declaration.
        second: String,
        /// The second declaration.
        span: Span,
    },

    /// An instance mixes `#(8)` and `#(.W(8))` overrides.
    #[error("instance `{module}.{instance}` mixes positional and named parameter overrides")]
    MixedParameterStyles {
        /// Enclosing module.
        module: String,
        /// Instance name.
        instance: String,
        /// The instance.
        span: Span,
    },

    /// The first `if` of a reset-sensitive block does not test the reset.
    #[error("block in module `{module}` is sensitive to `{signal}` but its first condition `{condition}` does not test it")]
    ResetAssumptionViolated {
        /// Enclosing module.
        module: String,
        /// The reset signal from the sensitivity list.
        signal: String,
        /// The condition found instead.
        condition: String,
        /// The block.
        span: Span,
    },

    /// Modules instantiate each other in a loop.
    #[error("instantiation cycle: {}", cycle.join(" -> "))]
    InstantiationCycle {
        /// Module names along the cycle, first repeated at the end.
        cycle: Vec<String>,
    },

    /// A size or parameter expression could not be handled.
    #[error("in module `{module}`: {source}")]
    Expr {
        /// Module whose expression failed.
        module: String,
        /// The expression error.
        source: ExprError,
        /// The expression, when known.
        span: Span,
    },

    /// The syntax tree lacks a node the generator needs.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// An inconsistency that indicates a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StateError {
    /// Wraps an [`ExprError`] raised while processing `module`.
    pub fn expr(module: &str, source: ExprError) -> Self {
        StateError::Expr {
            module: module.to_string(),
            source,
            span: Span::DUMMY,
        }
    }

    /// The diagnostic code for this error.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            StateError::ModuleNotFound { .. } => E300,
            StateError::DuplicateModule { .. } => E301,
            StateError::ConflictingDeclaration { .. } => E302,
            StateError::MixedParameterStyles { .. } => E303,
            StateError::ResetAssumptionViolated { .. } => E304,
            StateError::InstantiationCycle { .. } => E305,
            StateError::Expr { .. } => E306,
            StateError::Syntax(_) => E307,
            StateError::Internal(_) => E399,
        }
    }

    /// Converts the error into a renderable diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let span = match self {
            StateError::ModuleNotFound { span, .. }
            | StateError::DuplicateModule { span, .. }
            | StateError::ConflictingDeclaration { span, .. }
            | StateError::MixedParameterStyles { span, .. }
            | StateError::ResetAssumptionViolated { span, .. }
            | StateError::Expr { span, .. } => *span,
            StateError::Syntax(e) => e.span().unwrap_or(Span::DUMMY),
            StateError::InstantiationCycle { .. } | StateError::Internal(_) => Span::DUMMY,
        };
        let mut diag = Diagnostic::error(self.code(), self.to_string(), span);
        if !span.is_dummy() {
            diag = diag.with_label(Label::primary(span, ""));
        }
        match self {
            StateError::ModuleNotFound { .. } => {
                diag.with_help("check that the file defining the module is among the inputs")
            }
            StateError::InstantiationCycle { .. } => {
                diag.with_note("a module may not contain an instance of itself")
            }
            StateError::ResetAssumptionViolated { signal, .. } => diag.with_help(format!(
                "the first `if` of a block sensitive to `{signal}` must handle that reset"
            )),
            StateError::Internal(_) => diag.with_note("this is a bug in autoss"),
            _ => diag,
        }
    }
}
