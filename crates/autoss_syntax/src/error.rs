//! Errors raised while loading or querying syntax trees.

use autoss_source::Span;

/// A failure to load a tree or to find an expected sub-node.
#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    /// A node did not have the shape a typed accessor requires.
    #[error("unexpected syntax tree shape at `{kind}`: expected {expected}")]
    UnexpectedShape {
        /// Tag of the node being inspected.
        kind: String,
        /// What the accessor was looking for.
        expected: String,
        /// Location of the node.
        span: Span,
    },

    /// The Verible JSON export could not be decoded.
    #[error("malformed syntax tree JSON: {0}")]
    Json(String),

    /// The Verible export contained no tree, usually because the file did not
    /// parse.
    #[error("no syntax tree for `{file}`{}", format_errors(.errors))]
    MissingTree {
        /// File key reported by the exporter.
        file: String,
        /// Parser errors reported alongside the missing tree.
        errors: Vec<String>,
    },
}

impl SyntaxError {
    /// Source location of the error, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            SyntaxError::UnexpectedShape { span, .. } => Some(*span),
            _ => None,
        }
    }
}

fn format_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        String::new()
    } else {
        format!(": {}", errors.join("; "))
    }
}
