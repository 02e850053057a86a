//! Concrete syntax trees for Verilog source, as consumed by the save-state
//! generator.
//!
//! A [`SyntaxTree`] is an arena of tagged nodes using the tag vocabulary of
//! Verible's concrete syntax tree (`kModuleDeclaration`, `kIfClause`,
//! `SymbolIdentifier`, ...). Trees come from one of two front ends:
//!
//! - [`verible::load_json`] converts the JSON exported by
//!   `verible-verilog-syntax --export_json --printtree`.
//! - [`parse`] is a built-in lexer and recursive-descent tree builder that
//!   produces the same tag shapes for the constructs the generator queries.
//!
//! Trees are never rewritten in place. Generated text is spliced in as
//! synthetic nodes ([`SyntaxTree::insert_after`]) and
//! [`SyntaxTree::emit`] reproduces the original bytes around them.

#![warn(missing_docs)]

mod decl;
pub mod emit;
pub mod error;
pub mod kinds;
pub mod lexer;
pub mod parser;
mod stmt;
pub mod tree;
pub mod verible;

pub use error::SyntaxError;
pub use kinds::{NodeKind, Tag, TokenKind};
pub use parser::parse;
pub use tree::{NodeData, NodeId, SyntaxTree};
