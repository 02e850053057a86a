//! Source text storage and byte-range spans for the save-state generator.
//!
//! Every input file (after optional preprocessing) is loaded into the
//! [`SourceDb`] exactly once. Syntax-tree tokens address that text by
//! [`Span`], which is how untouched regions are reproduced byte-for-byte on
//! output and how diagnostics are resolved to [`ResolvedSpan`] line/column
//! coordinates.

#![warn(missing_docs)]

pub mod file_id;
pub mod resolved_span;
pub mod source_db;
pub mod source_file;
pub mod span;

pub use file_id::FileId;
pub use resolved_span::ResolvedSpan;
pub use source_db::SourceDb;
pub use source_file::SourceFile;
pub use span::Span;
