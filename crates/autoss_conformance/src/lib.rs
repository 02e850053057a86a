//! Helpers for end-to-end tests of the save-state generator.
//!
//! Designs are given as in-memory `(file name, source)` pairs, parsed with
//! the built-in front end (optionally routed through the Verible JSON
//! format) and run through extraction, resolution, allocation and
//! instrumentation exactly as the `autoss` binary does.

#![warn(missing_docs)]

use autoss_config::AutossConfig;
use autoss_core::{extract_modules, Design, EmittedModule, StateError};
use autoss_diagnostics::{Diagnostic, DiagnosticSink};
use autoss_source::SourceDb;
use autoss_syntax::{verible, NodeData, NodeId, SyntaxError, SyntaxTree, TokenKind};
use serde_json::{json, Value};

/// How the syntax trees of a test design are produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Straight from the built-in parser.
    Builtin,
    /// Built-in parser, exported as Verible JSON and loaded back.
    VeribleJson,
}

/// A design ready for generation.
pub struct Loaded {
    /// Modules and trees of every input.
    pub design: Design,
    /// The inputs, for rendering diagnostics.
    pub source_db: SourceDb,
    /// Parser diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

/// Parses and registers `sources` with the default route.
pub fn load(sources: &[(&str, &str)], config: &AutossConfig) -> Result<Loaded, StateError> {
    load_via(sources, config, Route::Builtin)
}

/// Parses and registers `sources`, building the trees along `route`.
pub fn load_via(
    sources: &[(&str, &str)],
    config: &AutossConfig,
    route: Route,
) -> Result<Loaded, StateError> {
    let mut source_db = SourceDb::new();
    let sink = DiagnosticSink::new();
    let mut design = Design::new();
    for (name, text) in sources {
        let file = source_db.add_source(*name, text.to_string());
        let mut tree = autoss_syntax::parse(text, file, &config.tools.defines, &sink);
        if route == Route::VeribleJson {
            tree = verible::load_json(&to_verible_json(&tree, name), file, text.to_string())?;
        }
        let tree_id = design.add_tree(*name, tree);
        for module in extract_modules(design.tree(tree_id), tree_id, config)? {
            design.add_module(module)?;
        }
    }
    Ok(Loaded {
        design,
        source_db,
        diagnostics: sink.take_all(),
    })
}

/// Runs the generator for `root` over `sources` with the default
/// configuration.
pub fn generate(sources: &[(&str, &str)], root: &str) -> Result<Vec<EmittedModule>, StateError> {
    generate_with(sources, root, &AutossConfig::default())
}

/// Runs the generator for `root` over `sources`.
pub fn generate_with(
    sources: &[(&str, &str)],
    root: &str,
    config: &AutossConfig,
) -> Result<Vec<EmittedModule>, StateError> {
    let mut loaded = load(sources, config)?;
    autoss_core::generate(&mut loaded.design, root, config)
}

/// The concatenated output, as written by the binary with formatting
/// disabled.
pub fn concat(modules: &[EmittedModule]) -> String {
    modules.iter().map(|m| m.text.as_str()).collect()
}

/// The emitted text of module `name`.
pub fn module_text<'a>(modules: &'a [EmittedModule], name: &str) -> Option<&'a str> {
    modules
        .iter()
        .find(|m| m.name == name)
        .map(|m| m.text.as_str())
}

/// Serializes `tree` in the shape `verible-verilog-syntax --export_json
/// --printtree` produces, keyed by `file`.
pub fn to_verible_json(tree: &SyntaxTree, file: &str) -> String {
    let root = match tree.root() {
        Some(root) => node_json(tree, root),
        None => Value::Null,
    };
    let mut export = serde_json::Map::new();
    export.insert(file.to_string(), json!({ "tree": root, "errors": [] }));
    Value::Object(export).to_string()
}

fn node_json(tree: &SyntaxTree, id: NodeId) -> Value {
    match tree.data(id) {
        NodeData::Branch { kind, children } => json!({
            "tag": kind.tag(),
            "children": children.iter().map(|&c| node_json(tree, c)).collect::<Vec<_>>(),
        }),
        NodeData::Token { kind, start, end } => {
            let text = &tree.source()[*start as usize..*end as usize];
            let tag = match kind {
                TokenKind::SymbolIdentifier => "SymbolIdentifier",
                TokenKind::EscapedIdentifier => "EscapedIdentifier",
                TokenKind::SystemIdentifier => "SystemTFIdentifier",
                TokenKind::MacroIdentifier => "MacroIdentifier",
                TokenKind::Number => "TK_DecNumber",
                TokenKind::StringLiteral => "TK_StringLiteral",
                TokenKind::Other(tag) => tag.as_str(),
                TokenKind::Keyword | TokenKind::Punct => text,
            };
            json!({"tag": tag, "start": start, "end": end, "text": text})
        }
        // Verible keeps empty grammar slots as nulls; generated text never
        // reaches an export.
        NodeData::Synthetic { .. } => Value::Null,
    }
}

/// Loads a JSON export produced by [`to_verible_json`].
pub fn from_verible_json(json: &str, source: &str) -> Result<SyntaxTree, SyntaxError> {
    verible::load_json(json, autoss_source::FileId::from_raw(0), source.to_string())
}
