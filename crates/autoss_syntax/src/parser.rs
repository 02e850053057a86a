//! Built-in front end: a recursive-descent tree builder.
//!
//! The builder recognizes the structure the save-state generator queries
//! (module headers, parameters, port and variable declarations, module
//! instantiations, `always` blocks and the statements inside them) and
//! produces nodes with the same tags and child order as Verible's concrete
//! syntax tree. Everything else is kept as flat token runs inside generic
//! nodes, so every token of the input ends up in the tree and emission
//! reproduces the source exactly.
//!
//! Errors are reported to the [`DiagnosticSink`] and parsing resumes at the
//! next `;` or structural keyword.

use crate::kinds::{NodeKind, TokenKind};
use crate::lexer::{lex, Lexeme};
use crate::tree::{NodeId, SyntaxTree};
use autoss_diagnostics::code::{Category, DiagnosticCode};
use autoss_diagnostics::{Diagnostic, DiagnosticSink};
use autoss_source::{FileId, Span};

/// Parses `source` into a tree rooted at a `kDescriptionList`.
///
/// `defines` select the active branches of conditional directives. Lexer and
/// parser errors go to `sink`; the returned tree is always complete.
pub fn parse(source: &str, file: FileId, defines: &[String], sink: &DiagnosticSink) -> SyntaxTree {
    let tokens = lex(source, file, defines, sink);
    let mut builder = TreeBuilder {
        tree: SyntaxTree::new(file, source.to_string()),
        tokens,
        pos: 0,
        file,
        sink,
    };
    let root = builder.parse_source();
    let mut tree = builder.tree;
    tree.set_root(root);
    tree
}

/// Keywords that close a construct; never consumed as part of an expression.
const HARD_STOPS: &[&str] = &[
    "end", "endmodule", "endcase", "endgenerate", "endfunction", "endtask", "begin", "module",
    "join", "join_any", "join_none",
];

pub(crate) struct TreeBuilder<'a> {
    pub(crate) tree: SyntaxTree,
    tokens: Vec<Lexeme>,
    pos: usize,
    file: FileId,
    sink: &'a DiagnosticSink,
}

impl TreeBuilder<'_> {
    // ========================================================================
    // Primitive operations
    // ========================================================================

    pub(crate) fn pos_marker(&self) -> usize {
        self.pos
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn lexeme_at(&self, offset: usize) -> Option<&Lexeme> {
        self.tokens.get(self.pos + offset)
    }

    /// Source text of the token at `pos + offset`, or `""` past the end.
    pub(crate) fn text_at(&self, offset: usize) -> &str {
        self.lexeme_at(offset)
            .and_then(|t| {
                self.tree
                    .source()
                    .get(t.start as usize..t.end as usize)
            })
            .unwrap_or("")
    }

    pub(crate) fn text(&self) -> &str {
        self.text_at(0)
    }

    /// Returns `true` if the current token is the keyword or punctuation `word`.
    pub(crate) fn at(&self, word: &str) -> bool {
        self.peek_is(0, word)
    }

    pub(crate) fn peek_is(&self, offset: usize, word: &str) -> bool {
        matches!(
            self.lexeme_at(offset).map(|t| &t.kind),
            Some(TokenKind::Keyword | TokenKind::Punct)
        ) && self.text_at(offset) == word
    }

    pub(crate) fn at_any(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.at(w))
    }

    pub(crate) fn ident_at(&self, offset: usize) -> bool {
        self.lexeme_at(offset)
            .is_some_and(|t| t.kind.is_identifier())
    }

    pub(crate) fn at_ident(&self) -> bool {
        self.ident_at(0)
    }

    fn current_span(&self) -> Span {
        match self.lexeme_at(0).or_else(|| self.tokens.last()) {
            Some(t) => Span::new(self.file, t.start, t.end),
            None => Span::new(self.file, 0, 0),
        }
    }

    /// Turns the current token into a leaf node and advances.
    pub(crate) fn bump(&mut self) -> NodeId {
        let lexeme = self.tokens[self.pos].clone();
        self.pos += 1;
        self.tree.add_token(lexeme.kind, lexeme.start, lexeme.end)
    }

    /// Consumes the current token into `out` if it is `word`.
    pub(crate) fn eat(&mut self, word: &str, out: &mut Vec<NodeId>) -> bool {
        if self.at(word) {
            let tok = self.bump();
            out.push(tok);
            true
        } else {
            false
        }
    }

    /// Consumes `word` into `out`, reporting an error if it is missing.
    pub(crate) fn expect(&mut self, word: &str, out: &mut Vec<NodeId>) {
        if !self.eat(word, out) {
            self.expected(&format!("`{word}`"));
        }
    }

    /// Consumes an identifier into `out`, reporting an error if it is missing.
    pub(crate) fn expect_ident(&mut self, out: &mut Vec<NodeId>) -> bool {
        if self.at_ident() {
            let tok = self.bump();
            out.push(tok);
            true
        } else {
            self.expected("identifier");
            false
        }
    }

    pub(crate) fn expected(&self, what: &str) {
        let found = if self.at_end() {
            "end of file".to_string()
        } else {
            format!("`{}`", self.text())
        };
        self.sink.emit(Diagnostic::error(
            DiagnosticCode::new(Category::Error, 101),
            format!("expected {what}, found {found}"),
            self.current_span(),
        ));
    }

    pub(crate) fn node(&mut self, kind: NodeKind, children: Vec<NodeId>) -> NodeId {
        self.tree.add_branch(kind, children)
    }

    /// Consumes tokens up to and including the next `;` at nesting depth 0,
    /// stopping early (without consuming) at a structural keyword.
    pub(crate) fn until_semicolon(&mut self, out: &mut Vec<NodeId>) {
        let mut depth = 0usize;
        let start = self.pos;
        while !self.at_end() {
            if depth == 0 && self.pos > start && self.at_any(HARD_STOPS) {
                self.expected("`;`");
                return;
            }
            let text = self.text().to_string();
            let tok = self.bump();
            out.push(tok);
            match text.as_str() {
                "(" | "[" | "{" | "'{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                ";" if depth == 0 => return,
                _ => {}
            }
        }
    }

    /// Consumes a balanced `( ... )` run, returning it as a `kParenGroup`.
    pub(crate) fn paren_group(&mut self) -> NodeId {
        let mut children = Vec::new();
        self.expect("(", &mut children);
        let mut depth = 1usize;
        while !self.at_end() && depth > 0 {
            if self.at(")") && depth == 1 {
                break;
            }
            if self.at_any(HARD_STOPS) {
                break;
            }
            match self.text() {
                "(" | "[" | "{" | "'{" => depth += 1,
                ")" | "]" | "}" => depth -= 1,
                _ => {}
            }
            let tok = self.bump();
            children.push(tok);
        }
        self.expect(")", &mut children);
        self.node(NodeKind::ParenGroup, children)
    }

    // ========================================================================
    // Expressions and dimensions
    // ========================================================================

    /// Collects an expression up to one of `stops` at nesting depth 0.
    ///
    /// A `:` matching a pending `?` belongs to the expression. Closing
    /// brackets at depth 0 and `;` always stop. Returns `None` if the
    /// expression is empty.
    pub(crate) fn expression(&mut self, stops: &[&str]) -> Option<NodeId> {
        let mut children = Vec::new();
        let mut depth = 0usize;
        let mut pending_ternary = 0usize;
        while !self.at_end() {
            if self.at_any(HARD_STOPS) || self.at(";") {
                break;
            }
            if depth == 0 {
                if self.at_any(&[")", "]", "}"]) {
                    break;
                }
                if self.at(":") && pending_ternary > 0 {
                    pending_ternary -= 1;
                } else if self.at_any(stops) {
                    break;
                } else if self.at("?") {
                    pending_ternary += 1;
                }
            }
            match self.text() {
                "(" | "[" | "{" | "'{" => depth += 1,
                ")" | "]" | "}" => depth -= 1,
                _ => {}
            }
            let tok = self.bump();
            children.push(tok);
        }
        if children.is_empty() {
            None
        } else {
            Some(self.node(NodeKind::Expression, children))
        }
    }

    /// Parses consecutive `[..]` groups into a dimensions node of `kind`.
    pub(crate) fn dimensions(&mut self, kind: NodeKind) -> NodeId {
        let mut dims = Vec::new();
        while self.at("[") {
            let mut children = Vec::new();
            let open = self.bump();
            children.push(open);
            if let Some(hi) = self.expression(&[":", "+:", "-:"]) {
                children.push(hi);
            }
            let dim_kind = if self.at_any(&[":", "+:", "-:"]) {
                let colon = self.bump();
                children.push(colon);
                if let Some(lo) = self.expression(&[]) {
                    children.push(lo);
                }
                NodeKind::DimensionRange
            } else {
                NodeKind::DimensionScalar
            };
            self.expect("]", &mut children);
            let dim = self.node(dim_kind, children);
            dims.push(dim);
        }
        self.node(kind, dims)
    }

    // ========================================================================
    // Source file and module header
    // ========================================================================

    fn parse_source(&mut self) -> NodeId {
        let mut items = Vec::new();
        while !self.at_end() {
            if self.at_any(&["module", "macromodule"]) {
                let module = self.parse_module();
                items.push(module);
            } else {
                let tok = self.bump();
                items.push(tok);
            }
        }
        self.node(NodeKind::DescriptionList, items)
    }

    fn parse_module(&mut self) -> NodeId {
        let mut header = Vec::new();
        let kw = self.bump();
        header.push(kw);
        if self.at_any(&["automatic", "static"]) {
            let lifetime = self.bump();
            header.push(lifetime);
        }
        self.expect_ident(&mut header);
        while self.at("import") {
            let mut import = Vec::new();
            self.until_semicolon(&mut import);
            let node = self.node(NodeKind::Other("kPackageImportDeclaration".into()), import);
            header.push(node);
        }
        if self.at("#") {
            let params = self.parse_formal_parameters();
            header.push(params);
        }
        if self.at("(") {
            let ports = self.parse_port_list();
            header.push(ports);
        }
        self.expect(";", &mut header);
        let header = self.node(NodeKind::ModuleHeader, header);

        let items = self.parse_module_items(&["endmodule"]);
        let items = self.node(NodeKind::ModuleItemList, items);

        let mut children = vec![header, items];
        self.expect("endmodule", &mut children);
        if self.at(":") && self.ident_at(1) {
            let colon = self.bump();
            let label = self.bump();
            children.extend([colon, label]);
        }
        self.node(NodeKind::ModuleDeclaration, children)
    }

    fn parse_formal_parameters(&mut self) -> NodeId {
        let hash = self.bump();
        let mut group = Vec::new();
        self.expect("(", &mut group);
        let mut list = Vec::new();
        while !self.at_end() && !self.at(")") && !self.at_any(HARD_STOPS) {
            let before = self.pos;
            let decl = self.parse_param_item(&[",", ")"]);
            list.push(decl);
            if !self.eat(",", &mut list) && self.pos == before {
                self.expected("parameter declaration");
                break;
            }
        }
        let list = self.node(NodeKind::FormalParameterList, list);
        group.push(list);
        self.expect(")", &mut group);
        let group = self.node(NodeKind::ParenGroup, group);
        self.node(NodeKind::FormalParameterListDeclaration, vec![hash, group])
    }

    /// `[parameter|localparam] [type] NAME [= value]` as a `kParamDeclaration`.
    pub(crate) fn parse_param_item(&mut self, stops: &[&str]) -> NodeId {
        let children = self.param_item_children(stops);
        self.node(NodeKind::ParamDeclaration, children)
    }

    pub(crate) fn param_item_children(&mut self, stops: &[&str]) -> Vec<NodeId> {
        let mut children = Vec::new();
        if self.at_any(&["parameter", "localparam"]) {
            let kw = self.bump();
            children.push(kw);
        }
        let ty = self.parse_param_type(stops);
        children.push(ty);
        if self.at("=") {
            let eq = self.bump();
            let mut assign = vec![eq];
            if let Some(value) = self.expression(stops) {
                assign.push(value);
            }
            let assign = self.node(NodeKind::TrailingAssign, assign);
            children.push(assign);
        }
        children
    }

    /// Type tokens and the parameter name, up to `=` or a stop token.
    fn parse_param_type(&mut self, stops: &[&str]) -> NodeId {
        let mut children = Vec::new();
        while !self.at_end() && !self.at("=") && !self.at_any(stops) && !self.at(";") {
            if self.at_any(HARD_STOPS) {
                break;
            }
            if self.at("[") {
                let kind = if children.iter().any(|&c| self.tree.is_identifier(c)) {
                    NodeKind::UnpackedDimensions
                } else {
                    NodeKind::PackedDimensions
                };
                let dims = self.dimensions(kind);
                children.push(dims);
            } else {
                let tok = self.bump();
                children.push(tok);
            }
        }
        self.node(NodeKind::ParamType, children)
    }

    fn parse_port_list(&mut self) -> NodeId {
        let mut group = Vec::new();
        let open = self.bump();
        group.push(open);
        if !self.at(")") {
            let ansi = !((self.at_ident() && (self.peek_is(1, ",") || self.peek_is(1, ")")))
                || self.at(".")
                || self.at("{"));
            let mut list = Vec::new();
            while !self.at_end() && !self.at(")") && !self.at_any(HARD_STOPS) {
                let before = self.pos;
                let item = if ansi {
                    self.parse_ansi_port()
                } else {
                    self.parse_port_reference()
                };
                list.push(item);
                if !self.eat(",", &mut list) && self.pos == before {
                    self.expected("port declaration");
                    break;
                }
            }
            let list = self.node(NodeKind::PortDeclarationList, list);
            group.push(list);
        }
        self.expect(")", &mut group);
        self.node(NodeKind::ParenGroup, group)
    }

    fn parse_ansi_port(&mut self) -> NodeId {
        let mut children = Vec::new();
        let mut named = false;
        while !self.at_end() && !self.at_any(&[",", ")"]) && !self.at_any(HARD_STOPS) {
            if self.at("[") {
                let kind = if named {
                    NodeKind::UnpackedDimensions
                } else {
                    NodeKind::PackedDimensions
                };
                let dims = self.dimensions(kind);
                children.push(dims);
            } else if self.at("=") {
                let eq = self.bump();
                let mut assign = vec![eq];
                if let Some(value) = self.expression(&[",", ")"]) {
                    assign.push(value);
                }
                let assign = self.node(NodeKind::TrailingAssign, assign);
                children.push(assign);
            } else if !named
                && self.at_ident()
                && (self.peek_is(1, ",") || self.peek_is(1, ")") || self.peek_is(1, "[") || self.peek_is(1, "="))
            {
                let name = self.bump();
                let id = self.node(NodeKind::UnqualifiedId, vec![name]);
                children.push(id);
                named = true;
            } else {
                let tok = self.bump();
                children.push(tok);
            }
        }
        self.node(NodeKind::PortDeclaration, children)
    }

    fn parse_port_reference(&mut self) -> NodeId {
        if self.at_ident() && (self.peek_is(1, ",") || self.peek_is(1, ")")) {
            let name = self.bump();
            let id = self.node(NodeKind::UnqualifiedId, vec![name]);
            let reference = self.node(NodeKind::PortReference, vec![id]);
            return self.node(NodeKind::Port, vec![reference]);
        }
        // Named or concatenated ports: kept as an opaque run.
        let mut children = Vec::new();
        if let Some(expr) = self.expression(&[","]) {
            children.push(expr);
        }
        self.node(NodeKind::Port, children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::Tag;

    fn parse_ok(source: &str) -> SyntaxTree {
        let sink = DiagnosticSink::new();
        let tree = parse(source, FileId::from_raw(0), &[], &sink);
        assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
        tree
    }

    fn texts(tree: &SyntaxTree, kind: NodeKind) -> Vec<String> {
        let root = tree.root().unwrap();
        tree.find_all(root, &[Tag::Node(kind)])
            .into_iter()
            .map(|n| tree.text(n).to_string())
            .collect()
    }

    #[test]
    fn emission_reproduces_source() {
        let src = "// header\nmodule m #(parameter W = 8) (input clk, output reg [W-1:0] q);\n  always @(posedge clk) q <= q + 1; // inc\nendmodule\n";
        let tree = parse_ok(src);
        let root = tree.root().unwrap();
        assert_eq!(tree.emit(root), src.trim_end().trim_start_matches("// header\n"));
    }

    #[test]
    fn module_header_shape() {
        let tree = parse_ok("module top (input a, output b); endmodule");
        let root = tree.root().unwrap();
        let name = tree
            .find_path(
                root,
                &[
                    NodeKind::ModuleHeader.into(),
                    TokenKind::SymbolIdentifier.into(),
                ],
            )
            .unwrap();
        assert_eq!(tree.text(name), "top");
        assert_eq!(texts(&tree, NodeKind::PortDeclaration), vec!["input a", "output b"]);
        assert_eq!(texts(&tree, NodeKind::PortDeclarationList), vec!["input a, output b"]);
    }

    #[test]
    fn ansi_port_dimensions() {
        let tree = parse_ok("module m (output reg [7:0] q [0:3]); endmodule");
        let root = tree.root().unwrap();
        let port = tree.find(root, NodeKind::PortDeclaration).unwrap();
        let packed = tree.find(port, NodeKind::PackedDimensions).unwrap();
        assert_eq!(tree.text(packed), "[7:0]");
        let unpacked = tree.find(port, NodeKind::UnpackedDimensions).unwrap();
        assert_eq!(tree.text(unpacked), "[0:3]");
        let id = tree.find(port, NodeKind::UnqualifiedId).unwrap();
        assert_eq!(tree.text(id), "q");
    }

    #[test]
    fn non_ansi_header_is_port_references() {
        let tree = parse_ok("module m (a, b); input a; output b; endmodule");
        assert_eq!(texts(&tree, NodeKind::PortReference), vec!["a", "b"]);
        assert!(texts(&tree, NodeKind::PortDeclaration).is_empty());
        assert_eq!(
            texts(&tree, NodeKind::ModulePortDeclaration),
            vec!["input a;", "output b;"]
        );
    }

    #[test]
    fn header_parameters() {
        let tree = parse_ok("module m #(parameter W = 8, D = W * 2, localparam L = 1) (); endmodule");
        assert_eq!(texts(&tree, NodeKind::ParamDeclaration).len(), 3);
        assert_eq!(texts(&tree, NodeKind::ParamType), vec!["W", "D", "L"]);
        assert_eq!(texts(&tree, NodeKind::TrailingAssign), vec!["= 8", "= W * 2", "= 1"]);
    }

    #[test]
    fn ternary_inside_dimension() {
        let tree = parse_ok("module m; reg [W > 8 ? 15 : 7 : 0] r; endmodule");
        let root = tree.root().unwrap();
        let range = tree.find(root, NodeKind::DimensionRange).unwrap();
        let parts: Vec<_> = tree
            .children(range)
            .iter()
            .map(|&c| tree.text(c).to_string())
            .collect();
        assert_eq!(parts, vec!["[", "W > 8 ? 15 : 7", ":", "0", "]"]);
    }

    #[test]
    fn errors_are_reported_and_parsing_continues() {
        let sink = DiagnosticSink::new();
        let src = "module m (input a; always @(posedge a) x <= 1; endmodule module n; endmodule";
        let tree = parse(src, FileId::from_raw(0), &[], &sink);
        assert!(sink.has_errors());
        let root = tree.root().unwrap();
        let modules = tree.find_all(root, &[NodeKind::ModuleDeclaration.into()]);
        assert_eq!(modules.len(), 2);
        // Every byte between the first and last token is still emitted.
        assert_eq!(tree.emit(root), src);
    }
}
