//! Arena-backed concrete syntax tree.

use crate::error::SyntaxError;
use crate::kinds::{NodeKind, Tag, TokenKind};
use autoss_source::{FileId, Span};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Opaque, copyable ID of a node within one [`SyntaxTree`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates an ID from a raw `u32` index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// Payload of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    /// Interior node with ordered children.
    Branch {
        /// Tag of the node.
        kind: NodeKind,
        /// Children in document order.
        children: Vec<NodeId>,
    },
    /// Leaf covering `source[start..end]`.
    Token {
        /// Tag of the token.
        kind: TokenKind,
        /// Byte offset of the first character.
        start: u32,
        /// Byte offset one past the last character.
        end: u32,
    },
    /// Generated text spliced into the tree.
    Synthetic {
        /// Text emitted for this node.
        text: String,
    },
}

#[derive(Clone, Debug)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
}

/// The syntax tree of one source text.
///
/// Nodes are appended, never removed; original nodes and token offsets are
/// never modified after construction. The only mutation is splicing
/// [`NodeData::Synthetic`] nodes next to existing ones.
#[derive(Clone, Debug)]
pub struct SyntaxTree {
    file: FileId,
    source: String,
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl SyntaxTree {
    /// Creates an empty tree over `source`.
    pub fn new(file: FileId, source: String) -> Self {
        Self {
            file,
            source,
            nodes: Vec::new(),
            root: None,
        }
    }

    /// The file the tree was parsed from.
    pub fn file(&self) -> FileId {
        self.file
    }

    /// The text the token offsets refer to.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The root node, if the tree has been built.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Sets the root node.
    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// Number of nodes, synthetic ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { data, parent: None });
        id
    }

    /// Adds a token leaf.
    pub fn add_token(&mut self, kind: TokenKind, start: u32, end: u32) -> NodeId {
        self.push(NodeData::Token { kind, start, end })
    }

    /// Adds a branch owning `children`, which must not have a parent yet.
    pub fn add_branch(&mut self, kind: NodeKind, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for &child in &children {
            self.nodes[child.0 as usize].parent = Some(id);
        }
        self.push(NodeData::Branch { kind, children })
    }

    /// The payload of a node.
    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0 as usize].data
    }

    /// The parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0 as usize].parent
    }

    /// Children of a branch; empty for leaves.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.data(id) {
            NodeData::Branch { children, .. } => children,
            _ => &[],
        }
    }

    /// Kind of a branch node.
    pub fn node_kind(&self, id: NodeId) -> Option<&NodeKind> {
        match self.data(id) {
            NodeData::Branch { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Kind of a token node.
    pub fn token_kind(&self, id: NodeId) -> Option<&TokenKind> {
        match self.data(id) {
            NodeData::Token { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Returns `true` if the node is a branch of `kind`.
    pub fn is(&self, id: NodeId, kind: &NodeKind) -> bool {
        self.node_kind(id) == Some(kind)
    }

    /// Returns `true` if the node is an original token.
    pub fn is_token(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::Token { .. })
    }

    /// Returns `true` if the node is an identifier token.
    pub fn is_identifier(&self, id: NodeId) -> bool {
        self.token_kind(id).is_some_and(TokenKind::is_identifier)
    }

    /// Returns `true` if the node is a keyword or punctuation token spelled `text`.
    pub fn is_word(&self, id: NodeId, text: &str) -> bool {
        matches!(
            self.token_kind(id),
            Some(TokenKind::Keyword | TokenKind::Punct)
        ) && self.text(id) == text
    }

    /// Returns `true` if the node matches the query.
    pub fn matches(&self, id: NodeId, tag: &Tag) -> bool {
        match (tag, self.data(id)) {
            (Tag::Node(want), NodeData::Branch { kind, .. }) => want == kind,
            (Tag::Token(want), NodeData::Token { kind, .. }) => want == kind,
            _ => false,
        }
    }

    /// A printable tag for the node, used in error messages.
    pub fn tag_name(&self, id: NodeId) -> String {
        match self.data(id) {
            NodeData::Branch { kind, .. } => kind.tag().to_string(),
            NodeData::Token { kind, .. } => match kind {
                TokenKind::Other(tag) => tag.clone(),
                other => format!("{other:?}"),
            },
            NodeData::Synthetic { .. } => "<generated>".to_string(),
        }
    }

    /// All nodes of the subtree in document (pre-)order, `id` first.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    /// Original token leaves of the subtree in document order.
    pub fn tokens(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.is_token(n))
            .collect()
    }

    /// Byte range covered by the subtree's original tokens.
    pub fn byte_range(&self, id: NodeId) -> Option<(u32, u32)> {
        let tokens = self.tokens(id);
        let first = tokens.first()?;
        let last = tokens.last()?;
        match (self.data(*first), self.data(*last)) {
            (NodeData::Token { start, .. }, NodeData::Token { end, .. }) => Some((*start, *end)),
            _ => None,
        }
    }

    /// Source text of a node: the exact token text for leaves, the source
    /// from the first to the last token for branches, and the generated text
    /// for synthetic nodes.
    pub fn text(&self, id: NodeId) -> &str {
        if let NodeData::Synthetic { text } = self.data(id) {
            return text;
        }
        self.byte_range(id)
            .and_then(|(start, end)| self.source.get(start as usize..end as usize))
            .unwrap_or("")
    }

    /// Source location of a node, or [`Span::DUMMY`] if it covers no tokens.
    pub fn span(&self, id: NodeId) -> Span {
        match self.byte_range(id) {
            Some((start, end)) => Span::new(self.file, start, end),
            None => Span::DUMMY,
        }
    }

    /// First node matching `tag` in breadth-first order, `id` included.
    pub fn find(&self, id: NodeId, tag: impl Into<Tag>) -> Option<NodeId> {
        let tag = tag.into();
        let mut queue = VecDeque::from([id]);
        while let Some(node) = queue.pop_front() {
            if self.matches(node, &tag) {
                return Some(node);
            }
            queue.extend(self.children(node).iter().copied());
        }
        None
    }

    /// Follows `path` with successive [`find`](Self::find) calls.
    pub fn find_path(&self, id: NodeId, path: &[Tag]) -> Option<NodeId> {
        path.iter()
            .try_fold(id, |node, tag| self.find(node, tag.clone()))
    }

    /// Every node matching any of `tags`, in document order, `id` included.
    /// Matches nested inside other matches are reported too.
    pub fn find_all(&self, id: NodeId, tags: &[Tag]) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| tags.iter().any(|t| self.matches(n, t)))
            .collect()
    }

    /// Like [`find`](Self::find) but reports a missing node as
    /// [`SyntaxError::UnexpectedShape`].
    pub fn expect_find(&self, id: NodeId, tag: impl Into<Tag>) -> Result<NodeId, SyntaxError> {
        let tag = tag.into();
        self.find(id, tag.clone()).ok_or_else(|| {
            let expected = match &tag {
                Tag::Node(kind) => kind.tag().to_string(),
                Tag::Token(kind) => format!("{kind:?}"),
            };
            self.shape_error(id, format!("a {expected} descendant"))
        })
    }

    /// First direct child that is an identifier token.
    pub fn child_identifier(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.is_identifier(c))
    }

    /// Builds an [`SyntaxError::UnexpectedShape`] for `id`.
    pub fn shape_error(&self, id: NodeId, expected: impl Into<String>) -> SyntaxError {
        SyntaxError::UnexpectedShape {
            kind: self.tag_name(id),
            expected: expected.into(),
            span: self.span(id),
        }
    }

    fn splice(&mut self, anchor: NodeId, text: &str, after: bool) -> Result<NodeId, SyntaxError> {
        let parent = self
            .parent(anchor)
            .ok_or_else(|| self.shape_error(anchor, "a parent node to insert next to"))?;
        let id = self.push(NodeData::Synthetic {
            text: text.to_string(),
        });
        self.nodes[id.0 as usize].parent = Some(parent);
        if let NodeData::Branch { children, .. } = &mut self.nodes[parent.0 as usize].data {
            let idx = children
                .iter()
                .position(|&c| c == anchor)
                .unwrap_or(children.len());
            let at = if after { (idx + 1).min(children.len()) } else { idx };
            children.insert(at, id);
        }
        Ok(id)
    }

    /// Inserts generated text as the sibling immediately before `anchor`.
    pub fn insert_before(&mut self, anchor: NodeId, text: &str) -> Result<NodeId, SyntaxError> {
        self.splice(anchor, text, false)
    }

    /// Inserts generated text as the sibling immediately after `anchor`.
    pub fn insert_after(&mut self, anchor: NodeId, text: &str) -> Result<NodeId, SyntaxError> {
        self.splice(anchor, text, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `module m; endmodule` with a header branch.
    fn small_tree() -> (SyntaxTree, NodeId, NodeId) {
        let src = "module m; endmodule";
        let mut tree = SyntaxTree::new(FileId::from_raw(0), src.to_string());
        let kw = tree.add_token(TokenKind::Keyword, 0, 6);
        let name = tree.add_token(TokenKind::SymbolIdentifier, 7, 8);
        let semi = tree.add_token(TokenKind::Punct, 8, 9);
        let header = tree.add_branch(NodeKind::ModuleHeader, vec![kw, name, semi]);
        let end = tree.add_token(TokenKind::Keyword, 10, 19);
        let module = tree.add_branch(NodeKind::ModuleDeclaration, vec![header, end]);
        tree.set_root(module);
        (tree, module, header)
    }

    #[test]
    fn text_and_span() {
        let (tree, module, header) = small_tree();
        assert_eq!(tree.text(module), "module m; endmodule");
        assert_eq!(tree.text(header), "module m;");
        assert_eq!(tree.span(header), Span::new(FileId::from_raw(0), 0, 9));
    }

    #[test]
    fn find_is_breadth_first_and_includes_self() {
        let (tree, module, header) = small_tree();
        assert_eq!(tree.find(module, NodeKind::ModuleDeclaration), Some(module));
        assert_eq!(tree.find(module, NodeKind::ModuleHeader), Some(header));
        let name = tree.find(module, TokenKind::SymbolIdentifier).unwrap();
        assert_eq!(tree.text(name), "m");
        assert!(tree.find(module, NodeKind::AlwaysStatement).is_none());
    }

    #[test]
    fn find_path_follows_each_step() {
        let (tree, module, _) = small_tree();
        let name = tree
            .find_path(
                module,
                &[NodeKind::ModuleHeader.into(), TokenKind::SymbolIdentifier.into()],
            )
            .unwrap();
        assert_eq!(tree.text(name), "m");
        assert!(tree
            .find_path(module, &[NodeKind::ModuleItemList.into()])
            .is_none());
    }

    #[test]
    fn expect_find_reports_shape() {
        let (tree, module, _) = small_tree();
        let err = tree.expect_find(module, NodeKind::PortDeclarationList).unwrap_err();
        match err {
            SyntaxError::UnexpectedShape { kind, expected, .. } => {
                assert_eq!(kind, "kModuleDeclaration");
                assert!(expected.contains("kPortDeclarationList"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn insert_keeps_original_nodes() {
        let (mut tree, module, header) = small_tree();
        let before = tree.len();
        let ins = tree.insert_after(header, "genvar i;").unwrap();
        assert_eq!(tree.len(), before + 1);
        assert_eq!(tree.children(module)[1], ins);
        assert_eq!(tree.parent(ins), Some(module));
        assert_eq!(tree.text(ins), "genvar i;");
        // Synthetic nodes do not change the source range of their parent.
        assert_eq!(tree.text(module), "module m; endmodule");

        let first = tree.insert_before(header, "// first").unwrap();
        assert_eq!(tree.children(module)[0], first);
    }

    #[test]
    fn insert_next_to_root_fails() {
        let (mut tree, module, _) = small_tree();
        assert!(tree.insert_after(module, "x").is_err());
    }

    #[test]
    fn word_and_identifier_predicates() {
        let (tree, _, header) = small_tree();
        let children = tree.children(header).to_vec();
        assert!(tree.is_word(children[0], "module"));
        assert!(tree.is_identifier(children[1]));
        assert!(tree.is_word(children[2], ";"));
        assert_eq!(tree.child_identifier(header), Some(children[1]));
    }
}
