//! Serialization of a (possibly augmented) tree back to source text.

use crate::tree::{NodeData, NodeId, SyntaxTree};

impl SyntaxTree {
    /// Regenerates the text of the subtree rooted at `id`.
    ///
    /// Each token contributes the source bytes from the end of the previous
    /// token (or its own start, for the first one) up to its end, so
    /// whitespace, comments and directives between tokens are reproduced
    /// exactly. Each synthetic node contributes `"\n" + text + "\n"`.
    /// Without synthetic nodes the result equals the source between the
    /// first and last token.
    pub fn emit(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut prev_end: Option<u32> = None;
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            match self.data(node) {
                NodeData::Branch { children, .. } => stack.extend(children.iter().rev()),
                NodeData::Token { start, end, .. } => {
                    let begin = prev_end.unwrap_or(*start);
                    out.push_str(
                        self.source()
                            .get(begin as usize..*end as usize)
                            .unwrap_or_default(),
                    );
                    prev_end = Some(*end);
                }
                NodeData::Synthetic { text } => {
                    out.push('\n');
                    out.push_str(text);
                    out.push('\n');
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::kinds::{NodeKind, TokenKind};
    use crate::tree::SyntaxTree;
    use autoss_source::FileId;

    fn tree_for(src: &str, spans: &[(u32, u32)]) -> SyntaxTree {
        let mut tree = SyntaxTree::new(FileId::from_raw(0), src.to_string());
        let tokens = spans
            .iter()
            .map(|&(s, e)| tree.add_token(TokenKind::Punct, s, e))
            .collect();
        let root = tree.add_branch(NodeKind::DescriptionList, tokens);
        tree.set_root(root);
        tree
    }

    #[test]
    fn untouched_tree_reproduces_source() {
        let src = "  a /* c */ b\n  // tail\n c  ";
        let tree = tree_for(src, &[(2, 3), (12, 13), (25, 26)]);
        let root = tree.root().unwrap();
        assert_eq!(tree.emit(root), "a /* c */ b\n  // tail\n c");
    }

    #[test]
    fn synthetic_text_is_wrapped_in_newlines() {
        let src = "a b";
        let mut tree = tree_for(src, &[(0, 1), (2, 3)]);
        let root = tree.root().unwrap();
        let first = tree.children(root)[0];
        tree.insert_after(first, "X").unwrap();
        // Whitespace before `b` is emitted after the inserted text.
        assert_eq!(tree.emit(root), "a\nX\n b");
    }

    #[test]
    fn subtree_emission_starts_at_first_token() {
        let src = "pre a b post";
        let mut tree = SyntaxTree::new(FileId::from_raw(0), src.to_string());
        let a = tree.add_token(TokenKind::SymbolIdentifier, 4, 5);
        let b = tree.add_token(TokenKind::SymbolIdentifier, 6, 7);
        let inner = tree.add_branch(NodeKind::Expression, vec![a, b]);
        let post = tree.add_token(TokenKind::SymbolIdentifier, 8, 12);
        let root = tree.add_branch(NodeKind::DescriptionList, vec![inner, post]);
        tree.set_root(root);
        assert_eq!(tree.emit(inner), "a b");
    }
}
