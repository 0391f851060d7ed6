//! Parse tree wrapper.

use crate::error::SyntaxError;

use super::Span;

/// Holds a parsed tree-sitter tree and associated metadata.
///
/// The tree borrows nothing, so it can be lowered into the owned AST
/// after parsing without re-reading the file.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file path (for error reporting).
    pub path: String,
}

impl ParsedFile {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    /// Build a syntax error located at `node`.
    pub fn error_at(&self, node: tree_sitter::Node, message: impl Into<String>) -> SyntaxError {
        SyntaxError::at(&self.path, &Span::from_node(node), message)
    }

    /// Return the first ERROR or MISSING node, if the tree has any.
    pub fn first_error(&self) -> Option<SyntaxError> {
        let root = self.tree.root_node();
        if !root.has_error() {
            return None;
        }
        let mut cursor = root.walk();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.is_error() {
                return Some(self.error_at(node, "syntax error"));
            }
            if node.is_missing() {
                return Some(self.error_at(node, format!("syntax error: missing {}", node.kind())));
            }
            if node.has_error() {
                let children: Vec<_> = node.children(&mut cursor).collect();
                stack.extend(children.into_iter().rev());
            }
        }
        Some(self.error_at(root, "syntax error"))
    }
}
