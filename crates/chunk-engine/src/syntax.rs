//! Backend-neutral syntax tree.
//!
//! Strategies and the overlap engine only see [`SyntaxTree`] and [`SyntaxNode`]:
//! a kind tag, byte and line ranges, text and child accessors. The tree-sitter
//! backend in [`SyntaxTree::parse`] is one way to build it; an external parser
//! can populate the same structure through [`SyntaxTree::add_node`].

use crate::error::{ChunkerError, Result};
use crate::language::Language;
use tree_sitter::{Node, Parser};

/// Index of a node inside its [`SyntaxTree`]
pub type NodeId = usize;

/// A named node of a parsed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: String,
    /// First line (1-indexed)
    pub start_line: usize,
    /// Last line (1-indexed, inclusive)
    pub end_line: usize,
    pub start_byte: usize,
    pub end_byte: usize,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SyntaxNode {
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Check whether the node lies entirely within a line range
    #[must_use]
    pub const fn within_lines(&self, start: usize, end: usize) -> bool {
        self.start_line >= start && self.end_line <= end
    }

    /// Stable id derived from the node's kind and line range
    #[must_use]
    pub fn synthetic_id(&self) -> String {
        format!("{}:{}:{}", self.kind, self.start_line, self.end_line)
    }
}

/// Owned syntax tree over a single document
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    language: Language,
    source: String,
    nodes: Vec<SyntaxNode>,
    roots: Vec<NodeId>,
}

impl SyntaxTree {
    /// Create an empty tree over `source`
    pub fn new(language: Language, source: impl Into<String>) -> Self {
        Self {
            language,
            source: source.into(),
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Parse `content` with the tree-sitter grammar of `language`
    pub fn parse(content: &str, language: Language) -> Result<Self> {
        if !language.supports_ast() {
            return Err(ChunkerError::unsupported_language(language.as_str()));
        }

        let ts_language = language.tree_sitter_language()?;
        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| ChunkerError::tree_sitter(format!("Failed to set language: {e}")))?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| ChunkerError::parse("Failed to parse source code"))?;

        let mut syntax = Self::new(language, content);
        let root = tree.root_node();
        let mut cursor = root.walk();
        let top: Vec<Node> = root.named_children(&mut cursor).collect();

        // Iterative walk: (node, parent id in our arena)
        let mut stack: Vec<(Node, Option<NodeId>)> =
            top.into_iter().rev().map(|n| (n, None)).collect();
        while let Some((node, parent)) = stack.pop() {
            let id = syntax.add_node(
                parent,
                node.kind(),
                node.start_position().row + 1,
                node.end_position().row + 1,
                node.start_byte(),
                node.end_byte(),
            );

            let mut child_cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut child_cursor).collect();
            for child in children.into_iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        Ok(syntax)
    }

    /// Append a node; `parent == None` makes it a top-level node
    pub fn add_node(
        &mut self,
        parent: Option<NodeId>,
        kind: impl Into<String>,
        start_line: usize,
        end_line: usize,
        start_byte: usize,
        end_byte: usize,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(SyntaxNode {
            kind: kind.into(),
            start_line,
            end_line: end_line.max(start_line),
            start_byte: start_byte.min(self.source.len()),
            end_byte: end_byte.min(self.source.len()),
            parent,
            children: Vec::new(),
        });

        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent_node) => parent_node.children.push(id),
            None => self.roots.push(id),
        }

        id
    }

    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&SyntaxNode> {
        self.nodes.get(id)
    }

    /// Top-level nodes in document order
    pub fn top_level(&self) -> impl Iterator<Item = (NodeId, &SyntaxNode)> {
        self.roots.iter().map(move |&id| (id, &self.nodes[id]))
    }

    /// All nodes in pre-order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SyntaxNode)> {
        self.nodes.iter().enumerate()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Source text of a node
    #[must_use]
    pub fn text(&self, id: NodeId) -> &str {
        self.nodes
            .get(id)
            .and_then(|node| self.source.get(node.start_byte..node.end_byte))
            .unwrap_or("")
    }

    /// Nodes lying entirely within `[start, end]`
    pub fn nodes_within(&self, start: usize, end: usize) -> impl Iterator<Item = &SyntaxNode> {
        self.nodes
            .iter()
            .filter(move |node| node.within_lines(start, end))
    }

    /// Nodes that begin or end on `line`
    pub fn nodes_touching_line(&self, line: usize) -> impl Iterator<Item = &SyntaxNode> {
        self.nodes
            .iter()
            .filter(move |node| node.start_line == line || node.end_line == line)
    }

    /// Identifier-like name of a node, if one of its direct children carries it
    #[must_use]
    pub fn symbol_name(&self, id: NodeId) -> Option<&str> {
        let node = self.nodes.get(id)?;
        node.children.iter().find_map(|&child| {
            let kind = self.nodes[child].kind.as_str();
            matches!(
                kind,
                "identifier"
                    | "name"
                    | "type_identifier"
                    | "property_identifier"
                    | "field_identifier"
            )
            .then(|| self.text(child))
        })
    }
}
