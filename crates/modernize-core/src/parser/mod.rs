//! Java parsing on top of tree-sitter-java
//!
//! A [`SourceUnit`] owns the original text of one compilation unit together
//! with its syntax tree. Units are never mutated; rewrites produce new text.

use std::path::{Path, PathBuf};

use tree_sitter::{Node, Tree};

use crate::edit::Span;
use crate::error::{ModernizeError, Result};

pub mod syntax;

/// Java parser using tree-sitter-java
pub struct JavaParser {
    parser: tree_sitter::Parser,
}

impl JavaParser {
    pub fn new() -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| ModernizeError::Language(format!("Failed to set Java language: {e}")))?;

        Ok(Self { parser })
    }

    /// Parse `text` into a unit, rejecting text with syntax errors
    pub fn parse_unit(&mut self, path: impl Into<PathBuf>, text: String) -> Result<SourceUnit> {
        let path = path.into();
        let tree = self
            .parser
            .parse(&text, None)
            .ok_or_else(|| ModernizeError::UnitParseFailure {
                path: path.clone(),
                line: 1,
            })?;

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error(root).map(|n| n.start_position().row + 1).unwrap_or(1);
            return Err(ModernizeError::UnitParseFailure { path, line });
        }

        Ok(SourceUnit { path, text, tree })
    }

    /// Parse a file from disk
    pub fn parse_file(&mut self, path: &Path) -> Result<SourceUnit> {
        let text = std::fs::read_to_string(path)?;
        self.parse_unit(path, text)
    }

    /// Whether `text` parses without any error or missing node
    pub fn parses_cleanly(&mut self, text: &str) -> bool {
        self.parser
            .parse(text, None)
            .is_some_and(|tree| !tree.root_node().has_error())
    }
}

/// First error or missing node in document order
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error);
    found
}

/// One parsed compilation unit
pub struct SourceUnit {
    path: PathBuf,
    text: String,
    tree: Tree,
}

impl SourceUnit {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text of `node`
    pub fn text_of(&self, node: Node<'_>) -> &str {
        &self.text[node.start_byte()..node.end_byte()]
    }

    pub fn slice(&self, span: Span) -> &str {
        &self.text[span.start..span.end]
    }

    /// 1-based line of a byte offset
    pub fn line_of(&self, offset: usize) -> usize {
        self.text[..offset.min(self.text.len())]
            .bytes()
            .filter(|&b| b == b'\n')
            .count()
            + 1
    }

    /// Leading whitespace of the line containing `offset`
    pub fn indent_at(&self, offset: usize) -> &str {
        let line_start = self.text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line = &self.text[line_start..];
        let width = line
            .find(|c: char| c != ' ' && c != '\t')
            .unwrap_or(line.len());
        &line[..width]
    }

    /// Node of `kind` whose range is exactly `span`
    pub fn node_at(&self, span: Span, kind: &str) -> Option<Node<'_>> {
        let mut node = self.root().descendant_for_byte_range(span.start, span.end)?;
        loop {
            if node.start_byte() != span.start || node.end_byte() != span.end {
                return None;
            }
            if node.kind() == kind {
                return Some(node);
            }
            node = node.parent()?;
        }
    }

    /// Whether `span` starts at the start of some node and ends at the end of
    /// a sibling of that node
    pub fn is_node_aligned(&self, span: Span) -> bool {
        let Some(cover) = self.root().descendant_for_byte_range(span.start, span.end) else {
            return false;
        };
        if cover.start_byte() == span.start && cover.end_byte() == span.end {
            return true;
        }
        let mut cursor = cover.walk();
        let children: Vec<Node<'_>> = cover.children(&mut cursor).collect();
        children.iter().any(|c| c.start_byte() == span.start)
            && children.iter().any(|c| c.end_byte() == span.end)
    }

    /// Spans of every comment in the unit
    pub fn comment_spans(&self) -> Vec<Span> {
        let mut spans = Vec::new();
        let mut cursor = self.root().walk();
        'walk: loop {
            let node = cursor.node();
            if syntax::is_comment(node) {
                spans.push(Span::of(node));
            }
            if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    continue 'walk;
                }
                if !cursor.goto_parent() {
                    break 'walk;
                }
            }
        }
        spans
    }
}

impl std::fmt::Debug for SourceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceUnit")
            .field("path", &self.path)
            .field("len", &self.text.len())
            .finish()
    }
}
