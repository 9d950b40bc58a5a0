use crate::program::SourceFile;
use std::fmt;
use std::ops::Range;
use tree_sitter::Node;

/// 1-based line/column position inside a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A node of a parsed file together with the file that owns it.
///
/// tree-sitter nodes carry no reference to their source text, so every
/// handle the rewrite engine passes around pairs the two. Spans are byte
/// offsets into [`SourceFile::text`].
#[derive(Clone, Copy)]
pub struct SyntaxNode<'f> {
    file: &'f SourceFile,
    node: Node<'f>,
}

impl<'f> SyntaxNode<'f> {
    pub(crate) fn new(file: &'f SourceFile, node: Node<'f>) -> Self {
        Self { file, node }
    }

    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    pub fn file(&self) -> &'f SourceFile {
        self.file
    }

    /// The underlying tree-sitter node.
    pub fn raw(&self) -> Node<'f> {
        self.node
    }

    pub fn span(&self) -> Range<usize> {
        self.node.byte_range()
    }

    pub fn text(&self) -> &'f str {
        &self.file.text()[self.node.byte_range()]
    }

    pub fn location(&self) -> Location {
        let point = self.node.start_position();
        Location {
            line: point.row + 1,
            column: point.column + 1,
        }
    }

    pub fn parent(&self) -> Option<SyntaxNode<'f>> {
        self.node.parent().map(|node| Self::new(self.file, node))
    }

    pub fn field(&self, name: &str) -> Option<SyntaxNode<'f>> {
        self.node
            .child_by_field_name(name)
            .map(|node| Self::new(self.file, node))
    }

    /// Named children in source order, without comments.
    pub fn named_children(&self) -> Vec<SyntaxNode<'f>> {
        let mut cursor = self.node.walk();
        self.node
            .named_children(&mut cursor)
            .filter(|child| child.kind() != "comment")
            .map(|child| Self::new(self.file, child))
            .collect()
    }

    /// Whether an anonymous token such as `?`, `static` or `get` is a direct
    /// child of this node.
    pub fn has_token(&self, token: &str) -> bool {
        let mut cursor = self.node.walk();
        let found = self
            .node
            .children(&mut cursor)
            .any(|child| !child.is_named() && child.kind() == token);
        found
    }

    pub fn first_named_child(&self) -> Option<SyntaxNode<'f>> {
        self.named_children().into_iter().next()
    }

    /// Whether `other` is this exact node (same file, same tree position).
    pub fn same_node(&self, other: &SyntaxNode<'_>) -> bool {
        std::ptr::eq(self.file, other.file) && self.node.id() == other.node.id()
    }

    /// Whether this expression is part of an optional chain (`a?.b.c`,
    /// `f?.()`, `a?.[0]!`). Parentheses end a chain.
    pub fn is_optional_chain(&self) -> bool {
        let mut current = Some(*self);
        while let Some(node) = current {
            current = match node.kind() {
                "member_expression" | "subscript_expression" => {
                    if node.field("optional_chain").is_some() {
                        return true;
                    }
                    node.field("object")
                }
                "call_expression" => {
                    if node.field("optional_chain").is_some() {
                        return true;
                    }
                    node.field("function")
                }
                "non_null_expression" => node.first_named_child(),
                _ => None,
            };
        }
        false
    }
}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxNode")
            .field("kind", &self.kind())
            .field("span", &self.span())
            .field("file", &self.file.path())
            .finish()
    }
}
