use crate::ts::errors::ParseError;
use ast_grep_language::{LanguageExt, SupportLang};
use std::path::Path;
use tree_sitter::{Parser, Tree};

/// Grammar flavour used to parse a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    TypeScript,
    /// TypeScript with JSX syntax (`.tsx`, `.jsx`).
    Tsx,
}

impl Dialect {
    /// Pick the dialect from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str())? {
            "ts" | "mts" | "cts" | "js" | "mjs" | "cjs" => Some(Dialect::TypeScript),
            "tsx" | "jsx" => Some(Dialect::Tsx),
            _ => None,
        }
    }

    fn support_lang(self) -> SupportLang {
        match self {
            Dialect::TypeScript => SupportLang::TypeScript,
            Dialect::Tsx => SupportLang::Tsx,
        }
    }
}

/// Whether `path` names a pure type-declaration file (`.d.ts` and friends).
pub fn is_declaration_path(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    if name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts") {
        return true;
    }

    // Arbitrary-extension declarations: `styles.d.css.ts`
    name.strip_suffix(".ts")
        .and_then(|stem| stem.rsplit_once(".d."))
        .is_some_and(|(base, ext)| !base.is_empty() && !ext.is_empty() && !ext.contains('.'))
}

/// Tree-sitter parser wrapper for TypeScript-family source code.
pub struct TypeScriptParser {
    parser: Parser,
    dialect: Dialect,
}

impl TypeScriptParser {
    /// Create a parser for plain TypeScript.
    pub fn new() -> Result<Self, ParseError> {
        Self::with_dialect(Dialect::default())
    }

    /// Create a parser targeting a specific dialect.
    pub fn with_dialect(dialect: Dialect) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        let ts_lang = dialect.support_lang().get_ts_language();
        parser
            .set_language(&ts_lang)
            .map_err(|_| ParseError::LanguageSet)?;

        Ok(Self { parser, dialect })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Parse source text into a tree. Syntax errors are not reported here;
    /// see [`check_syntax`].
    pub fn parse(&mut self, path: &Path, source: &str) -> Result<Tree, ParseError> {
        self.parser
            .parse(source, None)
            .ok_or_else(|| ParseError::ParseFailed {
                path: path.to_path_buf(),
            })
    }
}

/// Information about an ERROR or MISSING node in the parse tree.
#[derive(Debug, Clone)]
pub struct ErrorNode {
    pub byte_start: usize,
    pub byte_end: usize,
    pub start_point: tree_sitter::Point,
}

/// Collect every ERROR/MISSING node, in source order.
pub fn error_nodes(tree: &Tree) -> Vec<ErrorNode> {
    let mut errors = Vec::new();
    collect_error_nodes(tree.root_node(), &mut errors);
    errors
}

/// Turn a tree with syntax errors into a [`ParseError::SyntaxError`].
pub fn check_syntax(path: &Path, tree: &Tree) -> Result<(), ParseError> {
    if !tree.root_node().has_error() {
        return Ok(());
    }

    let errors = error_nodes(tree);
    let Some(first) = errors.first() else {
        return Ok(());
    };

    Err(ParseError::SyntaxError {
        path: path.to_path_buf(),
        line: first.start_point.row + 1,
        column: first.start_point.column + 1,
        byte_start: first.byte_start,
        byte_end: first.byte_end,
        count: errors.len(),
    })
}

fn collect_error_nodes(node: tree_sitter::Node<'_>, errors: &mut Vec<ErrorNode>) {
    if node.is_error() || node.is_missing() {
        errors.push(ErrorNode {
            byte_start: node.start_byte(),
            byte_end: node.end_byte(),
            start_point: node.start_position(),
        });
    }

    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, errors);
    }
}
