//! The checking session: every input file parsed once, plus the options the
//! type checker runs with.
//!
//! A [`Program`] is built once per run and handed explicitly to the type
//! checker and the rewrite driver. Files own their trees; nodes borrow from
//! the file and never outlive it.

use crate::checker::TypeChecker;
use crate::pool::with_parser;
use crate::ts::{check_syntax, is_declaration_path, Dialect, ParseError, SyntaxNode};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tree_sitter::Tree;

/// Options that influence type facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Strict null checks. When off, `null` and `undefined` are erased from
    /// every union and no expression is nullable.
    pub strict: bool,
    /// Global value names that resolve without a declaration, on top of the
    /// built-in runtime globals.
    pub ambient_globals: Vec<String>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            strict: true,
            ambient_globals: Vec::new(),
        }
    }
}

/// One parsed source file.
pub struct SourceFile {
    path: PathBuf,
    text: String,
    tree: Tree,
    dialect: Dialect,
    is_declaration: bool,
    is_module: bool,
}

impl SourceFile {
    /// Parse `text` as the contents of `path`.
    pub fn parse(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<Self, ParseError> {
        let path = path.into();
        let text = text.into();
        let dialect = Dialect::from_path(&path)
            .ok_or_else(|| ParseError::UnsupportedExtension { path: path.clone() })?;

        let tree = with_parser(dialect, |parser| parser.parse(&path, &text))??;
        check_syntax(&path, &tree)?;

        let is_declaration = is_declaration_path(&path);
        let is_module = has_module_syntax(&tree);

        Ok(Self {
            path,
            text,
            tree,
            dialect,
            is_declaration,
            is_module,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Pure type-signature files are never rewritten.
    pub fn is_declaration_file(&self) -> bool {
        self.is_declaration
    }

    /// Files with top-level `import`/`export` do not contribute to the
    /// global scope.
    pub fn is_module(&self) -> bool {
        self.is_module
    }

    pub fn root(&self) -> SyntaxNode<'_> {
        SyntaxNode::new(self, self.tree.root_node())
    }

    /// The node of `kind` spanning exactly `start..end`.
    pub(crate) fn node_at(&self, start: usize, end: usize, kind: &str) -> Option<SyntaxNode<'_>> {
        let mut node = self.tree.root_node().descendant_for_byte_range(start, end)?;
        loop {
            if node.kind() == kind && node.start_byte() == start && node.end_byte() == end {
                return Some(SyntaxNode::new(self, node));
            }
            node = node.parent()?;
        }
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("path", &self.path)
            .field("dialect", &self.dialect)
            .field("len", &self.text.len())
            .field("is_declaration", &self.is_declaration)
            .finish()
    }
}

fn has_module_syntax(tree: &Tree) -> bool {
    let root = tree.root_node();
    let mut cursor = root.walk();
    let found = root
        .named_children(&mut cursor)
        .any(|child| matches!(child.kind(), "import_statement" | "export_statement"));
    found
}

/// All files of one run, parsed, with the options they are checked under.
#[derive(Debug)]
pub struct Program {
    files: Vec<SourceFile>,
    options: CompilerOptions,
}

impl Program {
    /// Read and parse every path. The first unreadable or unparsable file
    /// aborts the load.
    pub fn load<P: AsRef<Path>>(paths: &[P], options: CompilerOptions) -> Result<Self, ParseError> {
        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            sources.push((path.to_path_buf(), text));
        }
        Self::from_sources(sources, options)
    }

    /// Build a program from in-memory sources. Repeated paths keep the first
    /// occurrence.
    pub fn from_sources<I, P, S>(sources: I, options: CompilerOptions) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = (P, S)>,
        P: Into<PathBuf>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for (path, text) in sources {
            let path = path.into();
            if !seen.insert(path.clone()) {
                continue;
            }
            let file = SourceFile::parse(path, text)?;
            tracing::debug!(path = %file.path().display(), dialect = ?file.dialect(), "parsed source file");
            files.push(file);
        }

        Ok(Self { files, options })
    }

    pub fn source_files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Whether `file` is one of this program's files (identity, not path).
    pub fn contains(&self, file: &SourceFile) -> bool {
        self.files.iter().any(|candidate| std::ptr::eq(candidate, file))
    }

    /// Position of `file` in [`Program::source_files`].
    pub(crate) fn file_index(&self, file: &SourceFile) -> Option<usize> {
        self.files.iter().position(|candidate| std::ptr::eq(candidate, file))
    }

    /// Every file other than `exclude`, for lookups that fall back to
    /// declarations outside the use site's file.
    pub(crate) fn other_files<'a>(
        &'a self,
        exclude: &'a SourceFile,
    ) -> impl Iterator<Item = &'a SourceFile> + 'a {
        self.files.iter().filter(move |file| !std::ptr::eq(*file, exclude))
    }

    /// Resolve a relative import specifier the way a bundler-style module
    /// resolver does: the exact path, then the TypeScript extensions, then
    /// an `index` file. A `.js` specifier also matches its `.ts` source.
    /// Package imports never resolve.
    pub fn resolve_module(&self, importer: &SourceFile, specifier: &str) -> Option<&SourceFile> {
        if !(specifier.starts_with("./") || specifier.starts_with("../")) {
            return None;
        }

        let base = importer.path().parent().unwrap_or(Path::new(""));
        let target = normalize(&base.join(specifier));
        let target = target.to_string_lossy();
        let stem = target
            .strip_suffix(".js")
            .or_else(|| target.strip_suffix(".jsx"))
            .unwrap_or(&*target);

        let candidates = [
            target.to_string(),
            format!("{stem}.ts"),
            format!("{stem}.tsx"),
            format!("{stem}.d.ts"),
            format!("{stem}/index.ts"),
            format!("{stem}/index.tsx"),
            format!("{stem}/index.d.ts"),
        ];

        candidates.iter().find_map(|candidate| {
            let candidate = Path::new(candidate);
            self.files
                .iter()
                .find(|file| normalize(file.path()) == candidate)
        })
    }

    pub fn type_checker(&self) -> TypeChecker<'_> {
        TypeChecker::new(self)
    }
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}
