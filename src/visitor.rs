//! The rewrite driver.
//!
//! Walks every named node of a file in pre-order and offers it to a
//! [`Transform`]. A node that gets a replacement is printed, registered on
//! the file's [`TextOverlay`] and not descended into; replacements therefore
//! never nest and the overlay only sees disjoint spans from one walk.

use crate::checker::TypeQueryError;
use crate::edit::FileWrite;
use crate::overlay::{OverlayError, TextOverlay};
use crate::printer::{Fragment, Printer, RenderError};
use crate::program::{Program, SourceFile};
use crate::ts::{Location, SyntaxNode};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Per-node rewrite decision.
pub trait Transform {
    /// `Ok(Some(_))` replaces `node` and skips its subtree, `Ok(None)` keeps
    /// it and continues into its children.
    fn transform<'f>(&self, node: SyntaxNode<'f>) -> Result<Option<Fragment<'f>>, TypeQueryError>;
}

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("type query failed at {path}:{location}: {source}")]
    TypeQuery {
        path: PathBuf,
        location: Location,
        #[source]
        source: TypeQueryError,
    },

    #[error("cannot render replacement at {path}:{location}: {source}")]
    Render {
        path: PathBuf,
        location: Location,
        #[source]
        source: RenderError,
    },

    #[error("conflicting edit at {path}:{location}: {source}")]
    Overlay {
        path: PathBuf,
        location: Location,
        #[source]
        source: OverlayError,
    },

    #[error("refusing to rewrite declaration file {path}")]
    DeclarationFile { path: PathBuf },
}

/// One replacement, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedEdit {
    pub line: usize,
    pub column: usize,
    pub before: String,
    pub after: String,
}

/// Outcome of rewriting one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileRewrite {
    pub path: PathBuf,
    #[serde(skip)]
    pub original: String,
    #[serde(skip)]
    pub rewritten: String,
    pub edits: Vec<AppliedEdit>,
}

impl FileRewrite {
    pub fn is_changed(&self) -> bool {
        self.original != self.rewritten
    }

    /// Guarded write of the rewritten text back to `path`.
    pub fn to_file_write(&self) -> FileWrite {
        FileWrite::new(&self.path, &self.original, self.rewritten.clone())
    }
}

/// Rewrite one file. The file is only read; the result carries the new text.
pub fn rewrite_file(
    file: &SourceFile,
    transform: &dyn Transform,
    printer: &Printer,
) -> Result<FileRewrite, RewriteError> {
    if file.is_declaration_file() {
        return Err(RewriteError::DeclarationFile {
            path: file.path().to_path_buf(),
        });
    }

    let mut overlay = TextOverlay::new(file.text());
    let mut edits = Vec::new();

    let mut stack = vec![file.root()];
    while let Some(node) = stack.pop() {
        let replacement = transform
            .transform(node)
            .map_err(|source| RewriteError::TypeQuery {
                path: file.path().to_path_buf(),
                location: node.location(),
                source,
            })?;

        let Some(fragment) = replacement else {
            let mut children = node.named_children();
            children.reverse();
            stack.extend(children);
            continue;
        };

        let text = printer
            .print(&fragment, node)
            .map_err(|source| RewriteError::Render {
                path: file.path().to_path_buf(),
                location: node.location(),
                source,
            })?;

        let span = node.span();
        overlay
            .overwrite(span.start, span.end, text.clone())
            .map_err(|source| RewriteError::Overlay {
                path: file.path().to_path_buf(),
                location: node.location(),
                source,
            })?;

        let location = node.location();
        tracing::debug!(
            path = %file.path().display(),
            %location,
            before = node.text(),
            after = %text,
            "rewrite"
        );
        edits.push(AppliedEdit {
            line: location.line,
            column: location.column,
            before: node.text().to_string(),
            after: text,
        });
    }

    let rewritten = overlay.finalize();
    if !edits.is_empty() {
        tracing::info!(path = %file.path().display(), edits = edits.len(), "rewrote file");
    }

    Ok(FileRewrite {
        path: file.path().to_path_buf(),
        original: file.text().to_string(),
        rewritten,
        edits,
    })
}

/// Rewrite every non-declaration file of `program`, returning only the
/// files whose text changed. The first error aborts the whole pass.
pub fn rewrite_program(
    program: &Program,
    transform: &dyn Transform,
) -> Result<Vec<FileRewrite>, RewriteError> {
    let printer = Printer::new();
    let mut changed = Vec::new();

    for file in program.source_files() {
        if file.is_declaration_file() {
            tracing::debug!(path = %file.path().display(), "skipping declaration file");
            continue;
        }
        let rewrite = rewrite_file(file, transform, &printer)?;
        if rewrite.is_changed() {
            changed.push(rewrite);
        }
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::CompilerOptions;

    /// Replaces every identifier `old` with `new`.
    struct Rename;

    impl Transform for Rename {
        fn transform<'f>(
            &self,
            node: SyntaxNode<'f>,
        ) -> Result<Option<Fragment<'f>>, TypeQueryError> {
            if node.kind() == "identifier" && node.text() == "old" {
                return Ok(Some(Fragment::Identifier("new".to_string())));
            }
            Ok(None)
        }
    }

    /// Replaces whole call expressions and their arguments, which the
    /// driver must not both hand out.
    struct Nested;

    impl Transform for Nested {
        fn transform<'f>(
            &self,
            node: SyntaxNode<'f>,
        ) -> Result<Option<Fragment<'f>>, TypeQueryError> {
            match node.kind() {
                "call_expression" | "identifier" => {
                    Ok(Some(Fragment::Identifier("x".to_string())))
                }
                _ => Ok(None),
            }
        }
    }

    struct Failing;

    impl Transform for Failing {
        fn transform<'f>(
            &self,
            node: SyntaxNode<'f>,
        ) -> Result<Option<Fragment<'f>>, TypeQueryError> {
            if node.kind() == "identifier" {
                return Err(TypeQueryError::UnresolvedSymbol {
                    name: node.text().to_string(),
                    path: node.file().path().to_path_buf(),
                    location: node.location(),
                });
            }
            Ok(None)
        }
    }

    fn program(sources: &[(&str, &str)]) -> Program {
        Program::from_sources(sources.iter().copied(), CompilerOptions::default()).unwrap()
    }

    #[test]
    fn replaces_in_source_order_and_keeps_trivia() {
        let program = program(&[("a.ts", "old(1); // old\n/* x */ old + old;\n")]);
        let rewrite = rewrite_file(&program.source_files()[0], &Rename, &Printer::new()).unwrap();

        assert_eq!(rewrite.rewritten, "new(1); // old\n/* x */ new + new;\n");
        let positions: Vec<_> = rewrite.edits.iter().map(|e| (e.line, e.column)).collect();
        assert_eq!(positions, vec![(1, 1), (2, 9), (2, 15)]);
    }

    #[test]
    fn replaced_subtrees_are_not_descended() {
        let program = program(&[("a.ts", "f(g(h));\n")]);
        let rewrite = rewrite_file(&program.source_files()[0], &Nested, &Printer::new()).unwrap();

        assert_eq!(rewrite.rewritten, "x;\n");
        assert_eq!(rewrite.edits.len(), 1);
    }

    #[test]
    fn untouched_file_is_identical() {
        let source = "const a = 1;\n\n  // nothing to do\n";
        let program = program(&[("a.ts", source)]);
        let rewrite = rewrite_file(&program.source_files()[0], &Rename, &Printer::new()).unwrap();

        assert!(!rewrite.is_changed());
        assert_eq!(rewrite.rewritten, source);
    }

    #[test]
    fn declaration_files_are_refused() {
        let program = program(&[("types.d.ts", "declare const old: number;\n")]);
        let result = rewrite_file(&program.source_files()[0], &Rename, &Printer::new());
        assert!(matches!(result, Err(RewriteError::DeclarationFile { .. })));
    }

    #[test]
    fn program_pass_skips_declarations_and_unchanged_files() {
        let program = program(&[
            ("types.d.ts", "declare const old: number;\n"),
            ("a.ts", "old;\n"),
            ("b.ts", "other;\n"),
        ]);
        let changed = rewrite_program(&program, &Rename).unwrap();

        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].path, PathBuf::from("a.ts"));
        assert_eq!(changed[0].rewritten, "new;\n");
    }

    #[test]
    fn transform_errors_carry_location() {
        let program = program(&[("a.ts", "\n  value;\n")]);
        let err = rewrite_program(&program, &Failing).unwrap_err();

        match err {
            RewriteError::TypeQuery { path, location, .. } => {
                assert_eq!(path, PathBuf::from("a.ts"));
                assert_eq!(location, Location { line: 2, column: 3 });
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
