//! ts-rewrite: type-aware source-to-source rewriting for TypeScript
//!
//! Parses a set of sources once, walks each file's tree with a pluggable
//! [`Transform`], and splices rendered replacements into the original text
//! through a [`TextOverlay`], so everything outside a rewritten span stays
//! byte-for-byte identical.
//!
//! # Architecture
//!
//! - [`Program`] owns every parsed [`SourceFile`] of a run and the
//!   [`CompilerOptions`] they are checked under.
//! - [`TypeQuery`] answers the type facts a rule may ask for, backed by a
//!   declaration-driven [`TypeChecker`].
//! - A rule builds a detached [`Fragment`]; the [`Printer`] renders it against
//!   the node it replaces, adding parentheses where the surrounding
//!   expression needs them.
//! - [`rewrite_program`] drives the walk and returns the new text per file;
//!   nothing touches disk until [`FileWrite::apply_batch`] commits.
//!
//! # Safety
//!
//! - Edits within a file never overlap; a conflicting edit is an error
//! - Declaration files are never rewritten
//! - Any error aborts the run before anything is written
//! - Writes verify the file is unchanged since it was read, then go through
//!   tempfile + fsync + rename
//!
//! # Example
//!
//! ```
//! use ts_rewrite::{
//!     rewrite_program, CompilerOptions, DeprecatedCallRule, NullabilityPolicy, Program, TypeQuery,
//! };
//!
//! let program = Program::from_sources(
//!     [("main.ts", "let x: number[] | null = null;\nutil.deprecated_some(x, isOdd);\n")],
//!     CompilerOptions::default(),
//! )
//! .unwrap();
//!
//! let query = TypeQuery::new(program.type_checker(), NullabilityPolicy::NullOnly);
//! let rule = DeprecatedCallRule::with_defaults(query);
//! let changed = rewrite_program(&program, &rule).unwrap();
//!
//! assert_eq!(
//!     changed[0].rewritten,
//!     "let x: number[] | null = null;\nx?.some(isOdd) ?? false;\n"
//! );
//! ```

pub mod checker;
pub mod config;
pub mod edit;
pub mod overlay;
pub mod pool;
pub mod printer;
pub mod program;
pub mod rules;
pub mod safety;
pub mod ts;
pub mod visitor;

// Re-exports
pub use checker::{NullabilityPolicy, StaticType, TypeChecker, TypeQuery, TypeQueryError};
pub use config::{load_from_path, load_from_str, ConfigError, RewriteConfig};
pub use edit::{Edit, EditError, EditResult, EditVerification, FileWrite};
pub use overlay::{OverlayError, TextOverlay};
pub use printer::{BinaryOperator, Fragment, Literal, Printer, RenderError};
pub use program::{CompilerOptions, Program, SourceFile};
pub use rules::{DeprecatedCallRule, Migration};
pub use safety::{SafetyError, WorkspaceGuard};
pub use ts::{Dialect, Location, ParseError, SyntaxNode};
pub use visitor::{rewrite_file, rewrite_program, AppliedEdit, FileRewrite, RewriteError, Transform};
