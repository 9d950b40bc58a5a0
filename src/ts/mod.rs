//! Tree-sitter integration for TypeScript-family sources.
//!
//! Parsing produces lossless CSTs whose byte spans map exactly onto the
//! original text, which is what the overlay needs to splice replacements
//! without disturbing comments or formatting.

pub mod errors;
pub mod node;
pub mod parser;

pub use errors::ParseError;
pub use node::{Location, SyntaxNode};
pub use parser::{check_syntax, error_nodes, is_declaration_path, Dialect, ErrorNode, TypeScriptParser};
