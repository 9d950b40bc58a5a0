//! Thread-local parser pooling.
//!
//! Keeps one parser per dialect per thread. Loading a program parses every
//! file once, so reusing the parser avoids re-initializing the grammar for
//! each file.

use crate::ts::{Dialect, ParseError, TypeScriptParser};
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static PARSERS: RefCell<HashMap<Dialect, TypeScriptParser>> = RefCell::new(HashMap::new());
}

/// Execute function with the pooled parser for `dialect`.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use std::path::Path;
/// use ts_rewrite::pool::with_parser;
/// use ts_rewrite::ts::Dialect;
///
/// let tree = with_parser(Dialect::TypeScript, |parser| {
///     parser.parse(Path::new("a.ts"), "let x = 1;")
/// })??;
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(dialect: Dialect, f: F) -> Result<R, ParseError>
where
    F: FnOnce(&mut TypeScriptParser) -> R,
{
    PARSERS.with(|cell| {
        let mut parsers = cell.borrow_mut();
        let parser = match parsers.entry(dialect) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(TypeScriptParser::with_dialect(dialect)?)
            }
        };
        Ok(f(parser))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn reuses_parser_per_dialect() {
        let first = with_parser(Dialect::Tsx, |parser| parser.dialect()).unwrap();
        let second = with_parser(Dialect::TypeScript, |parser| parser.dialect()).unwrap();
        assert_eq!(first, Dialect::Tsx);
        assert_eq!(second, Dialect::TypeScript);

        let tree = with_parser(Dialect::TypeScript, |parser| {
            parser.parse(Path::new("a.ts"), "let x = 1;")
        })
        .unwrap()
        .unwrap();
        assert_eq!(tree.root_node().kind(), "program");
    }
}
