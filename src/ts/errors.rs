use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to set language for parser")]
    LanguageSet,

    #[error("failed to parse {path}")]
    ParseFailed { path: PathBuf },

    #[error("unsupported source file extension: {path}")]
    UnsupportedExtension { path: PathBuf },

    #[error("syntax error in {path}:{line}:{column} (byte {byte_start}..{byte_end}, {count} ERROR nodes)")]
    SyntaxError {
        path: PathBuf,
        line: usize,
        column: usize,
        byte_start: usize,
        byte_end: usize,
        count: usize,
    },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
