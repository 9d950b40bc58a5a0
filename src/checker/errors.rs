use crate::ts::Location;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypeQueryError {
    #[error("cannot resolve symbol '{name}' at {path}:{location}")]
    UnresolvedSymbol {
        name: String,
        path: PathBuf,
        location: Location,
    },

    #[error("node at {path}:{location} belongs to a file outside the checked program")]
    ForeignNode { path: PathBuf, location: Location },
}
