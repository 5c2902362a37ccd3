//! Error type for loading, compiling and persisting schemas.
use std::path::PathBuf;

use thiserror::Error;

use crate::compile::CompileErrors;

pub type Result<T> = std::result::Result<T, RncError>;

#[derive(Error, Debug)]
pub enum RncError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Compiled document has the wrong shape; `path` is the JSON path of the offending value.
    #[error("bad schema document at {path}: {message}")]
    Document { path: String, message: String },

    #[error("bad schema: dialect marker {found:?} is not {expected:?}")]
    Dialect { found: String, expected: &'static str },

    #[error("{} errors found in schema", .0.len())]
    Compile(CompileErrors),
}

impl RncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RncError::Io { path: path.into(), source }
    }
}
