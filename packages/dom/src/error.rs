//! Error types for the object model

use std::path::PathBuf;

use thiserror::Error;

use crate::model::PropertyName;

pub type DomResult<T> = Result<T, DomError>;

#[derive(Error, Debug)]
pub enum DomError {
    #[error("Format error: {0}")]
    Format(#[from] fxom_glue::GlueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] serde_json::Error),

    #[error("Invalid document location: {0}")]
    Location(#[from] url::ParseError),

    /// The live tree could not be reconciled with a fresh load of the same
    /// document. The markup that failed is kept in `dump`.
    #[error("Refresh failed: {message} (markup dumped to {dump:?})")]
    Refresh {
        message: String,
        dump: Option<PathBuf>,
    },

    #[error("Property '{0}' holds a value that cannot be edited")]
    ReadOnlyProperty(PropertyName),
}
