use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::selection::{FileSelection, IndexFormat};

#[derive(Debug, Error, Diagnostic)]
pub enum FactoryError {
    #[error("missing metadata field: {0}")]
    MissingField(String),

    #[error("cannot derive dataset name from title: {0}")]
    MalformedTitle(String),

    #[error("file selection policy not implemented: {0:?}")]
    UnsupportedPolicy(FileSelection),

    #[error("{0} index file lists no datasets")]
    EmptyIndex(IndexFormat),

    #[error("malformed {format} index file: {message}")]
    MalformedIndex { format: IndexFormat, message: String },

    #[error("no dataset selected for file selection '{0}'")]
    NoSelection(String),

    #[error("open data request failed: {0}")]
    Http(String),

    #[error("open data portal returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON: {0}")]
    ConfigParse(String),

    #[error("workflow template not found at {0}")]
    TemplateNotFound(PathBuf),

    #[error("template rendering failed: {0}")]
    Template(String),

    #[error("output directory already exists: {0}")]
    OutputConflict(PathBuf),
}

/// Resolution-level failure: wraps whichever step aborted the resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("Cannot retrieve config due to: {cause}")]
pub struct ConfigError {
    pub cause: String,
}

impl From<FactoryError> for ConfigError {
    fn from(err: FactoryError) -> Self {
        Self {
            cause: err.to_string(),
        }
    }
}
