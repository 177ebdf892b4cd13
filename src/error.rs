//! Build error taxonomy.
//!
//! Each pipeline module owns its error enum (`DataError`, `NamespaceError`,
//! `LayoutError`, ...). [`BuildError`] wraps them all so the orchestrator can
//! use `?` across stages. Every failure is build-fatal: there are no retries
//! and nothing is published when a build fails.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::data::DataError;
use crate::feed::FeedError;
use crate::generate::GenerateError;
use crate::layout::LayoutError;
use crate::partials::NamespaceError;
use crate::routes::RouteError;
use crate::template::TemplateError;

/// A source file could not be read or is malformed.
#[derive(Error, Debug)]
#[error("cannot read {}: {message}", path.display())]
pub struct SourceError {
    pub path: PathBuf,
    pub message: String,
}

impl SourceError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap an I/O failure on `path`.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::new(path, err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
}
