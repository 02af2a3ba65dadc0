//! Crate error type and per-run options shared by the library and the CLI.

use crate::config::ConfigError;
use crate::model::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum BomGuardError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("BOM import error: {0}")]
    Import(String),
    #[error("{0}")]
    Other(String),
}

/// Options for one verification run.
#[derive(Clone, Debug)]
pub struct VerifyOptions {
    /// Run datasheet consistency checks through the document capability.
    pub check_documents: bool,
    /// Fetch datasheets that only have a URL.
    pub download_datasheets: bool,
    /// Overrides `acquisition.concurrency` from the config.
    pub concurrency: Option<usize>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            check_documents: false,
            download_datasheets: true,
            concurrency: None,
        }
    }
}
