/// CLI error types
use sama_core::CoreError;
use sama_playback::SessionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog file error: {0}")]
    CatalogFile(String),

    #[error(transparent)]
    Catalog(#[from] CoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
