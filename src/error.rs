//! Error types for complaint-lens

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalystError {
    #[error("Complaint data not found: {}", .0.display())]
    DataNotFound(PathBuf),

    #[error("Complaint data is malformed: {0}")]
    DataMalformed(String),

    #[error("Complaint corpus is empty")]
    EmptyCorpus,

    #[error("Render failure: {0}")]
    Render(String),

    #[error("Mail transport failure: {0}")]
    MailTransport(String),

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Remote text generation unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalystError {
    /// Wrap any displayable renderer error
    pub fn render(err: impl std::fmt::Display) -> Self {
        AnalystError::Render(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalystError>;
