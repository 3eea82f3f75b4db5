use std::path::PathBuf;

/// All errors that can occur during workspace setup and simulator calls.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("{tool} failed: {detail}")]
    Tool { tool: String, detail: String },

    /// A build reported success but the expected artifact is absent.
    #[error("build verification failed: {0} not found")]
    MissingArtifact(PathBuf),

    /// User input failed a precondition check. No external call was made.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Custom(String),
}

impl SimError {
    pub fn tool(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        SimError::Tool {
            tool: tool.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
