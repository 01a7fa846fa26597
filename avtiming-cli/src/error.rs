use stream_timing::TimingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Download error: {0}")]
    Download(#[from] reqwest::Error),

    #[error("FLV error: {0}")]
    Flv(#[from] flv::FlvError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Analysis error: {0}")]
    Timing(#[from] TimingError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unrecognized input format: {0}")]
    UnknownFormat(String),
}

impl CliError {
    /// Process exit status: 2 for a strict validation failure, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Timing(TimingError::ValidationFailed { .. }) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
