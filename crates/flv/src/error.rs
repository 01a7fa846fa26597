use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlvError {
    #[error("Invalid FLV header")]
    InvalidHeader,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Incomplete data provided to decoder")]
    IncompleteData,
    #[error("AMF0 error: {0}")]
    Amf0(String),
}
