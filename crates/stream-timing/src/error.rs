use thiserror::Error;

/// Error type for stream timing analysis.
///
/// Missing timestamps are never an error: they travel as `None` through every
/// estimate and series. The variants below cover caller bugs (querying or
/// mutating an accumulator in the wrong state) and the strict validation
/// outcome.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimingError {
    #[error("Invalid time base {num}/{den}: both terms must be positive")]
    InvalidTimeBase { num: i64, den: i64 },
    #[error("Invalid time base literal: {0}")]
    TimeBaseParse(String),
    #[error("Stream {0} has not been finalized")]
    NotFinalized(usize),
    #[error("Stream {0} has already been finalized")]
    AlreadyFinalized(usize),
    #[error("Zero-size flush packet reached stream {0}")]
    FlushPacket(usize),
    #[error("Packet for unknown stream index {0}")]
    UnknownStream(usize),
    #[error("Duplicate stream index {0}")]
    DuplicateStream(usize),
    #[error("Duration validation failed for stream(s) {failed:?}")]
    ValidationFailed { failed: Vec<usize> },
}
