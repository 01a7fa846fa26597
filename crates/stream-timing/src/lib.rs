//! # Stream Timing
//!
//! Timing diagnostics for the elementary streams of a demuxed audio/video
//! container.
//!
//! ## Key Features:
//!
//! - Per-stream accumulation of (dts, pts, duration, size) packet records
//! - Four independent duration estimates, cross-checked against the
//!   container's declared duration
//! - Windowed bitrate and frame rate
//! - dts jitter (consecutive deltas)
//! - Nearest-timestamp audio/video sync drift
//!
//! Missing timestamps are carried as `None` through every computation, so a
//! value that cannot be computed is reported as missing instead of a
//! fabricated zero.
//!
//! ## License
//!
//! MIT License
//!
//! ## Authors
//!
//! - hua0512
//!

pub mod accumulator;
pub mod analysis;
pub mod config;
pub mod delta;
pub mod duration;
pub mod error;
pub mod rate;
pub mod record;
pub mod report;
pub mod sync;
pub mod time_base;

pub use accumulator::{StreamTimingAccumulator, TimingMarks, TimingSeries};
pub use analysis::{ContainerAnalyzer, analyze_stream};
pub use config::{AnalysisConfig, RateConfig, SyncConfig};
pub use delta::{Delta, delta_series};
pub use duration::{
    DurationEstimate, DurationEstimator, DurationMethod, SkipReason, ValidationPolicy, Verdict,
};
pub use error::TimingError;
pub use rate::{RateSample, RateSummary, WindowedRateCalculator};
pub use record::{ContainerInfo, PacketRecord, StreamKind, StreamMetadata};
pub use report::{AvSyncReport, ContainerReport, SecondsSeries, StreamReport};
pub use sync::{AvSyncAnalyzer, SyncBase, SyncBasis, SyncSample, av_sync};
pub use time_base::{FrameRate, TimeBase};
