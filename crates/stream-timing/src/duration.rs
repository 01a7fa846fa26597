//! # Duration Estimation
//!
//! Four independent estimates of a stream's duration, each trusting a
//! different part of the timing information:
//!
//! - **by sum**: `sum(duration of every packet)`
//! - **by dts**: `last_dts - first_dts + last_duration`
//! - **by pts**: `biggest_pts - smallest_valid_pts + biggest_pts_packet_duration`
//! - **by pts and start time**: `biggest_pts - start_time + biggest_pts_packet_duration`
//!
//! Only pts `>= 0` take part in the pts based estimates; negative values show
//! up while the decoder fills its reordering buffer.
//!
//! When the container declares a duration, every estimate is compared against
//! it and the comparison of the configured method decides whether the stream
//! passes validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::accumulator::TimingMarks;
use crate::record::StreamMetadata;
use crate::time_base::TimeBase;

/// Default validation threshold in milliseconds.
pub const DEFAULT_THRESHOLD_MS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DurationMethod {
    Sum,
    DtsSpan,
    PtsSpan,
    #[default]
    PtsAndStartTime,
}

impl DurationMethod {
    pub const ALL: [DurationMethod; 4] = [
        DurationMethod::Sum,
        DurationMethod::DtsSpan,
        DurationMethod::PtsSpan,
        DurationMethod::PtsAndStartTime,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DurationMethod::Sum => "duration_by_sum",
            DurationMethod::DtsSpan => "duration_by_dts",
            DurationMethod::PtsSpan => "duration_by_pts",
            DurationMethod::PtsAndStartTime => "duration_by_pts_and_start_time",
        }
    }

    pub fn formula(&self) -> &'static str {
        match self {
            DurationMethod::Sum => "sum(duration of every packet)",
            DurationMethod::DtsSpan => "last_dts - first_dts + last_duration",
            DurationMethod::PtsSpan => {
                "biggest_pts - smallest_valid_pts + biggest_pts_packet_duration"
            }
            DurationMethod::PtsAndStartTime => {
                "biggest_pts - start_time + biggest_pts_packet_duration"
            }
        }
    }
}

impl fmt::Display for DurationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The four duration estimates of a stream and their deltas against the
/// declared duration, all in ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DurationEstimate {
    pub by_sum: Option<i64>,
    pub by_dts: Option<i64>,
    pub by_pts: Option<i64>,
    pub by_pts_and_start_time: Option<i64>,

    pub delta_by_sum: Option<i64>,
    pub delta_by_dts: Option<i64>,
    pub delta_by_pts: Option<i64>,
    pub delta_by_pts_and_start_time: Option<i64>,
}

impl DurationEstimate {
    pub fn estimate(&self, method: DurationMethod) -> Option<i64> {
        match method {
            DurationMethod::Sum => self.by_sum,
            DurationMethod::DtsSpan => self.by_dts,
            DurationMethod::PtsSpan => self.by_pts,
            DurationMethod::PtsAndStartTime => self.by_pts_and_start_time,
        }
    }

    pub fn delta(&self, method: DurationMethod) -> Option<i64> {
        match method {
            DurationMethod::Sum => self.delta_by_sum,
            DurationMethod::DtsSpan => self.delta_by_dts,
            DurationMethod::PtsSpan => self.delta_by_pts,
            DurationMethod::PtsAndStartTime => self.delta_by_pts_and_start_time,
        }
    }
}

/// Stateless duration estimator.
pub struct DurationEstimator;

impl DurationEstimator {
    pub fn estimate(marks: &TimingMarks, metadata: &StreamMetadata) -> DurationEstimate {
        if marks.packet_count == 0 {
            return DurationEstimate::default();
        }

        let by_sum = marks.duration_sum;

        let by_dts = span(
            marks.first_dts,
            marks.last_dts,
            marks.last_dts_duration.unwrap_or(0),
        );

        let tail = marks.biggest_pts_packet_duration.unwrap_or(0);
        let by_pts = span(marks.smallest_valid_pts, marks.biggest_pts, tail);
        let by_pts_and_start_time = span(metadata.declared_start_time, marks.biggest_pts, tail);

        let delta = |estimate: Option<i64>| estimate?.checked_sub(metadata.declared_duration?);

        DurationEstimate {
            by_sum,
            by_dts,
            by_pts,
            by_pts_and_start_time,
            delta_by_sum: delta(by_sum),
            delta_by_dts: delta(by_dts),
            delta_by_pts: delta(by_pts),
            delta_by_pts_and_start_time: delta(by_pts_and_start_time),
        }
    }
}

/// `last - first + tail`, missing when an operand is missing or the result
/// does not fit in an `i64`.
fn span(first: Option<i64>, last: Option<i64>, tail: i64) -> Option<i64> {
    last?.checked_sub(first?)?.checked_add(tail)
}

/// How duration deltas are judged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// A stream fails when `|delta| >= threshold_ms`.
    pub threshold_ms: f64,
    /// The estimate whose delta is judged.
    pub method: DurationMethod,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            threshold_ms: DEFAULT_THRESHOLD_MS,
            method: DurationMethod::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SkipReason {
    /// The container declares no duration for the stream.
    NoDeclaredDuration,
    /// The judged estimate could not be computed.
    MissingEstimate,
}

/// Outcome of validating one stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "kebab-case")]
pub enum Verdict {
    Valid { delta_ms: f64 },
    Invalid { delta_ms: f64 },
    Skipped { reason: SkipReason },
}

impl Verdict {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Verdict::Invalid { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Valid { delta_ms } => write!(f, "valid (delta {delta_ms:.3} ms)"),
            Verdict::Invalid { delta_ms } => write!(f, "INVALID (delta {delta_ms:.3} ms)"),
            Verdict::Skipped {
                reason: SkipReason::NoDeclaredDuration,
            } => write!(f, "skipped (no declared duration)"),
            Verdict::Skipped {
                reason: SkipReason::MissingEstimate,
            } => write!(f, "skipped (estimate unavailable)"),
        }
    }
}

impl ValidationPolicy {
    pub fn judge(
        &self,
        estimate: &DurationEstimate,
        metadata: &StreamMetadata,
        time_base: TimeBase,
    ) -> Verdict {
        if metadata.declared_duration.is_none() {
            return Verdict::Skipped {
                reason: SkipReason::NoDeclaredDuration,
            };
        }
        match estimate.delta(self.method) {
            Some(delta) => {
                let delta_ms = time_base.to_millis(delta);
                if delta_ms.abs() >= self.threshold_ms {
                    Verdict::Invalid { delta_ms }
                } else {
                    Verdict::Valid { delta_ms }
                }
            }
            None => Verdict::Skipped {
                reason: SkipReason::MissingEstimate,
            },
        }
    }
}
