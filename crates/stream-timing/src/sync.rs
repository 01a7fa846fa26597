//! # Audio/Video Sync
//!
//! For every timestamp of a base stream, finds the absolute distance to the
//! nearest timestamp of the other stream. Assuming both streams sample the
//! same wall clock, the resulting series approximates the momentary lip-sync
//! drift.
//!
//! The other stream's timestamps are sorted once and searched with a binary
//! search, which gives the same result as comparing against every timestamp.

use serde::{Deserialize, Serialize};

use crate::accumulator::TimingSeries;
use crate::record::StreamKind;
use crate::time_base::TimeBase;

/// `(base timestamp, distance to the nearest other timestamp)`, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SyncSample {
    pub time: f64,
    pub offset: f64,
}

/// Which stream kind provides the base timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncBase {
    #[default]
    Audio,
    Video,
}

impl SyncBase {
    pub fn base_kind(&self) -> StreamKind {
        match self {
            SyncBase::Audio => StreamKind::Audio,
            SyncBase::Video => StreamKind::Video,
        }
    }

    pub fn other_kind(&self) -> StreamKind {
        match self {
            SyncBase::Audio => StreamKind::Video,
            SyncBase::Video => StreamKind::Audio,
        }
    }
}

/// Which timestamp series is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncBasis {
    #[default]
    Pts,
    Dts,
}

impl SyncBasis {
    pub fn seconds(&self, series: &TimingSeries, time_base: TimeBase) -> Vec<Option<f64>> {
        match self {
            SyncBasis::Pts => series.pts_seconds(time_base),
            SyncBasis::Dts => series.dts_seconds(time_base),
        }
    }
}

/// Nearest-timestamp search against a fixed "other" stream.
#[derive(Debug, Clone)]
pub struct AvSyncAnalyzer {
    sorted: Vec<f64>,
}

impl AvSyncAnalyzer {
    pub fn new(other: &[Option<f64>]) -> Self {
        let mut sorted: Vec<f64> = other
            .iter()
            .flatten()
            .copied()
            .filter(|t| t.is_finite())
            .collect();
        sorted.sort_by(f64::total_cmp);
        Self { sorted }
    }

    /// Distance from `time` to the nearest other timestamp.
    pub fn nearest_offset(&self, time: f64) -> Option<f64> {
        let idx = self.sorted.partition_point(|t| *t < time);
        let after = self.sorted.get(idx).map(|t| (t - time).abs());
        let before = idx
            .checked_sub(1)
            .and_then(|i| self.sorted.get(i))
            .map(|t| (time - t).abs());
        match (before, after) {
            (Some(b), Some(a)) => Some(b.min(a)),
            (b, a) => b.or(a),
        }
    }

    /// One sample per present base timestamp, in base order.
    pub fn analyze(&self, base: &[Option<f64>]) -> Vec<SyncSample> {
        if self.sorted.is_empty() {
            return Vec::new();
        }
        base.iter()
            .flatten()
            .filter(|t| t.is_finite())
            .filter_map(|&time| {
                self.nearest_offset(time)
                    .map(|offset| SyncSample { time, offset })
            })
            .collect()
    }
}

/// Convenience wrapper over [`AvSyncAnalyzer`].
pub fn av_sync(base: &[Option<f64>], other: &[Option<f64>]) -> Vec<SyncSample> {
    AvSyncAnalyzer::new(other).analyze(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    fn brute_force(base: &[f64], other: &[f64]) -> Vec<f64> {
        base.iter()
            .map(|b| other.iter().map(|o| (b - o).abs()).fold(f64::MAX, f64::min))
            .collect()
    }

    #[test]
    fn test_nearest_offsets() {
        let samples = av_sync(&some(&[0.0, 1.0, 2.0]), &some(&[0.05, 0.95, 2.5]));
        let offsets: Vec<f64> = samples.iter().map(|s| s.offset).collect();
        let expected = [0.05, 0.05, 0.5];
        assert_eq!(offsets.len(), 3);
        for (offset, expected) in offsets.iter().zip(expected) {
            assert!((offset - expected).abs() < 1e-9, "{offset} != {expected}");
        }
        assert_eq!(samples[1].time, 1.0);
    }

    #[test]
    fn test_matches_brute_force_on_unsorted_other() {
        let base = [0.0, 0.021, 0.042, 0.064, 0.085, 0.3, -0.01];
        let other = [0.080, 0.0, 0.040, 0.120, 0.160, 0.033];
        let expected = brute_force(&base, &other);
        let offsets: Vec<f64> = av_sync(&some(&base), &some(&other))
            .iter()
            .map(|s| s.offset)
            .collect();
        assert_eq!(offsets, expected);
    }

    #[test]
    fn test_empty_side_gives_no_output() {
        assert!(av_sync(&[], &some(&[1.0])).is_empty());
        assert!(av_sync(&some(&[1.0]), &[]).is_empty());
        assert!(av_sync(&some(&[1.0]), &[None, None]).is_empty());
    }

    #[test]
    fn test_missing_base_timestamps_are_skipped() {
        let samples = av_sync(&[Some(0.0), None, Some(1.0)], &[Some(0.5), None]);
        assert_eq!(
            samples,
            vec![
                SyncSample { time: 0.0, offset: 0.5 },
                SyncSample { time: 1.0, offset: 0.5 },
            ]
        );
    }

    #[test]
    fn test_repeatable() {
        let analyzer = AvSyncAnalyzer::new(&some(&[0.1, 0.2, 0.3]));
        let base = some(&[0.0, 0.15, 0.4]);
        assert_eq!(analyzer.analyze(&base), analyzer.analyze(&base));
    }

    #[test]
    fn test_sync_base_kinds() {
        assert_eq!(SyncBase::default().base_kind(), StreamKind::Audio);
        assert_eq!(SyncBase::default().other_kind(), StreamKind::Video);
        assert_eq!(SyncBase::Video.base_kind(), StreamKind::Video);
    }
}
