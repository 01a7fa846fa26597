//! # Windowed Rates
//!
//! Buckets a stream's packets into fixed, contiguous windows along its dts
//! axis and aggregates a per-packet weight inside each window. Two
//! specialisations exist: bitrate (weight = packet size) and frame rate
//! (weight = 1).
//!
//! A window is only emitted once a later packet crosses its end, so the
//! trailing partial window never produces a sample. Windows advance by one
//! interval per crossing packet: a long gap without packets does not produce
//! samples for the skipped windows.

use serde::Serialize;
use tracing::trace;

use crate::accumulator::TimingSeries;
use crate::time_base::TimeBase;

/// One closed window: its start in seconds and the aggregated value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateSample {
    pub time: f64,
    pub value: f64,
}

/// Fixed-interval bucketing over a dts series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowedRateCalculator {
    time_base: TimeBase,
    window_seconds: f64,
}

impl WindowedRateCalculator {
    /// One-second windows.
    pub fn new(time_base: TimeBase) -> Self {
        Self::with_window(time_base, 1.0)
    }

    /// Windows of `window_seconds`; non-positive values fall back to one second.
    pub fn with_window(time_base: TimeBase, window_seconds: f64) -> Self {
        let window_seconds = if window_seconds > 0.0 { window_seconds } else { 1.0 };
        Self {
            time_base,
            window_seconds,
        }
    }

    /// Window length in ticks.
    pub fn interval(&self) -> f64 {
        self.time_base.ticks_per_second() * self.window_seconds
    }

    /// Raw windows as `(window_start_ticks, aggregate)`.
    ///
    /// Packets without a dts cannot be placed on the axis and are skipped.
    pub fn windows<W>(&self, dts: &[Option<i64>], weight: W) -> Vec<(f64, f64)>
    where
        W: Fn(usize) -> f64,
    {
        let interval = self.interval();
        let mut windows = Vec::new();
        let mut window_start: Option<f64> = None;
        let mut aggregate = 0.0;

        for (i, dts) in dts.iter().enumerate() {
            let Some(dts) = dts.map(|d| d as f64) else {
                trace!(packet = i, "skipping packet without dts");
                continue;
            };
            let start = *window_start.get_or_insert(dts);
            if dts > start + interval {
                windows.push((start, aggregate));
                window_start = Some(start + interval);
                aggregate = 0.0;
            }
            aggregate += weight(i);
        }

        windows
    }

    /// Bitrate in kbit/s per window (`bytes * 8 / 1024`).
    pub fn bitrate(&self, series: &TimingSeries) -> Vec<RateSample> {
        self.windows(&series.dts, |i| series.size[i] as f64)
            .into_iter()
            .map(|(start, bytes)| RateSample {
                time: self.time_base.as_f64() * start,
                value: bytes * 8.0 / 1024.0 / self.window_seconds,
            })
            .collect()
    }

    /// Packets per second per window.
    pub fn fps(&self, series: &TimingSeries) -> Vec<RateSample> {
        self.windows(&series.dts, |_| 1.0)
            .into_iter()
            .map(|(start, count)| RateSample {
                time: self.time_base.as_f64() * start,
                value: count / self.window_seconds,
            })
            .collect()
    }
}

/// Min / average / max of a rate series, for summaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateSummary {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

impl RateSummary {
    pub fn of(samples: &[RateSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let (mut min, mut max, mut sum) = (f64::MAX, f64::MIN, 0.0);
        for sample in samples {
            min = min.min(sample.value);
            max = max.max(sample.value);
            sum += sample.value;
        }
        Some(Self {
            min,
            avg: sum / samples.len() as f64,
            max,
        })
    }
}
