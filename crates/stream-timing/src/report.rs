//! # Diagnostics Report
//!
//! Read-only results of a container analysis, ready for a plotter (every
//! series is available in ticks and in seconds) or a human reader through
//! the [`fmt::Display`] implementations, which print each timestamp as
//! `name ticks (x.xxx ms)`.

use std::fmt;

use serde::Serialize;

use crate::accumulator::{TimingMarks, TimingSeries};
use crate::delta::delta_range;
use crate::duration::{DurationEstimate, DurationMethod, Verdict};
use crate::rate::{RateSample, RateSummary};
use crate::record::{ContainerInfo, StreamMetadata};
use crate::sync::{SyncBasis, SyncSample};
use crate::time_base::{FrameRate, TimeBase};

/// Seconds-converted views of a stream's series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SecondsSeries {
    pub dts: Vec<Option<f64>>,
    pub pts: Vec<Option<f64>>,
    pub duration: Vec<Option<f64>>,
    pub dts_delta: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamReport {
    pub metadata: StreamMetadata,
    pub marks: TimingMarks,
    pub estimate: DurationEstimate,
    pub verdict: Verdict,
    /// Raw series in ticks.
    pub series: TimingSeries,
    pub seconds: SecondsSeries,
    /// dts jitter in ticks.
    pub dts_delta: Vec<Option<i64>>,
    /// kbit/s per window.
    pub bitrate: Vec<RateSample>,
    /// Packets per second per window.
    pub fps: Vec<RateSample>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvSyncReport {
    pub base_index: usize,
    pub other_index: usize,
    pub basis: SyncBasis,
    pub samples: Vec<SyncSample>,
}

impl AvSyncReport {
    pub fn max_offset(&self) -> Option<f64> {
        self.samples.iter().map(|s| s.offset).reduce(f64::max)
    }

    pub fn mean_offset(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().map(|s| s.offset).sum::<f64>() / self.samples.len() as f64)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerReport {
    pub info: ContainerInfo,
    pub streams: Vec<StreamReport>,
    pub av_sync: Option<AvSyncReport>,
    /// Zero-size packets dropped during ingestion.
    pub flush_packets: usize,
}

impl ContainerReport {
    pub fn stream(&self, index: usize) -> Option<&StreamReport> {
        self.streams.iter().find(|s| s.metadata.index == index)
    }
}

/// `ticks (x.xxx ms)`, or `none`.
fn format_ts(ts: Option<i64>, time_base: TimeBase) -> String {
    match ts {
        Some(ticks) => format!("{ticks} ({:.3} ms)", time_base.to_millis(ticks)),
        None => "none".to_string(),
    }
}

/// `num/den (x.xxx fps)`, or `none`.
fn format_rate(rate: Option<FrameRate>) -> String {
    match rate {
        Some(rate) => format!("{rate} ({:.3} fps)", rate.as_f64()),
        None => "none".to_string(),
    }
}

impl fmt::Display for ContainerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_container(f)?;
        for stream in &self.streams {
            write!(f, "{stream}")?;
        }
        self.fmt_av_sync(f)
    }
}

impl ContainerReport {
    fn fmt_container(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |v: Option<String>| v.unwrap_or_else(|| "none".to_string());
        writeln!(f, "container")?;
        writeln!(f, "  format {}", self.info.format)?;
        writeln!(
            f,
            "  duration {}",
            opt(self.info.duration_seconds.map(|d| format!("{d:.3} s")))
        )?;
        writeln!(
            f,
            "  start_time {}",
            opt(self.info.start_time_seconds.map(|s| format!("{s:.3} s")))
        )?;
        writeln!(f, "  size {}", opt(self.info.size.map(|s| s.to_string())))?;
        writeln!(f, "  bit_rate {}", opt(self.info.bit_rate.map(|b| b.to_string())))?;
        writeln!(f, "  flush_packets {}", self.flush_packets)
    }

    fn fmt_av_sync(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(sync) = &self.av_sync else {
            return writeln!(f, "av_sync none    # needs one audio and one video stream");
        };
        writeln!(
            f,
            "av_sync stream[{}] -> stream[{}] ({:?})",
            sync.base_index, sync.other_index, sync.basis
        )?;
        writeln!(f, "  samples {}", sync.samples.len())?;
        if let (Some(mean), Some(max)) = (sync.mean_offset(), sync.max_offset()) {
            writeln!(f, "  mean_offset {:.3} ms", mean * 1000.0)?;
            writeln!(f, "  max_offset {:.3} ms", max * 1000.0)?;
        }
        Ok(())
    }
}

impl fmt::Display for StreamReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = &self.metadata;
        writeln!(f, "stream[{}] {}", meta.index, meta.kind)?;
        if let Some(codec) = &meta.codec {
            writeln!(f, "  codec {codec}")?;
        }
        writeln!(f, "  profile {}", meta.profile.as_deref().unwrap_or("none"))?;
        match meta.frames {
            Some(frames) => writeln!(f, "  frames {frames}")?,
            None => writeln!(f, "  frames none")?,
        }
        let guessed = meta.guessed_frame_rate();
        if meta.avg_frame_rate.is_some() || meta.r_frame_rate.is_some() {
            writeln!(f, "  avg_frame_rate {}", format_rate(meta.avg_frame_rate))?;
            writeln!(f, "  r_frame_rate {}", format_rate(meta.r_frame_rate))?;
            writeln!(f, "  guessed_frame_rate {}", format_rate(guessed))?;
        }
        writeln!(f, "  packets {}", self.marks.packet_count)?;
        writeln!(f, "  total_size {} bytes", self.marks.total_size)?;
        writeln!(f, "  time_base {}", meta.time_base)?;
        self.fmt_timestamp(f, meta.declared_start_time, "start_time", "")?;
        self.fmt_timestamp(f, meta.declared_duration, "duration", "")?;
        self.fmt_durations(f)?;
        self.fmt_marks(f)?;
        self.fmt_rates(f)?;
        writeln!(f, "  validation {}", self.verdict)
    }
}

impl StreamReport {
    fn fmt_timestamp(
        &self,
        f: &mut fmt::Formatter<'_>,
        ts: Option<i64>,
        name: &str,
        comment: &str,
    ) -> fmt::Result {
        let value = format_ts(ts, self.metadata.time_base);
        if comment.is_empty() {
            writeln!(f, "  {name} {value}")
        } else {
            writeln!(f, "  {name} {value}    # {comment}")
        }
    }

    fn fmt_durations(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for method in DurationMethod::ALL {
            let comment = match method {
                DurationMethod::PtsSpan => format!("= {} (the most confident)", method.formula()),
                _ => format!("= {}", method.formula()),
            };
            self.fmt_timestamp(f, self.estimate.estimate(method), method.name(), &comment)?;
        }
        for method in DurationMethod::ALL {
            let name = method.name().replacen("duration_", "duration_delta_", 1);
            let comment = format!("= {} - duration", method.name());
            self.fmt_timestamp(f, self.estimate.delta(method), &name, &comment)?;
        }
        Ok(())
    }

    fn fmt_marks(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.marks;
        self.fmt_timestamp(f, m.first_dts, "first_dts", "")?;
        self.fmt_timestamp(f, m.first_pts, "first_pts", "")?;
        self.fmt_timestamp(f, m.last_dts, "last_dts", "")?;
        self.fmt_timestamp(f, m.last_pts, "last_pts", "")?;
        self.fmt_timestamp(f, m.last_duration, "last_duration", "")?;
        self.fmt_timestamp(f, m.first_valid_packet_dts, "first_valid_packet_dts", "pts >= 0")?;
        self.fmt_timestamp(f, m.first_valid_packet_pts, "first_valid_packet_pts", "pts >= 0")?;
        self.fmt_timestamp(f, m.smallest_valid_pts, "smallest_valid_pts", "pts >= 0")?;
        self.fmt_timestamp(f, m.biggest_pts, "biggest_pts", "")?;
        self.fmt_timestamp(f, m.biggest_pts_packet_duration, "biggest_pts_packet_duration", "")?;
        if m.dts_regressions > 0 {
            writeln!(f, "  dts_regressions {}", m.dts_regressions)?;
        }
        Ok(())
    }

    fn fmt_rates(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match RateSummary::of(&self.bitrate) {
            Some(s) => writeln!(
                f,
                "  bitrate {:.2} kbps avg, {:.2} min, {:.2} max ({} windows)",
                s.avg,
                s.min,
                s.max,
                self.bitrate.len()
            )?,
            None => writeln!(f, "  bitrate none")?,
        }
        match RateSummary::of(&self.fps) {
            Some(s) => writeln!(
                f,
                "  fps {:.2} avg, {:.2} min, {:.2} max ({} windows)",
                s.avg,
                s.min,
                s.max,
                self.fps.len()
            )?,
            None => writeln!(f, "  fps none")?,
        }
        match delta_range(&self.dts_delta) {
            Some((min, max)) => {
                let tb = self.metadata.time_base;
                writeln!(
                    f,
                    "  dts_delta {} .. {}",
                    format_ts(Some(min), tb),
                    format_ts(Some(max), tb)
                )
            }
            None => writeln!(f, "  dts_delta none"),
        }
    }
}
