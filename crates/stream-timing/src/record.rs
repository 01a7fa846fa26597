use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time_base::{FrameRate, TimeBase};

/// Elementary stream kind as reported by the demuxer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Other,
}

impl From<&str> for StreamKind {
    fn from(value: &str) -> Self {
        match value {
            "video" => StreamKind::Video,
            "audio" => StreamKind::Audio,
            _ => StreamKind::Other,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Video => write!(f, "video"),
            StreamKind::Audio => write!(f, "audio"),
            StreamKind::Other => write!(f, "other"),
        }
    }
}

/// Container-level facts reported by the demuxer, informational only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerInfo {
    pub format: String,
    pub duration_seconds: Option<f64>,
    pub start_time_seconds: Option<f64>,
    pub size: Option<u64>,
    pub bit_rate: Option<u64>,
}

/// Per-stream metadata, consumed once before any packet is captured.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamMetadata {
    pub index: usize,
    pub kind: StreamKind,
    pub time_base: TimeBase,
    /// Duration the container declares for this stream, in ticks.
    /// `None` disables duration validation for the stream.
    pub declared_duration: Option<i64>,
    /// Start offset the container declares for this stream, in ticks.
    pub declared_start_time: Option<i64>,
    /// Codec name, informational only.
    pub codec: Option<String>,
    pub profile: Option<String>,
    /// Frame count the container declares, not a packet count.
    pub frames: Option<u64>,
    /// Average frame rate over the stream.
    pub avg_frame_rate: Option<FrameRate>,
    /// Lowest frame rate that represents every timestamp exactly.
    pub r_frame_rate: Option<FrameRate>,
}

impl StreamMetadata {
    pub fn new(index: usize, kind: StreamKind, time_base: TimeBase) -> Self {
        Self {
            index,
            kind,
            time_base,
            declared_duration: None,
            declared_start_time: None,
            codec: None,
            profile: None,
            frames: None,
            avg_frame_rate: None,
            r_frame_rate: None,
        }
    }

    pub fn with_declared_duration(mut self, duration: Option<i64>) -> Self {
        self.declared_duration = duration;
        self
    }

    pub fn with_declared_start_time(mut self, start_time: Option<i64>) -> Self {
        self.declared_start_time = start_time;
        self
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = Some(codec.into());
        self
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_frames(mut self, frames: Option<u64>) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_frame_rates(
        mut self,
        avg_frame_rate: Option<FrameRate>,
        r_frame_rate: Option<FrameRate>,
    ) -> Self {
        self.avg_frame_rate = avg_frame_rate;
        self.r_frame_rate = r_frame_rate;
        self
    }

    /// Best guess of the real frame rate.
    ///
    /// `r_frame_rate` is preferred, except when it is implausibly high
    /// (> 210 fps) while the average stays below 70 fps, which happens with
    /// timestamps on a fine clock.
    pub fn guessed_frame_rate(&self) -> Option<FrameRate> {
        match (self.r_frame_rate, self.avg_frame_rate) {
            (Some(r), Some(avg)) if avg.as_f64() < 70.0 && r.as_f64() > 210.0 => Some(avg),
            (Some(r), _) => Some(r),
            (None, avg) => avg,
        }
    }
}

/// One demultiplexed packet, reduced to its timing fields.
///
/// Created by the demuxer, captured exactly once by its stream's accumulator
/// in arrival order and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PacketRecord {
    pub stream_index: usize,
    pub dts: Option<i64>,
    /// May be negative while the decoder fills its reordering buffer.
    pub pts: Option<i64>,
    pub duration: Option<i64>,
    pub size: u64,
}

impl PacketRecord {
    pub fn new(
        stream_index: usize,
        dts: Option<i64>,
        pts: Option<i64>,
        duration: Option<i64>,
        size: u64,
    ) -> Self {
        Self {
            stream_index,
            dts,
            pts,
            duration,
            size,
        }
    }

    /// Zero-size packets only signal a decoder flush and carry no media.
    #[inline]
    pub fn is_flush(&self) -> bool {
        self.size == 0
    }

    /// A pts that is present and non-negative.
    #[inline]
    pub fn valid_pts(&self) -> Option<i64> {
        self.pts.filter(|pts| *pts >= 0)
    }
}
