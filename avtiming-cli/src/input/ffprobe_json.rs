//! Reader for `ffprobe -show_format -show_streams -show_packets -of json`.

use serde::Deserialize;
use stream_timing::{
    ContainerInfo, FrameRate, PacketRecord, StreamKind, StreamMetadata, TimeBase,
};
use tracing::{debug, warn};

use super::DemuxedInput;
use crate::error::{CliError, Result};

/// ffprobe prints some integers as JSON strings (`size`, `bit_rate`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Numeric {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Numeric::Int(v) => Some(*v),
            Numeric::Float(v) => Some(*v as i64),
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Numeric::Int(v) => Some(*v as f64),
            Numeric::Float(v) => Some(*v),
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    packets: Vec<ProbePacket>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: usize,
    codec_type: Option<String>,
    codec_name: Option<String>,
    time_base: String,
    start_pts: Option<i64>,
    duration_ts: Option<i64>,
    profile: Option<String>,
    nb_frames: Option<Numeric>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

/// `0/0` marks an unknown rate.
fn frame_rate(rate: Option<&str>) -> Option<FrameRate> {
    rate?.parse().ok()
}

#[derive(Debug, Deserialize)]
struct ProbePacket {
    stream_index: usize,
    pts: Option<i64>,
    dts: Option<i64>,
    duration: Option<i64>,
    size: Option<Numeric>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<Numeric>,
    start_time: Option<Numeric>,
    size: Option<Numeric>,
    bit_rate: Option<Numeric>,
}

pub fn demux(data: &[u8]) -> Result<DemuxedInput> {
    let probe: ProbeOutput = serde_json::from_slice(data)?;
    if probe.streams.is_empty() {
        return Err(CliError::InvalidInput(
            "ffprobe output has no streams, run it with -show_streams".to_string(),
        ));
    }

    let mut streams = Vec::with_capacity(probe.streams.len());
    for stream in &probe.streams {
        let time_base: TimeBase = stream.time_base.parse()?;
        let kind = stream
            .codec_type
            .as_deref()
            .map(StreamKind::from)
            .unwrap_or(StreamKind::Other);
        let mut metadata = StreamMetadata::new(stream.index, kind, time_base)
            .with_declared_duration(stream.duration_ts)
            .with_declared_start_time(stream.start_pts)
            .with_profile(stream.profile.clone())
            .with_frames(
                stream
                    .nb_frames
                    .as_ref()
                    .and_then(Numeric::as_i64)
                    .and_then(|n| u64::try_from(n).ok()),
            )
            .with_frame_rates(
                frame_rate(stream.avg_frame_rate.as_deref()),
                frame_rate(stream.r_frame_rate.as_deref()),
            );
        if let Some(codec) = &stream.codec_name {
            metadata = metadata.with_codec(codec.clone());
        }
        streams.push(metadata);
    }

    let mut dropped = 0usize;
    let packets: Vec<PacketRecord> = probe
        .packets
        .iter()
        .filter(|packet| {
            let known = streams.iter().any(|s| s.index == packet.stream_index);
            if !known {
                dropped += 1;
            }
            known
        })
        .map(|packet| {
            let size = packet
                .size
                .as_ref()
                .and_then(Numeric::as_i64)
                .map_or(0, |s| s.max(0) as u64);
            PacketRecord::new(packet.stream_index, packet.dts, packet.pts, packet.duration, size)
        })
        .collect();
    if dropped > 0 {
        warn!(dropped, "Dropped packets referring to streams missing from the stream list");
    }
    if packets.is_empty() {
        warn!("ffprobe output has no packets, run it with -show_packets");
    }

    let info = match &probe.format {
        Some(format) => ContainerInfo {
            format: format.format_name.clone().unwrap_or_default(),
            duration_seconds: format.duration.as_ref().and_then(Numeric::as_f64),
            start_time_seconds: format.start_time.as_ref().and_then(Numeric::as_f64),
            size: format
                .size
                .as_ref()
                .and_then(Numeric::as_i64)
                .map(|s| s.max(0) as u64),
            bit_rate: format
                .bit_rate
                .as_ref()
                .and_then(Numeric::as_i64)
                .map(|b| b.max(0) as u64),
        },
        None => ContainerInfo {
            format: "ffprobe".to_string(),
            ..ContainerInfo::default()
        },
    };

    debug!(streams = streams.len(), packets = packets.len(), "ffprobe output parsed");
    Ok(DemuxedInput {
        info,
        streams,
        packets,
    })
}
