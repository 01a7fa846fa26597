use std::io::Cursor;

use bytes::Bytes;
use flv::{FlvFile, MediaKind};
use stream_timing::{ContainerInfo, PacketRecord, StreamKind, StreamMetadata, TimeBase};
use tracing::{debug, warn};

use super::DemuxedInput;
use crate::error::Result;

fn stream_kind(kind: MediaKind) -> StreamKind {
    match kind {
        MediaKind::Video => StreamKind::Video,
        MediaKind::Audio => StreamKind::Audio,
    }
}

/// FLV timestamps are milliseconds. Streams are numbered in order of their
/// first packet; a stream the header announces but that never carries a
/// packet is appended so it shows up as empty.
pub fn demux(data: Bytes) -> Result<DemuxedInput> {
    let size = data.len() as u64;
    let file = FlvFile::demux(&mut Cursor::new(data))?;
    if file.truncated {
        warn!("FLV file is truncated, analysing the complete tags only");
    }

    let time_base = TimeBase::MILLISECONDS;
    let duration_seconds = file.metadata().and_then(|m| m.duration_seconds());
    let declared_duration = duration_seconds.map(|s| time_base.seconds_to_ticks(s));

    let media = file.media_packets();
    let mut order: Vec<(MediaKind, String)> = Vec::new();
    let mut packets = Vec::with_capacity(media.len());
    for packet in &media {
        let index = match order.iter().position(|(kind, _)| *kind == packet.kind) {
            Some(index) => index,
            None => {
                order.push((packet.kind, packet.codec.clone()));
                order.len() - 1
            }
        };
        packets.push(PacketRecord::new(
            index,
            Some(packet.dts),
            Some(packet.pts),
            None,
            packet.size,
        ));
    }

    for (announced, kind) in [
        (file.header.has_video, MediaKind::Video),
        (file.header.has_audio, MediaKind::Audio),
    ] {
        if announced && !order.iter().any(|(k, _)| *k == kind) {
            debug!(?kind, "Stream announced in the header carries no packets");
            order.push((kind, String::new()));
        }
    }

    let streams = order
        .into_iter()
        .enumerate()
        .map(|(index, (kind, codec))| {
            let metadata = StreamMetadata::new(index, stream_kind(kind), time_base)
                .with_declared_duration(declared_duration)
                .with_declared_start_time(Some(0));
            if codec.is_empty() {
                metadata
            } else {
                metadata.with_codec(codec)
            }
        })
        .collect();

    let info = ContainerInfo {
        format: "flv".to_string(),
        duration_seconds,
        start_time_seconds: Some(0.0),
        size: Some(size),
        bit_rate: duration_seconds
            .filter(|d| *d > 0.0)
            .map(|d| (size as f64 * 8.0 / d) as u64),
    };

    debug!(packets = packets.len(), tags = file.tags.len(), "FLV demuxed");
    Ok(DemuxedInput {
        info,
        streams,
        packets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flv::writer::FlvBuilder;

    #[test]
    fn test_streams_and_packets() {
        let data = FlvBuilder::new(true, true)
            .metadata(&[("duration", 0.12)])
            .aac_sequence_header(0)
            .avc_sequence_header(0)
            .aac_frame(0, 10)
            .avc_frame(0, 40, true, 100)
            .aac_frame(23, 10)
            .avc_frame(40, 120, false, 30)
            .avc_frame(80, 80, false, 30)
            .avc_end_of_sequence(120)
            .build();
        let size = data.len() as u64;
        let input = demux(data).unwrap();

        assert_eq!(input.info.format, "flv");
        assert_eq!(input.info.size, Some(size));
        assert_eq!(input.info.duration_seconds, Some(0.12));

        // audio appears first
        assert_eq!(input.streams.len(), 2);
        assert_eq!(input.streams[0].kind, StreamKind::Audio);
        assert_eq!(input.streams[0].codec.as_deref(), Some("aac"));
        assert_eq!(input.streams[1].kind, StreamKind::Video);
        assert_eq!(input.streams[1].codec.as_deref(), Some("h264"));
        for stream in &input.streams {
            assert_eq!(stream.time_base, TimeBase::MILLISECONDS);
            assert_eq!(stream.declared_duration, Some(120));
            assert_eq!(stream.declared_start_time, Some(0));
        }

        assert_eq!(input.packets.len(), 5);
        let video: Vec<_> = input.packets.iter().filter(|p| p.stream_index == 1).collect();
        assert_eq!(video.len(), 3);
        assert_eq!(video[1].dts, Some(40));
        assert_eq!(video[1].pts, Some(120));
        assert_eq!(video[1].duration, None);
        assert_eq!(video[0].size, 100);
    }

    #[test]
    fn test_no_metadata_and_announced_empty_stream() {
        let data = FlvBuilder::new(true, true).avc_frame(0, 0, true, 10).build();
        let input = demux(data).unwrap();
        assert_eq!(input.info.duration_seconds, None);
        assert_eq!(input.info.bit_rate, None);
        assert_eq!(input.streams.len(), 2);
        assert_eq!(input.streams[0].kind, StreamKind::Video);
        assert_eq!(input.streams[1].kind, StreamKind::Audio);
        assert_eq!(input.streams[1].codec, None);
        assert!(input.streams.iter().all(|s| s.declared_duration.is_none()));
    }
}
