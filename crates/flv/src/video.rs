//! Video tag header parsing, reduced to what timing analysis needs: the
//! packet kind, the composition time offset and the header length.
//!
//! Both the legacy layout (`FrameType | CodecID`, then `AVCPacketType` and a
//! signed 24 bit composition time for AVC/HEVC) and the Enhanced RTMP layout
//! (`IsExHeader | FrameType | PacketType`, then a FourCC) are handled.

use std::fmt;
use std::io::{self, Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};

const CODEC_ID_AVC: u8 = 7;
const CODEC_ID_LEGACY_HEVC: u8 = 12;
const FRAME_TYPE_KEY: u8 = 1;
const FRAME_TYPE_COMMAND: u8 = 5;

/// Enhanced RTMP video packet types.
mod enhanced {
    pub const SEQUENCE_START: u8 = 0;
    pub const CODED_FRAMES: u8 = 1;
    pub const SEQUENCE_END: u8 = 2;
    pub const CODED_FRAMES_X: u8 = 3;
    pub const METADATA: u8 = 4;
    pub const MPEG2_SEQUENCE_START: u8 = 5;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoPacketKind {
    SequenceHeader,
    Frame,
    SequenceEnd,
    Metadata,
    Command,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    Legacy(u8),
    FourCC([u8; 4]),
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoCodec::Legacy(2) => write!(f, "h263"),
            VideoCodec::Legacy(3) => write!(f, "screen"),
            VideoCodec::Legacy(4) => write!(f, "vp6"),
            VideoCodec::Legacy(5) => write!(f, "vp6a"),
            VideoCodec::Legacy(6) => write!(f, "screen2"),
            VideoCodec::Legacy(CODEC_ID_AVC) => write!(f, "h264"),
            VideoCodec::Legacy(CODEC_ID_LEGACY_HEVC) => write!(f, "hevc"),
            VideoCodec::Legacy(id) => write!(f, "codec-{id}"),
            VideoCodec::FourCC(fourcc) => match fourcc {
                b"avc1" => write!(f, "h264"),
                b"hvc1" => write!(f, "hevc"),
                b"av01" => write!(f, "av1"),
                b"vp09" => write!(f, "vp9"),
                _ => write!(f, "{}", String::from_utf8_lossy(fourcc)),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoTagInfo {
    pub frame_type: u8,
    pub codec: VideoCodec,
    pub kind: VideoPacketKind,
    /// Composition time offset in milliseconds (`pts - dts`).
    pub composition_time: i32,
    /// Number of header bytes before the coded payload.
    pub header_size: usize,
}

impl VideoTagInfo {
    pub fn parse(data: &[u8]) -> io::Result<Self> {
        let mut reader = Cursor::new(data);
        let byte = reader.read_u8()?;
        let frame_type = (byte >> 4) & 0b0111;

        if byte & 0b1000_0000 != 0 {
            return Self::parse_enhanced(&mut reader, frame_type, byte & 0b0000_1111);
        }

        let codec_id = byte & 0b0000_1111;
        let codec = VideoCodec::Legacy(codec_id);
        if frame_type == FRAME_TYPE_COMMAND {
            return Ok(Self::header_only(frame_type, codec, VideoPacketKind::Command, 1));
        }

        if codec_id == CODEC_ID_AVC || codec_id == CODEC_ID_LEGACY_HEVC {
            let packet_type = reader.read_u8()?;
            let composition_time = reader.read_i24::<BigEndian>()?;
            let kind = match packet_type {
                0 => VideoPacketKind::SequenceHeader,
                1 => VideoPacketKind::Frame,
                2 => VideoPacketKind::SequenceEnd,
                _ => VideoPacketKind::Unsupported,
            };
            return Ok(Self {
                frame_type,
                codec,
                kind,
                composition_time,
                header_size: 5,
            });
        }

        Ok(Self::header_only(frame_type, codec, VideoPacketKind::Frame, 1))
    }

    fn parse_enhanced(
        reader: &mut Cursor<&[u8]>,
        frame_type: u8,
        packet_type: u8,
    ) -> io::Result<Self> {
        let mut fourcc = [0u8; 4];
        reader.read_exact(&mut fourcc)?;
        let codec = VideoCodec::FourCC(fourcc);

        if frame_type == FRAME_TYPE_COMMAND {
            return Ok(Self::header_only(frame_type, codec, VideoPacketKind::Command, 5));
        }

        let kind = match packet_type {
            enhanced::SEQUENCE_START | enhanced::MPEG2_SEQUENCE_START => {
                VideoPacketKind::SequenceHeader
            }
            enhanced::CODED_FRAMES | enhanced::CODED_FRAMES_X => VideoPacketKind::Frame,
            enhanced::SEQUENCE_END => VideoPacketKind::SequenceEnd,
            enhanced::METADATA => VideoPacketKind::Metadata,
            _ => VideoPacketKind::Unsupported,
        };

        // Only AVC and HEVC coded frames carry a composition time.
        let has_composition_time = packet_type == enhanced::CODED_FRAMES
            && (&fourcc == b"avc1" || &fourcc == b"hvc1");
        if has_composition_time {
            let composition_time = reader.read_i24::<BigEndian>()?;
            return Ok(Self {
                frame_type,
                codec,
                kind,
                composition_time,
                header_size: 8,
            });
        }

        Ok(Self::header_only(frame_type, codec, kind, 5))
    }

    fn header_only(
        frame_type: u8,
        codec: VideoCodec,
        kind: VideoPacketKind,
        header_size: usize,
    ) -> Self {
        Self {
            frame_type,
            codec,
            kind,
            composition_time: 0,
            header_size,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        self.frame_type == FRAME_TYPE_KEY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_avc() {
        let info = VideoTagInfo::parse(&[0x17, 1, 0x00, 0x00, 0x28, 0x65]).unwrap();
        assert_eq!(info.kind, VideoPacketKind::Frame);
        assert_eq!(info.composition_time, 40);
        assert_eq!(info.header_size, 5);
        assert!(info.is_keyframe());
        assert_eq!(info.codec.to_string(), "h264");
    }

    #[test]
    fn test_legacy_non_avc_codec() {
        let info = VideoTagInfo::parse(&[0x24, 0xAA, 0xBB]).unwrap();
        assert_eq!(info.kind, VideoPacketKind::Frame);
        assert_eq!(info.composition_time, 0);
        assert_eq!(info.header_size, 1);
        assert_eq!(info.codec.to_string(), "vp6");
    }

    #[test]
    fn test_command_frame() {
        let info = VideoTagInfo::parse(&[0x57, 0x00]).unwrap();
        assert_eq!(info.kind, VideoPacketKind::Command);
    }

    #[test]
    fn test_enhanced_hevc_coded_frames() {
        // IsExHeader | keyframe | CodedFrames, "hvc1", cts = -2
        let info =
            VideoTagInfo::parse(&[0x91, b'h', b'v', b'c', b'1', 0xFF, 0xFF, 0xFE, 0x01]).unwrap();
        assert_eq!(info.kind, VideoPacketKind::Frame);
        assert_eq!(info.composition_time, -2);
        assert_eq!(info.header_size, 8);
        assert_eq!(info.codec.to_string(), "hevc");
    }

    #[test]
    fn test_enhanced_coded_frames_x_and_av1() {
        let info = VideoTagInfo::parse(&[0xA3, b'h', b'v', b'c', b'1', 0x01]).unwrap();
        assert_eq!(info.kind, VideoPacketKind::Frame);
        assert_eq!(info.composition_time, 0);
        assert_eq!(info.header_size, 5);

        let info = VideoTagInfo::parse(&[0x91, b'a', b'v', b'0', b'1', 0x0A]).unwrap();
        assert_eq!(info.kind, VideoPacketKind::Frame);
        assert_eq!(info.header_size, 5);
        assert_eq!(info.codec.to_string(), "av1");
    }

    #[test]
    fn test_enhanced_sequence_start() {
        let info = VideoTagInfo::parse(&[0x90, b'a', b'v', b'0', b'1', 0x81]).unwrap();
        assert_eq!(info.kind, VideoPacketKind::SequenceHeader);
    }

    #[test]
    fn test_truncated_header() {
        assert!(VideoTagInfo::parse(&[0x17, 1]).is_err());
        assert!(VideoTagInfo::parse(&[]).is_err());
    }
}
