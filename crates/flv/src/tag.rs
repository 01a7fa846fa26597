use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use bytes::Bytes;

use crate::audio::{AudioPacketKind, AudioTagInfo};
use crate::video::{VideoPacketKind, VideoTagInfo};

pub const FLV_TAG_HEADER_SIZE: usize = 11;
pub const FLV_PREVIOUS_TAG_SIZE: usize = 4;

/// FLV Tag Type
///
/// The 3 types that are supported are:
/// - Audio(8)
/// - Video(9)
/// - ScriptData(18)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlvTagType {
    Audio = 8,
    Video = 9,
    ScriptData = 18,
    Unknown(u8),
}

impl From<u8> for FlvTagType {
    fn from(value: u8) -> Self {
        match value {
            8 => FlvTagType::Audio,
            9 => FlvTagType::Video,
            18 => FlvTagType::ScriptData,
            _ => FlvTagType::Unknown(value),
        }
    }
}

impl From<FlvTagType> for u8 {
    fn from(value: FlvTagType) -> Self {
        match value {
            FlvTagType::Audio => 8,
            FlvTagType::Video => 9,
            FlvTagType::ScriptData => 18,
            FlvTagType::Unknown(value) => value,
        }
    }
}

/// An FLV tag with its body kept as raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct FlvTag {
    pub tag_type: FlvTagType,
    /// A timestamp in milliseconds
    pub timestamp_ms: u32,
    /// The stream id according to the spec is ALWAYS 0.
    pub stream_id: u32,
    pub data: Bytes,
}

/// Media kind of a demuxed FLV packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

/// Timing view of one audio or video tag that carries coded media.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPacket {
    pub kind: MediaKind,
    /// Decode timestamp in milliseconds (the tag timestamp).
    pub dts: i64,
    /// `dts + composition time` in milliseconds.
    pub pts: i64,
    /// Payload size after the codec header.
    pub size: u64,
    pub keyframe: bool,
    pub codec: String,
}

impl FlvTag {
    /// Demux a FLV tag from the given reader.
    ///
    /// The reader will be advanced to the end of the tag. The body is a
    /// zero-copy slice of the underlying buffer.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> io::Result<Self> {
        let tag_type = FlvTagType::from(reader.read_u8()?);

        let data_size = reader.read_u24::<BigEndian>()? as usize;
        // The timestamp bit is weird. Its 24bits but then there is an extended 8 bit
        // number to create a 32bit number.
        let timestamp_ms = reader.read_u24::<BigEndian>()? | ((reader.read_u8()? as u32) << 24);
        let stream_id = reader.read_u24::<BigEndian>()?;

        let start = reader.position() as usize;
        let end = start + data_size;
        if end > reader.get_ref().len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("Tag body of {data_size} bytes exceeds the buffer"),
            ));
        }
        let data = reader.get_ref().slice(start..end);
        reader.set_position(end as u64);

        Ok(FlvTag {
            tag_type,
            timestamp_ms,
            stream_id,
            data,
        })
    }

    /// Size of the tag on disk, header included, previous tag size excluded.
    pub fn size(&self) -> usize {
        FLV_TAG_HEADER_SIZE + self.data.len()
    }

    pub fn is_script_tag(&self) -> bool {
        self.tag_type == FlvTagType::ScriptData
    }

    /// The coded media packet carried by this tag, if any.
    ///
    /// Sequence headers, end-of-sequence markers, command frames and script
    /// tags configure the decoder and do not produce a packet.
    pub fn media_packet(&self) -> io::Result<Option<MediaPacket>> {
        let dts = self.timestamp_ms as i64;
        match self.tag_type {
            FlvTagType::Video => {
                let info = VideoTagInfo::parse(&self.data)?;
                if info.kind != VideoPacketKind::Frame {
                    return Ok(None);
                }
                Ok(Some(MediaPacket {
                    kind: MediaKind::Video,
                    dts,
                    pts: dts + info.composition_time as i64,
                    size: self.data.len().saturating_sub(info.header_size) as u64,
                    keyframe: info.is_keyframe(),
                    codec: info.codec.to_string(),
                }))
            }
            FlvTagType::Audio => {
                let info = AudioTagInfo::parse(&self.data)?;
                if info.kind != AudioPacketKind::Frame {
                    return Ok(None);
                }
                Ok(Some(MediaPacket {
                    kind: MediaKind::Audio,
                    dts,
                    pts: dts,
                    size: self.data.len().saturating_sub(info.header_size) as u64,
                    keyframe: true,
                    codec: info.codec_name(),
                }))
            }
            _ => Ok(None),
        }
    }
}
