//! Minimal FLV muxer for producing synthetic files: header, script, AVC and
//! AAC tags with correct previous-tag-size trailers.

use bytes::{BufMut, Bytes, BytesMut};

use crate::header::FlvHeader;
use crate::script::encode_metadata;
use crate::tag::{FLV_TAG_HEADER_SIZE, FlvTagType};

#[derive(Debug, Default)]
pub struct FlvBuilder {
    buffer: BytesMut,
}

impl FlvBuilder {
    pub fn new(has_audio: bool, has_video: bool) -> Self {
        let header = FlvHeader::new(has_audio, has_video);
        let mut buffer = BytesMut::new();
        buffer.put_slice(b"FLV");
        buffer.put_u8(header.version);
        buffer.put_u8(((header.has_audio as u8) << 2) | header.has_video as u8);
        buffer.put_u32(header.data_offset);
        // PreviousTagSize0
        buffer.put_u32(0);
        Self { buffer }
    }

    /// Appends a tag with the given body, followed by its previous tag size.
    pub fn tag(mut self, tag_type: FlvTagType, timestamp_ms: u32, body: &[u8]) -> Self {
        self.buffer.put_u8(u8::from(tag_type));
        self.buffer.put_uint(body.len() as u64, 3);
        self.buffer.put_uint(u64::from(timestamp_ms & 0x00FF_FFFF), 3);
        // TimestampExtended
        self.buffer.put_u8((timestamp_ms >> 24) as u8);
        // StreamID
        self.buffer.put_uint(0, 3);
        self.buffer.put_slice(body);
        self.buffer.put_u32((FLV_TAG_HEADER_SIZE + body.len()) as u32);
        self
    }

    /// `onMetaData` with numeric properties.
    pub fn metadata(self, properties: &[(&str, f64)]) -> Self {
        self.tag(FlvTagType::ScriptData, 0, &encode_metadata(properties))
    }

    pub fn avc_sequence_header(self, timestamp_ms: u32) -> Self {
        self.tag(
            FlvTagType::Video,
            timestamp_ms,
            &[0x17, 0x00, 0, 0, 0, 0x01, 0x64, 0x00, 0x1F, 0xFF],
        )
    }

    /// AVC NALU tag with `payload_len` filler bytes, `pts` in milliseconds.
    pub fn avc_frame(self, dts: u32, pts: i64, keyframe: bool, payload_len: usize) -> Self {
        let frame_type: u8 = if keyframe { 0x10 } else { 0x20 };
        let composition_time = (pts - dts as i64) as i32;
        let mut body = BytesMut::with_capacity(5 + payload_len);
        body.put_u8(frame_type | 0x07);
        body.put_u8(0x01);
        // signed 24-bit, two's complement
        body.put_uint(u64::from(composition_time as u32 & 0x00FF_FFFF), 3);
        body.put_bytes(0xAB, payload_len);
        self.tag(FlvTagType::Video, dts, &body)
    }

    pub fn avc_end_of_sequence(self, timestamp_ms: u32) -> Self {
        self.tag(FlvTagType::Video, timestamp_ms, &[0x17, 0x02, 0, 0, 0])
    }

    pub fn aac_sequence_header(self, timestamp_ms: u32) -> Self {
        self.tag(FlvTagType::Audio, timestamp_ms, &[0xAF, 0x00, 0x12, 0x10])
    }

    pub fn aac_frame(self, timestamp_ms: u32, payload_len: usize) -> Self {
        let mut body = vec![0xAF, 0x01];
        body.resize(body.len() + payload_len, 0xCD);
        self.tag(FlvTagType::Audio, timestamp_ms, &body)
    }

    pub fn build(self) -> Bytes {
        self.buffer.freeze()
    }
}
