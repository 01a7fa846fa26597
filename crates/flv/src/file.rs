use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};
use bytes::{Buf, Bytes};
use tracing::{debug, warn};

use super::error::FlvError;
use super::header::FlvHeader;
use super::script::ScriptData;
use super::tag::{FLV_PREVIOUS_TAG_SIZE, FLV_TAG_HEADER_SIZE, FlvTag, MediaPacket};

/// An FLV file is a combination of a [`FlvHeader`] followed by the
/// `FLVFileBody` (which is just a series of [`FlvTag`]s)
#[derive(Debug, Clone, PartialEq)]
pub struct FlvFile {
    pub header: FlvHeader,
    pub tags: Vec<FlvTag>,
    /// Set when the file ends in the middle of a tag.
    pub truncated: bool,
}

impl FlvFile {
    /// Demux an FLV file from a reader.
    ///
    /// A tag cut short by the end of the buffer (an interrupted recording)
    /// stops the demuxing with a warning instead of failing the whole file.
    pub fn demux(reader: &mut Cursor<Bytes>) -> Result<Self, FlvError> {
        let header = FlvHeader::parse(reader).map_err(|_| FlvError::InvalidHeader)?;
        debug!("{header}");

        let mut tags = Vec::new();
        let mut truncated = false;
        while reader.has_remaining() {
            // We don't care about the previous tag size, its only really used for seeking
            // backwards.
            if reader.remaining() < FLV_PREVIOUS_TAG_SIZE {
                truncated = true;
                break;
            }
            reader.read_u32::<BigEndian>()?;

            if !reader.has_remaining() {
                break;
            }

            let offset = reader.position();
            if reader.remaining() < FLV_TAG_HEADER_SIZE {
                warn!(offset, "Truncated tag header at end of file");
                truncated = true;
                break;
            }
            match FlvTag::demux(reader) {
                Ok(tag) => tags.push(tag),
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    warn!(offset, "Truncated tag at end of file: {e}");
                    truncated = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        debug!(tags = tags.len(), truncated, "Demuxed FLV file");
        Ok(FlvFile {
            header,
            tags,
            truncated,
        })
    }

    /// The first `onMetaData` script tag that decodes.
    pub fn metadata(&self) -> Option<ScriptData> {
        self.tags
            .iter()
            .filter(|tag| tag.is_script_tag())
            .filter_map(|tag| match ScriptData::demux(&tag.data) {
                Ok(script) => Some(script),
                Err(e) => {
                    warn!(timestamp = tag.timestamp_ms, "Skipping undecodable script tag: {e}");
                    None
                }
            })
            .find(ScriptData::is_metadata)
    }

    /// Coded media packets in file order. Tags whose codec header cannot be
    /// parsed are skipped with a warning.
    pub fn media_packets(&self) -> Vec<MediaPacket> {
        self.tags
            .iter()
            .filter_map(|tag| match tag.media_packet() {
                Ok(packet) => packet,
                Err(e) => {
                    warn!(
                        timestamp = tag.timestamp_ms,
                        tag_type = u8::from(tag.tag_type),
                        "Skipping malformed tag: {e}"
                    );
                    None
                }
            })
            .collect()
    }
}
