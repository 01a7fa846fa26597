use std::fmt::Display;
use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use bytes::Bytes;

pub const FLV_HEADER_SIZE: usize = 9;
const FLV_SIGNATURE: u32 = 0x464C56;

/// The 9 byte FLV file header.
#[derive(Debug, Clone, PartialEq)]
pub struct FlvHeader {
    /// The version of the FLV file format, usually 0x01
    pub version: u8,
    pub has_audio: bool,
    pub has_video: bool,
    /// Offset of the first tag from the start of the file, at least 9
    pub data_offset: u32,
}

impl Display for FlvHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FLV Header: version {}, audio {}, video {}, data offset {}",
            self.version, self.has_audio, self.has_video, self.data_offset
        )
    }
}

impl FlvHeader {
    pub fn new(has_audio: bool, has_video: bool) -> Self {
        Self {
            version: 1,
            has_audio,
            has_video,
            data_offset: FLV_HEADER_SIZE as u32,
        }
    }

    /// Parses the FLV header from a byte stream.
    ///
    /// The reader is left at the first byte after the header (skipping any
    /// extra header bytes announced by the data offset). On a bad signature
    /// the reader is moved back to where it started.
    pub fn parse(reader: &mut io::Cursor<Bytes>) -> io::Result<Self> {
        let start = reader.position();

        // Signature is a 3-byte string 'FLV'
        let signature = reader.read_u24::<BigEndian>()?;
        if signature != FLV_SIGNATURE {
            reader.set_position(start);
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid FLV signature",
            ));
        }

        let version = reader.read_u8()?;
        let flags = reader.read_u8()?;
        let has_audio = flags & 0b0000_0100 != 0;
        let has_video = flags & 0b0000_0001 != 0;

        let data_offset = reader.read_u32::<BigEndian>()?;
        if (data_offset as usize) < FLV_HEADER_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid FLV header size: {data_offset}"),
            ));
        }
        reader.set_position(start + data_offset as u64);

        Ok(FlvHeader {
            version,
            has_audio,
            has_video,
            data_offset,
        })
    }
}
