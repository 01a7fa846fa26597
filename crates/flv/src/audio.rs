use std::io::{self, Cursor, Read};

use byteorder::ReadBytesExt;

const SOUND_FORMAT_EX_HEADER: u8 = 9;
const SOUND_FORMAT_AAC: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioPacketKind {
    SequenceHeader,
    Frame,
    SequenceEnd,
    Unsupported,
}

/// Audio tag header: sound format, packet kind and header length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTagInfo {
    pub sound_format: u8,
    /// FourCC of an Enhanced RTMP audio tag.
    pub fourcc: Option<[u8; 4]>,
    pub kind: AudioPacketKind,
    pub header_size: usize,
}

impl AudioTagInfo {
    pub fn parse(data: &[u8]) -> io::Result<Self> {
        let mut reader = Cursor::new(data);
        let byte = reader.read_u8()?;
        let sound_format = byte >> 4;

        match sound_format {
            SOUND_FORMAT_AAC => {
                let kind = match reader.read_u8()? {
                    0 => AudioPacketKind::SequenceHeader,
                    _ => AudioPacketKind::Frame,
                };
                Ok(Self {
                    sound_format,
                    fourcc: None,
                    kind,
                    header_size: 2,
                })
            }
            SOUND_FORMAT_EX_HEADER => {
                let mut fourcc = [0u8; 4];
                reader.read_exact(&mut fourcc)?;
                let kind = match byte & 0b0000_1111 {
                    0 => AudioPacketKind::SequenceHeader,
                    1 => AudioPacketKind::Frame,
                    2 => AudioPacketKind::SequenceEnd,
                    _ => AudioPacketKind::Unsupported,
                };
                Ok(Self {
                    sound_format,
                    fourcc: Some(fourcc),
                    kind,
                    header_size: 5,
                })
            }
            _ => Ok(Self {
                sound_format,
                fourcc: None,
                kind: AudioPacketKind::Frame,
                header_size: 1,
            }),
        }
    }

    pub fn codec_name(&self) -> String {
        if let Some(fourcc) = &self.fourcc {
            return match fourcc {
                b"Opus" => "opus".to_string(),
                b"fLaC" => "flac".to_string(),
                b"ac-3" => "ac3".to_string(),
                b"ec-3" => "eac3".to_string(),
                b".mp3" => "mp3".to_string(),
                b"mp4a" => "aac".to_string(),
                _ => String::from_utf8_lossy(fourcc).into_owned(),
            };
        }
        match self.sound_format {
            0 => "pcm",
            1 => "adpcm",
            2 => "mp3",
            3 => "pcm_le",
            4..=6 => "nellymoser",
            7 => "pcm_alaw",
            8 => "pcm_mulaw",
            SOUND_FORMAT_AAC => "aac",
            11 => "speex",
            14 => "mp3",
            _ => "unknown",
        }
        .to_string()
    }
}
