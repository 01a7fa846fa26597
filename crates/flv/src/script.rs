//! # FLV Script Module
//!
//! Script tags carry an AMF0 encoded name followed by AMF0 values. The only
//! one that matters for timing is `onMetaData`, whose `duration` property
//! (seconds) is the duration the muxer declared for the whole file.
//!
//! Only the AMF0 subset muxers actually emit in script tags is decoded:
//! numbers, booleans, strings, objects, ECMA and strict arrays, dates, null
//! and undefined.
//!
//! ## Specifications
//!
//! - [Action Message Format -- AMF 0](https://www.adobe.com/content/dam/acom/en/devnet/pdf/amf0-file-format-specification.pdf)
//!
//! ## License
//!
//! MIT License
//!
//! ## Authors
//!
//! - hua0512

use std::{fmt, io};

use byteorder::{BigEndian, ReadBytesExt};
use bytes::Bytes;
use tracing::warn;

use crate::error::FlvError;

mod marker {
    pub const NUMBER: u8 = 0x00;
    pub const BOOLEAN: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const OBJECT: u8 = 0x03;
    pub const NULL: u8 = 0x05;
    pub const UNDEFINED: u8 = 0x06;
    pub const ECMA_ARRAY: u8 = 0x08;
    pub const OBJECT_END: u8 = 0x09;
    pub const STRICT_ARRAY: u8 = 0x0a;
    pub const DATE: u8 = 0x0b;
    pub const LONG_STRING: u8 = 0x0c;
}

/// A decoded AMF0 value.
#[derive(Debug, Clone, PartialEq)]
pub enum Amf0Value {
    Number(f64),
    Boolean(bool),
    String(String),
    /// Objects and ECMA arrays, in wire order.
    Object(Vec<(String, Amf0Value)>),
    StrictArray(Vec<Amf0Value>),
    /// Milliseconds since the epoch.
    Date(f64),
    Null,
    Undefined,
}

impl Amf0Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Amf0Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Amf0Value> {
        match self {
            Amf0Value::Object(properties) => properties
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

/// Deepest object/array nesting accepted in a script tag.
const MAX_NESTING: usize = 64;

struct Amf0Decoder<'a> {
    cursor: io::Cursor<&'a [u8]>,
    depth: usize,
}

impl<'a> Amf0Decoder<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            cursor: io::Cursor::new(buf),
            depth: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.cursor.position() as usize >= self.cursor.get_ref().len()
    }

    fn decode(&mut self) -> Result<Amf0Value, FlvError> {
        if self.depth >= MAX_NESTING {
            return Err(FlvError::Amf0(format!(
                "values nested deeper than {MAX_NESTING} levels"
            )));
        }
        self.depth += 1;
        let value = self.decode_value();
        self.depth -= 1;
        value
    }

    fn decode_value(&mut self) -> Result<Amf0Value, FlvError> {
        let value = match self.cursor.read_u8()? {
            marker::NUMBER => Amf0Value::Number(self.cursor.read_f64::<BigEndian>()?),
            marker::BOOLEAN => Amf0Value::Boolean(self.cursor.read_u8()? != 0),
            marker::STRING => {
                let len = self.cursor.read_u16::<BigEndian>()? as usize;
                Amf0Value::String(self.read_utf8(len)?)
            }
            marker::LONG_STRING => {
                let len = self.cursor.read_u32::<BigEndian>()? as usize;
                Amf0Value::String(self.read_utf8(len)?)
            }
            marker::OBJECT => Amf0Value::Object(self.read_properties()?),
            marker::ECMA_ARRAY => {
                // The count is advisory; the end marker terminates the array.
                let _count = self.cursor.read_u32::<BigEndian>()?;
                Amf0Value::Object(self.read_properties()?)
            }
            marker::STRICT_ARRAY => {
                let count = self.cursor.read_u32::<BigEndian>()?;
                let mut values = Vec::new();
                for _ in 0..count {
                    values.push(self.decode()?);
                }
                Amf0Value::StrictArray(values)
            }
            marker::DATE => {
                let millis = self.cursor.read_f64::<BigEndian>()?;
                let _timezone = self.cursor.read_i16::<BigEndian>()?;
                Amf0Value::Date(millis)
            }
            marker::NULL => Amf0Value::Null,
            marker::UNDEFINED => Amf0Value::Undefined,
            other => return Err(FlvError::Amf0(format!("unsupported marker 0x{other:02x}"))),
        };
        Ok(value)
    }

    fn read_utf8(&mut self, len: usize) -> Result<String, FlvError> {
        let start = self.cursor.position() as usize;
        let end = start + len;
        let bytes = self
            .cursor
            .get_ref()
            .get(start..end)
            .ok_or(FlvError::IncompleteData)?;
        self.cursor.set_position(end as u64);
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn read_properties(&mut self) -> Result<Vec<(String, Amf0Value)>, FlvError> {
        let mut properties = Vec::new();
        loop {
            let len = self.cursor.read_u16::<BigEndian>()? as usize;
            if len == 0 {
                // Empty key followed by the object end marker.
                let end = self.cursor.read_u8()?;
                if end == marker::OBJECT_END {
                    return Ok(properties);
                }
                return Err(FlvError::Amf0(format!(
                    "expected object end marker, got 0x{end:02x}"
                )));
            }
            let key = self.read_utf8(len)?;
            let value = self.decode()?;
            properties.push((key, value));
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptData {
    /// The name of the script data
    pub name: String,
    /// The data of the script data
    pub data: Vec<Amf0Value>,
}

impl ScriptData {
    /// Decodes a script tag body. Values decoded before a malformed one are
    /// kept; the error is only returned when nothing could be decoded.
    pub fn demux(body: &Bytes) -> Result<Self, FlvError> {
        let mut decoder = Amf0Decoder::new(body);

        let name = match decoder.decode()? {
            Amf0Value::String(name) => name,
            other => {
                return Err(FlvError::Amf0(format!(
                    "invalid script data name, expected String but got {other:?}"
                )));
            }
        };

        let mut data = Vec::new();
        while !decoder.is_empty() {
            match decoder.decode() {
                Ok(value) => data.push(value),
                Err(e) if data.is_empty() => return Err(e),
                Err(e) => {
                    warn!("Partial script data parsed with error: {e}");
                    break;
                }
            }
        }

        Ok(Self { name, data })
    }

    pub fn is_metadata(&self) -> bool {
        self.name == "onMetaData"
    }

    /// Numeric property of the first object value, e.g. `duration`.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.data
            .iter()
            .find_map(|value| value.get(key))
            .and_then(Amf0Value::as_number)
    }

    /// Declared duration in seconds, ignoring non-finite and negative values.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.number("duration").filter(|d| d.is_finite() && *d >= 0.0)
    }
}

impl fmt::Display for ScriptData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} values", self.name, self.data.len())
    }
}

/// Encodes `onMetaData` as an ECMA array of numeric properties.
pub fn encode_metadata(properties: &[(&str, f64)]) -> Vec<u8> {
    let mut buffer = Vec::new();
    write_string(&mut buffer, "onMetaData");
    buffer.push(marker::ECMA_ARRAY);
    buffer.extend_from_slice(&(properties.len() as u32).to_be_bytes());
    for (key, value) in properties {
        buffer.extend_from_slice(&(key.len() as u16).to_be_bytes());
        buffer.extend_from_slice(key.as_bytes());
        buffer.push(marker::NUMBER);
        buffer.extend_from_slice(&value.to_be_bytes());
    }
    buffer.extend_from_slice(&[0, 0, marker::OBJECT_END]);
    buffer
}

fn write_string(buffer: &mut Vec<u8>, value: &str) {
    buffer.push(marker::STRING);
    buffer.extend_from_slice(&(value.len() as u16).to_be_bytes());
    buffer.extend_from_slice(value.as_bytes());
}
