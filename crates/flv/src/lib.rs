//! # FLV
//!
//! Reader for the FLV container that exposes what timing diagnostics need:
//! the file header, raw tags, the `onMetaData` script object and a
//! per-tag view of coded media packets (dts, composition-adjusted pts,
//! payload size).
//!
//! Legacy AVC/HEVC tags and Enhanced RTMP (FourCC) audio and video tags are
//! understood. Codec configuration records are not parsed.
//!
//! ## License
//!
//! MIT License
//!
//! ## Authors
//!
//! - hua0512
//!

pub mod audio;
pub mod error;
pub mod file;
pub mod header;
pub mod script;
pub mod tag;
pub mod video;
pub mod writer;

pub use error::FlvError;
pub use file::FlvFile;
pub use header::FlvHeader;
pub use script::{Amf0Value, ScriptData};
pub use tag::{FlvTag, FlvTagType, MediaKind, MediaPacket};
