use crate::error::MuxError;
use crate::format::ts::types::{
    STREAM_TYPE_AAC, STREAM_TYPE_H264, STREAM_TYPE_H265, STREAM_TYPE_PRIVATE_PES,
};
use std::fmt;
use std::str::FromStr;

/// Codecs the multiplexer knows how to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecType {
    H264,
    H265,
    AAC,
    OPUS,
}

impl CodecType {
    pub fn is_video(self) -> bool {
        matches!(self, CodecType::H264 | CodecType::H265)
    }

    /// MIME type as reported by platform encoders.
    pub fn mime_type(self) -> &'static str {
        match self {
            CodecType::H264 => "video/avc",
            CodecType::H265 => "video/hevc",
            CodecType::AAC => "audio/mp4a-latm",
            CodecType::OPUS => "audio/opus",
        }
    }

    /// `stream_type` announced in the PMT.
    pub fn stream_type(self) -> u8 {
        match self {
            CodecType::H264 => STREAM_TYPE_H264,
            CodecType::H265 => STREAM_TYPE_H265,
            CodecType::AAC => STREAM_TYPE_AAC,
            CodecType::OPUS => STREAM_TYPE_PRIVATE_PES,
        }
    }
}

impl fmt::Display for CodecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

impl FromStr for CodecType {
    type Err = MuxError;

    fn from_str(mime: &str) -> Result<Self, Self::Err> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "video/avc" | "video/h264" => Ok(CodecType::H264),
            "video/hevc" | "video/h265" => Ok(CodecType::H265),
            "audio/mp4a-latm" | "audio/aac" => Ok(CodecType::AAC),
            "audio/opus" => Ok(CodecType::OPUS),
            other => Err(MuxError::Configuration(format!(
                "unsupported codec {:?}",
                other
            ))),
        }
    }
}

/// Producer side of the muxer: encoder callbacks hand each finished access
/// unit to this, tagged with the PID returned at stream registration.
pub trait FrameSink: Send + Sync {
    fn write_frame(&self, frame: &AccessUnit, pid: u16) -> crate::Result<()>;
}

mod packet;
pub use packet::*;
