use crate::format::ts::types::micros_to_pts;
use bytes::Bytes;

/// One encoded frame (video picture or audio block).
///
/// Timestamps are in 90 kHz ticks. Use [`AccessUnit::from_micros`] for
/// encoders that report microseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessUnit {
    pub data: Bytes,
    pub pts: u64,
    pub dts: Option<u64>,
    pub is_key: bool,
}

impl AccessUnit {
    pub fn new(data: impl Into<Bytes>, pts: u64) -> Self {
        Self {
            data: data.into(),
            pts,
            dts: None,
            is_key: false,
        }
    }

    /// Builds an access unit from microsecond timestamps, wrapping them onto
    /// the 33-bit 90 kHz clock.
    pub fn from_micros(data: impl Into<Bytes>, pts_us: u64, dts_us: Option<u64>) -> Self {
        Self {
            data: data.into(),
            pts: micros_to_pts(pts_us),
            dts: dts_us.map(micros_to_pts),
            is_key: false,
        }
    }

    pub fn with_dts(mut self, dts: u64) -> Self {
        self.dts = Some(dts);
        self
    }

    pub fn with_key_flag(mut self, is_key: bool) -> Self {
        self.is_key = is_key;
        self
    }

    /// Decode timestamp, falling back to the presentation timestamp.
    pub fn decode_time(&self) -> u64 {
        self.dts.unwrap_or(self.pts)
    }
}
