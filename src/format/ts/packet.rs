use super::types::{TS_PACKET_SIZE, SYNC_BYTE};
use bytes::{Bytes, BytesMut};
use std::fmt;

/// A finished, immutable 188-byte transport stream packet.
#[derive(Clone, PartialEq, Eq)]
pub struct TsPacket(Bytes);

impl TsPacket {
    /// Freezes a fully built packet. The buffer must be exactly 188 bytes and
    /// start with the sync byte; the muxer never builds anything else.
    pub(crate) fn from_buf(buf: BytesMut) -> Self {
        debug_assert_eq!(buf.len(), TS_PACKET_SIZE);
        debug_assert_eq!(buf[0], SYNC_BYTE);
        Self(buf.freeze())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn pid(&self) -> u16 {
        (((self.0[1] & 0x1f) as u16) << 8) | self.0[2] as u16
    }

    pub fn payload_unit_start(&self) -> bool {
        self.0[1] & 0x40 != 0
    }

    pub fn has_adaptation_field(&self) -> bool {
        self.0[3] & 0x20 != 0
    }

    pub fn has_payload(&self) -> bool {
        self.0[3] & 0x10 != 0
    }

    pub fn continuity_counter(&self) -> u8 {
        self.0[3] & 0x0f
    }

    /// Payload bytes following the header and any adaptation field.
    pub fn payload(&self) -> &[u8] {
        if !self.has_payload() {
            return &[];
        }
        let offset = if self.has_adaptation_field() {
            5 + self.0[4] as usize
        } else {
            4
        };
        self.0.get(offset..).unwrap_or(&[])
    }
}

impl AsRef<[u8]> for TsPacket {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for TsPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TsPacket")
            .field("pid", &format_args!("0x{:04x}", self.pid()))
            .field("pusi", &self.payload_unit_start())
            .field("cc", &self.continuity_counter())
            .field("adaptation", &self.has_adaptation_field())
            .finish()
    }
}
