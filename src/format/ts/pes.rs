use super::types::{MAX_TIMESTAMP, STREAM_ID_AUDIO_BASE, STREAM_ID_PRIVATE_1, STREAM_ID_VIDEO_BASE};
use crate::av::CodecType;
use crate::error::{MuxError, Result};
use bytes::{BufMut, Bytes, BytesMut};

/// Size of the PES header up to and including `PES_header_data_length`.
pub const PES_FIXED_HEADER_SIZE: usize = 9;

/// Packetized Elementary Stream (PES) header.
///
/// Only the fields a live muxer sets are modelled; ESCR, ES rate, trick mode,
/// copy info, CRC and extension flags are always written as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PESHeader {
    /// Stream identifier indicating content type (video/audio/private)
    pub stream_id: u8,
    /// Value of `PES_packet_length`; zero means unbounded (video only)
    pub packet_length: u16,
    /// Data alignment indicator, set when the payload starts with an access unit
    pub data_alignment: bool,
    /// Presentation Time Stamp (33 bits)
    pub pts: Option<u64>,
    /// Decoding Time Stamp (33 bits)
    pub dts: Option<u64>,
}

impl PESHeader {
    /// Creates a new PES header with a specific stream ID.
    pub fn new(stream_id: u8) -> Self {
        Self {
            stream_id,
            packet_length: 0,
            data_alignment: true,
            pts: None,
            dts: None,
        }
    }

    /// Sets the Presentation Time Stamp in 90 kHz ticks.
    pub fn with_pts(mut self, pts: u64) -> Self {
        self.pts = Some(pts);
        self
    }

    /// Sets the Decoding Time Stamp in 90 kHz ticks.
    ///
    /// A DTS requires a PTS; without one the DTS is ignored when writing.
    pub fn with_dts(mut self, dts: u64) -> Self {
        self.dts = Some(dts);
        self
    }

    fn pts_dts_flags(&self) -> u8 {
        match (self.pts, self.dts) {
            (Some(_), Some(_)) => 0xc0,
            (Some(_), None) => 0x80,
            _ => 0x00,
        }
    }

    /// Value of `PES_header_data_length`.
    pub fn header_data_length(&self) -> usize {
        match self.pts_dts_flags() {
            0xc0 => 10,
            0x80 => 5,
            _ => 0,
        }
    }

    /// Total encoded header size.
    pub fn len(&self) -> usize {
        PES_FIXED_HEADER_SIZE + self.header_data_length()
    }

    /// Writes the header according to the MPEG-TS PES syntax.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_slice(&[0x00, 0x00, 0x01]);
        buf.put_u8(self.stream_id);
        buf.put_u16(self.packet_length);

        // '10' marker, no scrambling, priority, copyright or original flags
        let mut flags = 0x80u8;
        if self.data_alignment {
            flags |= 0x04;
        }
        buf.put_u8(flags);

        let pts_dts_flags = self.pts_dts_flags();
        buf.put_u8(pts_dts_flags);
        buf.put_u8(self.header_data_length() as u8);

        if let Some(pts) = self.pts {
            let prefix = if pts_dts_flags == 0xc0 { 0x30 } else { 0x20 };
            write_timestamp(buf, prefix, pts);
        }

        if let (Some(_), Some(dts)) = (self.pts, self.dts) {
            write_timestamp(buf, 0x10, dts);
        }
    }
}

/// A complete Packetized Elementary Stream (PES) packet.
#[derive(Debug, Clone)]
pub struct PESPacket {
    pub header: PESHeader,
    pub payload: Bytes,
}

impl PESPacket {
    /// Wraps one access unit payload.
    ///
    /// The DTS is only carried when it differs from the PTS. Fails when the
    /// packet is too long for `PES_packet_length` and the stream is not video
    /// (only video streams may use the unbounded length of zero).
    pub fn new(stream_id: u8, payload: Bytes, pts: u64, dts: Option<u64>) -> Result<Self> {
        let mut header = PESHeader::new(stream_id).with_pts(pts);
        if let Some(dts) = dts.filter(|&dts| dts != pts) {
            header = header.with_dts(dts);
        }

        let length = header.len() - 6 + payload.len();
        header.packet_length = match u16::try_from(length) {
            Ok(length) => length,
            Err(_) if is_video_stream_id(stream_id) => 0,
            Err(_) => {
                return Err(MuxError::Encoding(format!(
                    "PES packet of {} bytes exceeds PES_packet_length on stream 0x{:02x}",
                    length, stream_id
                )))
            }
        };

        Ok(Self { header, payload })
    }

    /// Serializes header and payload into one buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.len());
        self.header.write_to(&mut buf);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }

    /// Length of the complete PES packet in bytes.
    pub fn len(&self) -> usize {
        self.header.len() + self.payload.len()
    }
}

fn is_video_stream_id(stream_id: u8) -> bool {
    stream_id & 0xf0 == STREAM_ID_VIDEO_BASE
}

/// PES `stream_id` for the `index`-th stream of `codec`'s kind in a service.
pub fn stream_id_for(codec: CodecType, index: usize) -> u8 {
    match codec {
        CodecType::H264 | CodecType::H265 => STREAM_ID_VIDEO_BASE + (index as u8 & 0x0f),
        CodecType::AAC => STREAM_ID_AUDIO_BASE + (index as u8 & 0x1f),
        CodecType::OPUS => STREAM_ID_PRIVATE_1,
    }
}

/// Writes a PTS/DTS in the 5-byte layout: 4-bit prefix, then 3 + 15 + 15 bits
/// of the 33-bit value, each group closed by a marker bit.
fn write_timestamp(buf: &mut BytesMut, prefix: u8, ts: u64) {
    let ts = ts & MAX_TIMESTAMP;
    buf.put_u8(prefix | ((ts >> 29) & 0x0e) as u8 | 0x01);
    buf.put_u16((((ts >> 14) & 0xfffe) | 0x01) as u16);
    buf.put_u16((((ts << 1) & 0xfffe) | 0x01) as u16);
}

/// Reads back a timestamp written by [`write_timestamp`].
pub fn read_timestamp(data: &[u8]) -> Option<u64> {
    if data.len() < 5 {
        return None;
    }
    Some(
        ((data[0] as u64 & 0x0e) << 29)
            | ((data[1] as u64) << 22)
            | ((data[2] as u64 & 0xfe) << 14)
            | ((data[3] as u64) << 7)
            | ((data[4] as u64 & 0xfe) >> 1),
    )
}
