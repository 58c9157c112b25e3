use bytes::{BufMut, BytesMut};
use std::time::Duration;

// Stream IDs
pub const STREAM_ID_VIDEO_BASE: u8 = 0xe0;
pub const STREAM_ID_AUDIO_BASE: u8 = 0xc0;
pub const STREAM_ID_PRIVATE_1: u8 = 0xbd;

// PIDs
pub const PID_PAT: u16 = 0x0000;
pub const PID_CAT: u16 = 0x0001;
pub const PID_SDT: u16 = 0x0011;
pub const PID_NULL: u16 = 0x1fff;
pub const PID_MIN_ASSIGNABLE: u16 = 0x0010;
pub const PID_MAX_ASSIGNABLE: u16 = 0x1ffe;

// Table IDs
pub const TABLE_ID_PAT: u8 = 0x00;
pub const TABLE_ID_PMT: u8 = 0x02;
pub const TABLE_ID_SDT: u8 = 0x42;

// Elementary Stream Types
pub const STREAM_TYPE_H264: u8 = 0x1b;
pub const STREAM_TYPE_H265: u8 = 0x24;
pub const STREAM_TYPE_AAC: u8 = 0x0f;
pub const STREAM_TYPE_PRIVATE_PES: u8 = 0x06;

// Descriptor tags
pub const DESCRIPTOR_TAG_REGISTRATION: u8 = 0x05;
pub const DESCRIPTOR_TAG_SERVICE: u8 = 0x48;

// Constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const TS_PAYLOAD_SIZE: usize = TS_PACKET_SIZE - TS_HEADER_SIZE;
pub const SYNC_BYTE: u8 = 0x47;
pub const MAX_SECTION_LENGTH: usize = 1021;
pub const PTS_HZ: u64 = 90_000;
pub const PCR_HZ: u64 = 27_000_000;
pub const MAX_TIMESTAMP: u64 = (1 << 33) - 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PATEntry {
    pub program_number: u16,
    pub program_map_pid: u16,
}

/// Program association table body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PAT {
    pub entries: Vec<PATEntry>,
}

impl PAT {
    pub fn len(&self) -> usize {
        self.entries.len() * 4
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn write_to(&self, buf: &mut BytesMut) {
        for entry in &self.entries {
            buf.put_u16(entry.program_number);
            buf.put_u16(entry.program_map_pid & 0x1fff | 7 << 13);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub tag: u8,
    pub data: Vec<u8>,
}

impl Descriptor {
    /// `registration_descriptor` carrying a four character format identifier.
    pub fn registration(format_identifier: &[u8; 4]) -> Self {
        Self {
            tag: DESCRIPTOR_TAG_REGISTRATION,
            data: format_identifier.to_vec(),
        }
    }

    fn encoded_len(&self) -> usize {
        2 + self.data.len()
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.tag);
        buf.put_u8(self.data.len() as u8);
        buf.put_slice(&self.data);
    }
}

fn descriptors_len(descriptors: &[Descriptor]) -> usize {
    descriptors.iter().map(Descriptor::encoded_len).sum()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementaryStreamInfo {
    pub stream_type: u8,
    pub elementary_pid: u16,
    pub descriptors: Vec<Descriptor>,
}

/// Program map table body (everything after `last_section_number`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PMT {
    pub pcr_pid: u16,
    pub program_descriptors: Vec<Descriptor>,
    pub elementary_stream_infos: Vec<ElementaryStreamInfo>,
}

impl PMT {
    pub fn len(&self) -> usize {
        let mut n = 4; // PCRPID + program info length
        n += descriptors_len(&self.program_descriptors);
        for info in &self.elementary_stream_infos {
            n += 5 + descriptors_len(&info.descriptors);
        }
        n
    }

    pub fn is_empty(&self) -> bool {
        self.elementary_stream_infos.is_empty()
    }

    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u16(self.pcr_pid & 0x1fff | 7 << 13);

        let prog_desc_len = descriptors_len(&self.program_descriptors);
        buf.put_u16((prog_desc_len as u16) & 0x3ff | 0xf << 12);
        for desc in &self.program_descriptors {
            desc.write_to(buf);
        }

        for info in &self.elementary_stream_infos {
            buf.put_u8(info.stream_type);
            buf.put_u16(info.elementary_pid & 0x1fff | 7 << 13);

            let es_desc_len = descriptors_len(&info.descriptors);
            buf.put_u16((es_desc_len as u16) & 0x3ff | 0xf << 12);
            for desc in &info.descriptors {
                desc.write_to(buf);
            }
        }
    }
}

/// One service entry of a DVB service description table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SDTEntry {
    pub service_id: u16,
    pub service_type: u8,
    pub provider_name: String,
    pub service_name: String,
}

/// Service description table body (everything after `last_section_number`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SDT {
    pub original_network_id: u16,
    pub entries: Vec<SDTEntry>,
}

// running_status = 4 (running), free_CA_mode = 0
const SDT_RUNNING: u16 = 4 << 13;

impl SDTEntry {
    /// Names as written into the service descriptor. `descriptor_length` is
    /// one byte, so type, both length bytes and both names share 255 bytes.
    fn names(&self) -> (&[u8], &[u8]) {
        let provider = &self.provider_name.as_bytes()[..self.provider_name.len().min(126)];
        let name = &self.service_name.as_bytes()[..self.service_name.len().min(252 - provider.len())];
        (provider, name)
    }

    fn descriptor_len(&self) -> usize {
        let (provider, name) = self.names();
        3 + provider.len() + name.len()
    }
}

impl SDT {
    /// Body size in bytes, as produced by [`SDT::write_to`].
    pub fn len(&self) -> usize {
        3 + self
            .entries
            .iter()
            .map(|entry| 5 + 2 + entry.descriptor_len())
            .sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u16(self.original_network_id);
        buf.put_u8(0xff);

        for entry in &self.entries {
            let (provider, name) = entry.names();
            let descriptor_len = entry.descriptor_len();

            buf.put_u16(entry.service_id);
            // reserved_future_use, no EIT schedule, no EIT present/following
            buf.put_u8(0xfc);
            buf.put_u16(SDT_RUNNING | (descriptor_len as u16 + 2) & 0x0fff);

            buf.put_u8(DESCRIPTOR_TAG_SERVICE);
            buf.put_u8(descriptor_len as u8);
            buf.put_u8(entry.service_type);
            buf.put_u8(provider.len() as u8);
            buf.put_slice(provider);
            buf.put_u8(name.len() as u8);
            buf.put_slice(name);
        }
    }
}

/// Adaptation field contents written by the muxer or recovered by the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdaptationField {
    /// Value of the `adaptation_field_length` byte.
    pub length: usize,
    pub discontinuity: bool,
    pub random_access: bool,
    pub es_priority: bool,
    /// Program clock reference in 27 MHz units.
    pub pcr: Option<u64>,
    pub opcr: Option<u64>,
    pub splice_countdown: Option<i8>,
    pub private_data: Option<Vec<u8>>,
}

impl AdaptationField {
    /// Bytes occupied in the packet by a field with these flags and no stuffing,
    /// including the length byte.
    pub fn encoded_len(&self) -> usize {
        2 + if self.pcr.is_some() { 6 } else { 0 }
    }

    /// Writes the field, padding it with `stuffing` 0xFF bytes.
    pub fn write_to(&self, buf: &mut BytesMut, stuffing: usize) {
        buf.put_u8((self.encoded_len() - 1 + stuffing) as u8);

        let mut flags = 0u8;
        if self.discontinuity {
            flags |= 0x80;
        }
        if self.random_access {
            flags |= 0x40;
        }
        if self.es_priority {
            flags |= 0x20;
        }
        if self.pcr.is_some() {
            flags |= 0x10;
        }
        buf.put_u8(flags);

        if let Some(pcr) = self.pcr {
            write_pcr(buf, pcr);
        }

        buf.put_bytes(0xff, stuffing);
    }
}

/// Writes the 48-bit PCR field: 33-bit base, 6 reserved bits, 9-bit extension.
pub fn write_pcr(buf: &mut BytesMut, pcr: u64) {
    let base = (pcr / 300) & MAX_TIMESTAMP;
    let ext = pcr % 300;
    let packed = base << 15 | 0x3f << 9 | ext;
    buf.put_u32((packed >> 16) as u32);
    buf.put_u16((packed & 0xffff) as u16);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TSHeader {
    pub sync_byte: u8, // Always 0x47
    pub transport_error: bool,
    pub payload_unit_start: bool,
    pub transport_priority: bool,
    pub pid: u16,
    pub scrambling_control: u8,
    pub adaptation_field_exists: bool,
    pub contains_payload: bool,
    pub continuity_counter: u8,
}

impl Default for TSHeader {
    fn default() -> Self {
        Self {
            sync_byte: SYNC_BYTE,
            transport_error: false,
            payload_unit_start: false,
            transport_priority: false,
            pid: 0,
            scrambling_control: 0,
            adaptation_field_exists: false,
            contains_payload: true,
            continuity_counter: 0,
        }
    }
}

impl TSHeader {
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.sync_byte);

        let mut b1 = 0u8;
        if self.transport_error {
            b1 |= 0x80;
        }
        if self.payload_unit_start {
            b1 |= 0x40;
        }
        if self.transport_priority {
            b1 |= 0x20;
        }
        b1 |= ((self.pid >> 8) & 0x1f) as u8;
        buf.put_u8(b1);

        buf.put_u8((self.pid & 0xff) as u8);

        let mut b3 = (self.scrambling_control & 0x03) << 6;
        if self.adaptation_field_exists {
            b3 |= 0x20;
        }
        if self.contains_payload {
            b3 |= 0x10;
        }
        b3 |= self.continuity_counter & 0x0f;
        buf.put_u8(b3);
    }
}

// Time conversion utilities

/// Converts a 90 kHz timestamp into the 27 MHz system clock.
pub fn pts_to_pcr(pts: u64) -> u64 {
    (pts & MAX_TIMESTAMP) * (PCR_HZ / PTS_HZ)
}

pub fn pcr_to_time(pcr: u64) -> Duration {
    Duration::from_nanos(((pcr as u128 * 1_000_000_000) / PCR_HZ as u128) as u64)
}

pub fn pts_to_time(pts: u64) -> Duration {
    Duration::from_nanos(((pts as u128 * 1_000_000_000) / PTS_HZ as u128) as u64)
}

/// Converts a duration into 90 kHz ticks, wrapping at the 33-bit rollover.
pub fn time_to_pts(time: Duration) -> u64 {
    ((time.as_nanos() * PTS_HZ as u128 / 1_000_000_000) as u64) & MAX_TIMESTAMP
}

/// Converts an encoder timestamp in microseconds into 90 kHz ticks, wrapping
/// at the 33-bit rollover.
pub fn micros_to_pts(micros: u64) -> u64 {
    ((micros as u128 * PTS_HZ as u128 / 1_000_000) as u64) & MAX_TIMESTAMP
}

/// Forward distance between two 33-bit timestamps, tolerant of one rollover.
pub fn ticks_between(from: u64, to: u64) -> u64 {
    to.wrapping_sub(from) & MAX_TIMESTAMP
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_layout() {
        let mut buf = BytesMut::new();
        TSHeader {
            payload_unit_start: true,
            pid: 0x101,
            adaptation_field_exists: true,
            continuity_counter: 0x1a,
            ..Default::default()
        }
        .write_to(&mut buf);
        assert_eq!(&buf[..], &[0x47, 0x41, 0x01, 0x3a]);
    }

    #[test]
    fn test_pcr_layout() {
        let mut buf = BytesMut::new();
        write_pcr(&mut buf, 300 * 0x1_2345_6789 + 0x123);
        // base 0x123456789 << 15 | 0x3f << 9 | 0x123
        assert_eq!(&buf[..], &[0x91, 0xa2, 0xb3, 0xc4, 0xff, 0x23]);
    }

    #[test]
    fn test_adaptation_field_stuffing() {
        let mut buf = BytesMut::new();
        let field = AdaptationField {
            random_access: true,
            ..Default::default()
        };
        field.write_to(&mut buf, 3);
        assert_eq!(&buf[..], &[4, 0x40, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_sdt_len_matches_written_body() {
        let sdt = SDT {
            original_network_id: 0xff01,
            entries: vec![
                SDTEntry {
                    service_id: 1,
                    service_type: 0x01,
                    provider_name: "vdk".into(),
                    service_name: "camera".into(),
                },
                SDTEntry {
                    service_id: 2,
                    service_type: 0x01,
                    provider_name: "p".repeat(300),
                    service_name: "s".repeat(300),
                },
            ],
        };
        let mut buf = BytesMut::new();
        sdt.write_to(&mut buf);
        assert_eq!(sdt.len(), buf.len());
        // long names are cut so the descriptor still fits its length byte
        assert_eq!(sdt.len(), 3 + (7 + 3 + 3 + 6) + (7 + 255));
    }

    #[test]
    fn test_timestamp_wrap() {
        assert_eq!(ticks_between(MAX_TIMESTAMP - 9, 10), 20);
        assert_eq!(ticks_between(100, 250), 150);
        assert_eq!(time_to_pts(Duration::from_secs(1)), 90_000);
        assert_eq!(micros_to_pts(1_000_000), 90_000);
        // ~26.5 hours in, the 90 kHz clock rolls over
        assert_eq!(micros_to_pts(95_443_717_800), 10);
        assert_eq!(pts_to_pcr(90_000), PCR_HZ);
        assert_eq!(pts_to_time(90_000), Duration::from_secs(1));
        assert_eq!(pcr_to_time(PCR_HZ), Duration::from_secs(1));
    }
}
