use super::packet::TsPacket;
use super::types::*;
use bytes::{BufMut, BytesMut};
use std::collections::HashMap;

/// Per-PID 4-bit continuity counters.
#[derive(Debug, Clone, Default)]
pub struct ContinuityCounters {
    counters: HashMap<u16, u8>,
}

impl ContinuityCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter value for the next payload-bearing packet on `pid`, advancing
    /// the counter mod 16.
    pub fn next(&mut self, pid: u16) -> u8 {
        let counter = self.counters.entry(pid).or_insert(0);
        let current = *counter;
        *counter = (*counter + 1) & 0x0f;
        current
    }

    pub fn clear(&mut self) {
        self.counters.clear();
    }
}

/// Flags for the first packet of a PES unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PesStart {
    /// PCR in 27 MHz units to carry in the first packet.
    pub pcr: Option<u64>,
    /// Access unit is a random access point.
    pub random_access: bool,
}

/// Number of packets [`packetize_pes`] produces for a PES of `len` bytes.
pub fn pes_packet_count(len: usize, start: &PesStart) -> usize {
    let field_len = if start.pcr.is_some() || start.random_access {
        AdaptationField {
            pcr: start.pcr,
            ..Default::default()
        }
        .encoded_len()
    } else {
        0
    };
    let first = TS_PAYLOAD_SIZE - field_len;
    if len <= first {
        1
    } else {
        1 + (len - first).div_ceil(TS_PAYLOAD_SIZE)
    }
}

/// Slices one serialized PES packet into TS packets on `pid`.
///
/// The first packet sets `payload_unit_start_indicator` and carries the
/// PCR / random access indicator when requested. A short final packet is
/// padded through adaptation-field stuffing, so a PES of exactly N*184 bytes
/// (and no first-packet adaptation field) yields exactly N packets.
pub fn packetize_pes(
    pid: u16,
    pes: &[u8],
    start: PesStart,
    counters: &mut ContinuityCounters,
) -> Vec<TsPacket> {
    let mut packets = Vec::with_capacity(pes.len() / TS_PAYLOAD_SIZE + 1);
    let mut offset = 0;

    while offset < pes.len() {
        let first = offset == 0;
        let field = (first && (start.pcr.is_some() || start.random_access)).then(|| {
            AdaptationField {
                random_access: start.random_access,
                pcr: start.pcr,
                ..Default::default()
            }
        });

        let field_len = field.as_ref().map_or(0, AdaptationField::encoded_len);
        let capacity = TS_PAYLOAD_SIZE - field_len;
        let chunk = (pes.len() - offset).min(capacity);
        let stuffing = capacity - chunk;

        let mut buf = BytesMut::with_capacity(TS_PACKET_SIZE);
        TSHeader {
            payload_unit_start: first,
            pid,
            adaptation_field_exists: field.is_some() || stuffing > 0,
            contains_payload: true,
            continuity_counter: counters.next(pid),
            ..Default::default()
        }
        .write_to(&mut buf);

        match (&field, stuffing) {
            (Some(field), stuffing) => field.write_to(&mut buf, stuffing),
            (None, 0) => {}
            // A lone length byte of zero pads exactly one byte.
            (None, 1) => buf.put_u8(0),
            (None, stuffing) => AdaptationField::default().write_to(&mut buf, stuffing - 2),
        }

        buf.put_slice(&pes[offset..offset + chunk]);
        offset += chunk;
        packets.push(TsPacket::from_buf(buf));
    }

    packets
}

/// Carries one complete PSI section on `pid`: pointer field, section bytes,
/// split across as many packets as needed with 0xFF filling the tail.
pub fn packetize_section(
    pid: u16,
    section: &[u8],
    counters: &mut ContinuityCounters,
) -> Vec<TsPacket> {
    let mut payload = Vec::with_capacity(section.len() + 1);
    payload.push(0); // pointer_field
    payload.extend_from_slice(section);

    payload
        .chunks(TS_PAYLOAD_SIZE)
        .enumerate()
        .map(|(i, chunk)| {
            let mut buf = BytesMut::with_capacity(TS_PACKET_SIZE);
            TSHeader {
                payload_unit_start: i == 0,
                pid,
                continuity_counter: counters.next(pid),
                ..Default::default()
            }
            .write_to(&mut buf);
            buf.put_slice(chunk);
            buf.put_bytes(0xff, TS_PAYLOAD_SIZE - chunk.len());
            TsPacket::from_buf(buf)
        })
        .collect()
}
