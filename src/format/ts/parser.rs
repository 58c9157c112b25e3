//! Reader side of the TS format, used to inspect and verify muxer output.

use super::pes::{read_timestamp, PESHeader, PES_FIXED_HEADER_SIZE};
use super::types::*;
use crate::error::{MuxError, Result};
use crate::utils::crc::Crc32Mpeg2;
use std::collections::HashMap;

fn invalid(msg: impl Into<String>) -> MuxError {
    MuxError::Parser(msg.into())
}

/// A long-form PSI/SI section with its CRC already checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub table_id: u8,
    pub table_id_extension: u16,
    pub version: u8,
    pub current_next: bool,
    pub section_number: u8,
    pub last_section_number: u8,
    /// Table body between `last_section_number` and the CRC.
    pub body: Vec<u8>,
}

/// Parsed `PES` header plus the offset of the elementary stream data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPes {
    pub header: PESHeader,
    pub payload_offset: usize,
}

#[derive(Debug, Default)]
pub struct TSPacketParser;

impl TSPacketParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_header(&self, data: &[u8]) -> Result<TSHeader> {
        if data.len() < TS_HEADER_SIZE {
            return Err(invalid("TS packet too short"));
        }

        if data[0] != SYNC_BYTE {
            return Err(invalid("Invalid sync byte"));
        }

        Ok(TSHeader {
            sync_byte: data[0],
            transport_error: (data[1] & 0x80) != 0,
            payload_unit_start: (data[1] & 0x40) != 0,
            transport_priority: (data[1] & 0x20) != 0,
            pid: (((data[1] & 0x1F) as u16) << 8) | data[2] as u16,
            scrambling_control: (data[3] >> 6) & 0x03,
            adaptation_field_exists: (data[3] & 0x20) != 0,
            contains_payload: (data[3] & 0x10) != 0,
            continuity_counter: data[3] & 0x0F,
        })
    }

    /// Adaptation field of a full packet, `None` when absent or empty.
    pub fn parse_adaptation_field(&self, data: &[u8]) -> Result<Option<AdaptationField>> {
        if data.len() < TS_HEADER_SIZE + 1 || (data[3] & 0x20) == 0 {
            return Ok(None);
        }

        let offset = TS_HEADER_SIZE;
        let length = data[offset] as usize;
        if length == 0 {
            return Ok(None);
        }
        if data.len() < offset + length + 1 {
            return Err(invalid("Adaptation field too short"));
        }

        let flags = data[offset + 1];
        let mut field = AdaptationField {
            length,
            discontinuity: (flags & 0x80) != 0,
            random_access: (flags & 0x40) != 0,
            es_priority: (flags & 0x20) != 0,
            ..Default::default()
        };

        let end = offset + 1 + length;
        let mut pos = offset + 2;

        if flags & 0x10 != 0 {
            field.pcr = Some(read_pcr(&data[pos..end])?);
            pos += 6;
        }

        if flags & 0x08 != 0 {
            field.opcr = Some(read_pcr(&data[pos..end])?);
            pos += 6;
        }

        if flags & 0x04 != 0 {
            if end < pos + 1 {
                return Err(invalid("Splice countdown too short"));
            }
            field.splice_countdown = Some(data[pos] as i8);
            pos += 1;
        }

        if flags & 0x02 != 0 {
            if end < pos + 1 {
                return Err(invalid("Private data length byte missing"));
            }
            let private_len = data[pos] as usize;
            pos += 1;
            if end < pos + private_len {
                return Err(invalid("Private data too short"));
            }
            field.private_data = Some(data[pos..pos + private_len].to_vec());
        }

        Ok(Some(field))
    }

    /// Payload bytes of a full packet, after any adaptation field.
    pub fn payload<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        let header = self.parse_header(data)?;
        if !header.contains_payload {
            return Ok(&[]);
        }
        let mut start = TS_HEADER_SIZE;
        if header.adaptation_field_exists {
            start += 1 + *data.get(TS_HEADER_SIZE).ok_or_else(|| invalid("Missing adaptation field length"))? as usize;
        }
        data.get(start..)
            .ok_or_else(|| invalid("Adaptation field overruns packet"))
    }

    /// Parses one complete long-form section, verifying its length and CRC.
    pub fn parse_section(&self, data: &[u8]) -> Result<Section> {
        if data.len() < 3 {
            return Err(invalid("Section header too short"));
        }
        let section_length = (((data[1] & 0x0f) as usize) << 8) | data[2] as usize;
        if data[1] & 0x80 == 0 {
            return Err(invalid("Short-form sections are not supported"));
        }
        if section_length < 9 || data.len() < 3 + section_length {
            return Err(invalid(format!("Section length {} out of bounds", section_length)));
        }

        let section = &data[..3 + section_length];
        if !Crc32Mpeg2::verify(section) {
            return Err(invalid(format!("CRC mismatch in table 0x{:02x}", data[0])));
        }

        Ok(Section {
            table_id: section[0],
            table_id_extension: u16::from_be_bytes([section[3], section[4]]),
            version: (section[5] >> 1) & 0x1f,
            current_next: section[5] & 0x01 != 0,
            section_number: section[6],
            last_section_number: section[7],
            body: section[8..section.len() - 4].to_vec(),
        })
    }

    pub fn parse_pat(&self, data: &[u8]) -> Result<PAT> {
        if data.len() % 4 != 0 {
            return Err(invalid("PAT body is not a whole number of entries"));
        }
        let entries = data
            .chunks_exact(4)
            .filter_map(|entry| {
                let program_number = u16::from_be_bytes([entry[0], entry[1]]);
                let pid = u16::from_be_bytes([entry[2], entry[3]]) & 0x1fff;
                // program 0 points at the network PID
                (program_number != 0).then_some(PATEntry {
                    program_number,
                    program_map_pid: pid,
                })
            })
            .collect();
        Ok(PAT { entries })
    }

    pub fn parse_pmt(&self, data: &[u8]) -> Result<PMT> {
        let mut pmt = PMT::default();
        let end = data.len();
        let mut pos = 0;

        if pos + 4 > end {
            return Err(invalid("PMT too short for PCR PID"));
        }

        pmt.pcr_pid = ((data[pos] as u16 & 0x1F) << 8) | data[pos + 1] as u16;
        let program_info_length = ((data[pos + 2] as usize & 0x0F) << 8) | data[pos + 3] as usize;
        pos += 4;

        if pos + program_info_length > end {
            return Err(invalid("Program info data too short"));
        }
        pmt.program_descriptors = self.parse_descriptors(&data[pos..pos + program_info_length])?;
        pos += program_info_length;

        while pos + 5 <= end {
            let stream_type = data[pos];
            let elementary_pid = ((data[pos + 1] as u16 & 0x1F) << 8) | data[pos + 2] as u16;
            let es_info_length = ((data[pos + 3] as usize & 0x0F) << 8) | data[pos + 4] as usize;
            pos += 5;

            if pos + es_info_length > end {
                return Err(invalid("ES info data too short"));
            }

            let descriptors = self.parse_descriptors(&data[pos..pos + es_info_length])?;
            pos += es_info_length;

            pmt.elementary_stream_infos.push(ElementaryStreamInfo {
                stream_type,
                elementary_pid,
                descriptors,
            });
        }

        Ok(pmt)
    }

    /// SDT body. Service and provider names come from the service descriptor.
    pub fn parse_sdt(&self, data: &[u8]) -> Result<SDT> {
        if data.len() < 3 {
            return Err(invalid("SDT too short"));
        }
        let mut sdt = SDT {
            original_network_id: u16::from_be_bytes([data[0], data[1]]),
            entries: Vec::new(),
        };

        let mut pos = 3;
        while pos + 5 <= data.len() {
            let service_id = u16::from_be_bytes([data[pos], data[pos + 1]]);
            let loop_len = ((data[pos + 3] as usize & 0x0f) << 8) | data[pos + 4] as usize;
            pos += 5;
            if pos + loop_len > data.len() {
                return Err(invalid("SDT descriptor loop too short"));
            }

            let descriptors = self.parse_descriptors(&data[pos..pos + loop_len])?;
            pos += loop_len;

            let service = descriptors
                .iter()
                .find(|d| d.tag == DESCRIPTOR_TAG_SERVICE)
                .ok_or_else(|| invalid(format!("service {} has no service descriptor", service_id)))?;
            let (service_type, provider_name, service_name) = parse_service_descriptor(&service.data)?;
            sdt.entries.push(SDTEntry {
                service_id,
                service_type,
                provider_name,
                service_name,
            });
        }

        Ok(sdt)
    }

    pub fn parse_descriptors(&self, data: &[u8]) -> Result<Vec<Descriptor>> {
        let mut descriptors = Vec::new();
        let mut pos = 0;

        while pos + 2 <= data.len() {
            let tag = data[pos];
            let length = data[pos + 1] as usize;
            pos += 2;

            if pos + length > data.len() {
                return Err(invalid("Descriptor data too short"));
            }

            descriptors.push(Descriptor {
                tag,
                data: data[pos..pos + length].to_vec(),
            });
            pos += length;
        }

        Ok(descriptors)
    }

    /// Parses the header at the start of a PES packet.
    pub fn parse_pes_header(&self, data: &[u8]) -> Result<ParsedPes> {
        if data.len() < PES_FIXED_HEADER_SIZE {
            return Err(invalid("PES header too short"));
        }
        if data[..3] != [0x00, 0x00, 0x01] {
            return Err(invalid("Missing PES start code"));
        }

        let header_data_length = data[8] as usize;
        let payload_offset = PES_FIXED_HEADER_SIZE + header_data_length;
        if data.len() < payload_offset {
            return Err(invalid("PES optional header truncated"));
        }

        let mut header = PESHeader::new(data[3]);
        header.packet_length = u16::from_be_bytes([data[4], data[5]]);
        header.data_alignment = data[6] & 0x04 != 0;

        let flags = data[7] >> 6;
        let optional = &data[PES_FIXED_HEADER_SIZE..payload_offset];
        if flags & 0x02 != 0 {
            header.pts = Some(read_timestamp(optional).ok_or_else(|| invalid("PTS truncated"))?);
        }
        if flags == 0x03 {
            let dts = optional.get(5..).and_then(read_timestamp);
            header.dts = Some(dts.ok_or_else(|| invalid("DTS truncated"))?);
        }

        Ok(ParsedPes {
            header,
            payload_offset,
        })
    }
}

fn read_pcr(data: &[u8]) -> Result<u64> {
    if data.len() < 6 {
        return Err(invalid("PCR data too short"));
    }
    let base = ((data[0] as u64) << 25)
        | ((data[1] as u64) << 17)
        | ((data[2] as u64) << 9)
        | ((data[3] as u64) << 1)
        | ((data[4] & 0x80) as u64 >> 7);
    let ext = (((data[4] & 0x01) as u64) << 8) | (data[5] as u64);
    Ok(base * 300 + ext)
}

fn parse_service_descriptor(data: &[u8]) -> Result<(u8, String, String)> {
    let truncated = || invalid("Service descriptor truncated");
    let service_type = *data.first().ok_or_else(truncated)?;
    let provider_len = *data.get(1).ok_or_else(truncated)? as usize;
    let provider = data.get(2..2 + provider_len).ok_or_else(truncated)?;
    let name_len = *data.get(2 + provider_len).ok_or_else(truncated)? as usize;
    let name_start = 3 + provider_len;
    let name = data.get(name_start..name_start + name_len).ok_or_else(truncated)?;
    Ok((
        service_type,
        String::from_utf8_lossy(provider).into_owned(),
        String::from_utf8_lossy(name).into_owned(),
    ))
}

/// Reassembles PSI sections that span several TS packets, one buffer per PID.
#[derive(Debug, Default)]
pub struct PsiAssembler {
    parser: TSPacketParser,
    pending: HashMap<u16, Vec<u8>>,
}

impl PsiAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one packet; returns the section it completes, if any.
    ///
    /// Only one section per packet is handled, which matches muxer output
    /// where every section starts a fresh packet.
    pub fn push(&mut self, packet: &[u8]) -> Result<Option<Section>> {
        let header = self.parser.parse_header(packet)?;
        let payload = self.parser.payload(packet)?;

        if header.payload_unit_start {
            let pointer = *payload.first().ok_or_else(|| invalid("Missing pointer field"))? as usize;
            let start = payload
                .get(1 + pointer..)
                .ok_or_else(|| invalid("Pointer field overruns packet"))?;
            self.pending.insert(header.pid, start.to_vec());
        } else if let Some(buf) = self.pending.get_mut(&header.pid) {
            buf.extend_from_slice(payload);
        } else {
            return Ok(None);
        }

        let Some(buf) = self.pending.get(&header.pid) else {
            return Ok(None);
        };
        if buf.len() < 3 {
            return Ok(None);
        }
        let total = 3 + ((((buf[1] & 0x0f) as usize) << 8) | buf[2] as usize);
        if buf.len() < total {
            return Ok(None);
        }

        let section = self.parser.parse_section(&buf[..total]);
        self.pending.remove(&header.pid);
        section.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ts::packetizer::{packetize_pes, packetize_section, ContinuityCounters, PesStart};
    use crate::format::ts::pes::PESPacket;
    use crate::format::ts::psi::{pmt_section, sdt_section};
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_ts_header() {
        let parser = TSPacketParser::new();
        let data = [
            0x47, // Sync byte
            0x40, // Payload unit start indicator set
            0x00, // PID (high bits)
            0x10, // Payload only, CC 0
        ];

        let header = parser.parse_header(&data).unwrap();
        assert_eq!(header.sync_byte, 0x47);
        assert!(header.payload_unit_start);
        assert_eq!(header.pid, 0);
        assert!(header.contains_payload);
        assert_eq!(header.continuity_counter, 0);

        assert!(parser.parse_header(&[0x46, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_parse_pat() {
        let parser = TSPacketParser::new();
        let data = [
            0x00, 0x00, 0xe0, 0x10, // network PID entry
            0x00, 0x01, 0xf0, 0x00, // program 1
            0x00, 0x02, 0xe1, 0x00, // program 2
        ];

        let pat = parser.parse_pat(&data).unwrap();
        assert_eq!(pat.entries.len(), 2);
        assert_eq!(pat.entries[0].program_number, 1);
        assert_eq!(pat.entries[0].program_map_pid, 0x1000);
        assert_eq!(pat.entries[1].program_map_pid, 0x0100);
    }

    #[test]
    fn test_section_crc_checked() {
        let parser = TSPacketParser::new();
        let mut section = vec![
            0x00, 0xb0, 0x0d, 0x00, 0x01, 0xc1, 0x00, 0x00, 0x00, 0x01, 0xf0, 0x00, 0x2a, 0xb1,
            0x04, 0xb2,
        ];
        let parsed = parser.parse_section(&section).unwrap();
        assert_eq!(parsed.table_id, TABLE_ID_PAT);
        assert_eq!(parsed.table_id_extension, 1);
        assert_eq!(parsed.version, 0);
        assert!(parsed.current_next);
        assert_eq!(parsed.body, vec![0x00, 0x01, 0xf0, 0x00]);

        section[10] ^= 0x01;
        assert!(parser.parse_section(&section).is_err());
    }

    #[test]
    fn test_pmt_and_sdt_through_assembler() {
        let pmt = PMT {
            pcr_pid: 0x100,
            program_descriptors: Vec::new(),
            elementary_stream_infos: vec![ElementaryStreamInfo {
                stream_type: STREAM_TYPE_PRIVATE_PES,
                elementary_pid: 0x100,
                descriptors: vec![Descriptor::registration(b"Opus")],
            }],
        };
        let sdt = SDT {
            original_network_id: 0xff01,
            entries: vec![SDTEntry {
                service_id: 7,
                service_type: 0x01,
                provider_name: "provider".into(),
                service_name: "camera".into(),
            }],
        };

        let mut counters = ContinuityCounters::new();
        let mut assembler = PsiAssembler::new();
        let parser = TSPacketParser::new();

        let packet = &packetize_section(0x1000, &pmt_section(&pmt, 7, 2).unwrap(), &mut counters)[0];
        let section = assembler.push(packet.as_bytes()).unwrap().unwrap();
        assert_eq!(section.version, 2);
        assert_eq!(parser.parse_pmt(&section.body).unwrap(), pmt);

        let packet = &packetize_section(PID_SDT, &sdt_section(&sdt, 1, 2).unwrap(), &mut counters)[0];
        let section = assembler.push(packet.as_bytes()).unwrap().unwrap();
        assert_eq!(section.table_id, TABLE_ID_SDT);
        assert_eq!(parser.parse_sdt(&section.body).unwrap(), sdt);
    }

    #[test]
    fn test_multi_packet_section() {
        // 400 bytes of body: section spans three packets
        let body = vec![0u8; 400];
        let pat = PAT {
            entries: body
                .chunks(4)
                .enumerate()
                .map(|(i, _)| PATEntry {
                    program_number: i as u16 + 1,
                    program_map_pid: 0x1000 + i as u16,
                })
                .collect(),
        };
        let section = crate::format::ts::psi::pat_section(&pat, 1, 0).unwrap();

        let mut counters = ContinuityCounters::new();
        let packets = packetize_section(PID_PAT, &section, &mut counters);
        assert_eq!(packets.len(), 3);

        let mut assembler = PsiAssembler::new();
        assert!(assembler.push(packets[0].as_bytes()).unwrap().is_none());
        assert!(assembler.push(packets[1].as_bytes()).unwrap().is_none());
        let parsed = assembler.push(packets[2].as_bytes()).unwrap().unwrap();
        assert_eq!(TSPacketParser::new().parse_pat(&parsed.body).unwrap(), pat);
    }

    #[test]
    fn test_adaptation_field_and_pes_header() {
        let pes = PESPacket::new(0xe0, Bytes::from_static(&[9; 20]), 183_000, Some(180_000)).unwrap();
        let mut counters = ContinuityCounters::new();
        let start = PesStart {
            pcr: Some(pts_to_pcr(180_000)),
            random_access: true,
        };
        let packets = packetize_pes(0x100, &pes.to_bytes(), start, &mut counters);
        let data = packets[0].as_bytes();

        let parser = TSPacketParser::new();
        let field = parser.parse_adaptation_field(data).unwrap().unwrap();
        assert!(field.random_access);
        assert_eq!(field.pcr, Some(180_000 * 300));

        let payload = parser.payload(data).unwrap();
        let parsed = parser.parse_pes_header(payload).unwrap();
        assert_eq!(parsed.header.stream_id, 0xe0);
        assert_eq!(parsed.header.pts, Some(183_000));
        assert_eq!(parsed.header.dts, Some(180_000));
        assert!(parsed.header.data_alignment);
        assert_eq!(&payload[parsed.payload_offset..], &[9; 20]);
    }
}
