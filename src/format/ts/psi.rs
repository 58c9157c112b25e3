//! PSI/SI section serialization (PAT, PMT, SDT).

use super::types::*;
use crate::error::{MuxError, Result};
use crate::utils::crc::Crc32Mpeg2;
use bytes::{BufMut, Bytes, BytesMut};

// section_syntax_indicator = 1, '0', reserved '11'
const MPEG_SECTION_FLAGS: u16 = 0xb000;
// section_syntax_indicator = 1, reserved_future_use = 1, reserved '11'
const DVB_SECTION_FLAGS: u16 = 0xf000;

/// Wraps a table body into a long-form section:
/// header, `table_id_extension`, version, section numbers, body and CRC32.
fn build_section(
    table_id: u8,
    flags: u16,
    table_id_extension: u16,
    version: u8,
    body: &[u8],
) -> Result<Bytes> {
    // table_id_extension .. last_section_number, body, CRC32
    let section_length = 5 + body.len() + 4;
    if section_length > MAX_SECTION_LENGTH {
        return Err(MuxError::Configuration(format!(
            "table 0x{:02x} needs {} bytes, sections are limited to {}",
            table_id, section_length, MAX_SECTION_LENGTH
        )));
    }

    let mut buf = BytesMut::with_capacity(3 + section_length);
    buf.put_u8(table_id);
    buf.put_u16(flags | section_length as u16);
    buf.put_u16(table_id_extension);
    // reserved '11', version_number, current_next_indicator = 1
    buf.put_u8(0xc0 | (version & 0x1f) << 1 | 0x01);
    buf.put_u8(0); // section_number
    buf.put_u8(0); // last_section_number
    buf.put_slice(body);

    let crc = Crc32Mpeg2::calculate(&buf);
    buf.put_u32(crc);
    Ok(buf.freeze())
}

pub fn pat_section(pat: &PAT, transport_stream_id: u16, version: u8) -> Result<Bytes> {
    let mut body = BytesMut::with_capacity(pat.len());
    pat.write_to(&mut body);
    build_section(TABLE_ID_PAT, MPEG_SECTION_FLAGS, transport_stream_id, version, &body)
}

pub fn pmt_section(pmt: &PMT, program_number: u16, version: u8) -> Result<Bytes> {
    let mut body = BytesMut::with_capacity(pmt.len());
    pmt.write_to(&mut body);
    build_section(TABLE_ID_PMT, MPEG_SECTION_FLAGS, program_number, version, &body)
}

pub fn sdt_section(sdt: &SDT, transport_stream_id: u16, version: u8) -> Result<Bytes> {
    let mut body = BytesMut::new();
    sdt.write_to(&mut body);
    build_section(TABLE_ID_SDT, DVB_SECTION_FLAGS, transport_stream_id, version, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_program_pat() {
        let pat = PAT {
            entries: vec![PATEntry {
                program_number: 1,
                program_map_pid: 0x1000,
            }],
        };
        let section = pat_section(&pat, 1, 0).unwrap();
        assert_eq!(
            &section[..],
            &[
                0x00, 0xb0, 0x0d, 0x00, 0x01, 0xc1, 0x00, 0x00, 0x00, 0x01, 0xf0, 0x00, 0x2a,
                0xb1, 0x04, 0xb2
            ]
        );
    }

    #[test]
    fn test_pmt_version_and_crc() {
        let pmt = PMT {
            pcr_pid: 0x100,
            program_descriptors: Vec::new(),
            elementary_stream_infos: vec![
                ElementaryStreamInfo {
                    stream_type: STREAM_TYPE_H264,
                    elementary_pid: 0x100,
                    descriptors: Vec::new(),
                },
                ElementaryStreamInfo {
                    stream_type: STREAM_TYPE_PRIVATE_PES,
                    elementary_pid: 0x101,
                    descriptors: vec![Descriptor::registration(b"Opus")],
                },
            ],
        };
        let section = pmt_section(&pmt, 1, 3).unwrap();
        assert_eq!(section[0], TABLE_ID_PMT);
        let length = (u16::from_be_bytes([section[1], section[2]]) & 0x0fff) as usize;
        assert_eq!(length, section.len() - 3);
        assert_eq!(length, 9 + 4 + 5 + 5 + 6);
        assert_eq!(section[5], 0xc0 | 3 << 1 | 1);
        assert!(Crc32Mpeg2::verify(&section));
    }

    #[test]
    fn test_sdt_layout() {
        let sdt = SDT {
            original_network_id: 0xff01,
            entries: vec![SDTEntry {
                service_id: 1,
                service_type: 0x01,
                provider_name: "Prov".into(),
                service_name: "Cam".into(),
            }],
        };
        let section = sdt_section(&sdt, 1, 0).unwrap();
        assert_eq!(&section[..3], &[0x42, 0xf0, (5 + 3 + 5 + 12 + 4) as u8]);
        assert_eq!(&section[8..11], &[0xff, 0x01, 0xff]);
        assert_eq!(&section[11..16], &[0x00, 0x01, 0xfc, 0x80, 12]);
        assert_eq!(&section[16..19], &[0x48, 10, 0x01]);
        assert!(Crc32Mpeg2::verify(&section));
    }

    #[test]
    fn test_oversize_section() {
        let pat = PAT {
            entries: (1..=300)
                .map(|n| PATEntry {
                    program_number: n,
                    program_map_pid: 0x1000 + n,
                })
                .collect(),
        };
        assert!(pat_section(&pat, 1, 0).is_err());
    }
}
