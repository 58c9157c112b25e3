use bytes::{BufMut, BytesMut};

/// `control_header_prefix` (0x3ff) with trim and extension flags cleared.
const CONTROL_HEADER_PREFIX: u16 = 0x7fe0;

/// Size of the control header announcing an access unit of `au_size` bytes.
pub fn control_header_len(au_size: usize) -> usize {
    2 + au_size / 255 + 1
}

/// Writes the Opus-in-TS control header: prefix, then `au_size` as a run of
/// 0xFF bytes followed by the remainder.
pub fn write_control_header(buf: &mut BytesMut, au_size: usize) {
    buf.put_u16(CONTROL_HEADER_PREFIX);
    buf.put_bytes(0xff, au_size / 255);
    buf.put_u8((au_size % 255) as u8);
}
