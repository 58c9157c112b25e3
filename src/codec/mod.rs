//! Codec specific payload framing applied before PES packetization.
//!
//! Encoders hand over bare access units; transport stream receivers expect
//! a little extra framing for some codecs:
//!
//! - H.264 / H.265: every access unit should open with an access unit
//!   delimiter NAL unit (required by HLS and many hardware decoders).
//! - Opus: every access unit is preceded by the `opus_control_header`.

use crate::av::CodecType;
use bytes::{Bytes, BytesMut};

pub mod nal;
pub mod opus;

/// Returns the payload that goes into the PES packet for `codec`.
pub fn frame_payload(codec: CodecType, data: &Bytes, insert_aud: bool) -> Bytes {
    match codec {
        CodecType::H264 | CodecType::H265 if insert_aud => {
            if nal::starts_with_aud(codec, data) {
                return data.clone();
            }
            let aud = nal::access_unit_delimiter(codec);
            let mut buf = BytesMut::with_capacity(aud.len() + data.len());
            buf.extend_from_slice(aud);
            buf.extend_from_slice(data);
            buf.freeze()
        }
        CodecType::OPUS => {
            let mut buf = BytesMut::with_capacity(opus::control_header_len(data.len()) + data.len());
            opus::write_control_header(&mut buf, data.len());
            buf.extend_from_slice(data);
            buf.freeze()
        }
        _ => data.clone(),
    }
}
