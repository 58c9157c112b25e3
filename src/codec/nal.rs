use crate::av::CodecType;

const H264_NAL_AUD: u8 = 9;
const H265_NAL_AUD: u8 = 35;

// primary_pic_type = 7 (any slice type), rbsp_stop_one_bit
const H264_AUD: [u8; 6] = [0x00, 0x00, 0x00, 0x01, 0x09, 0xf0];
// nal_unit_type = 35, nuh_temporal_id_plus1 = 1, pic_type = 2, rbsp_stop_one_bit
const H265_AUD: [u8; 7] = [0x00, 0x00, 0x00, 0x01, 0x46, 0x01, 0x50];

/// Annex B access unit delimiter for `codec`. Empty for non-NAL codecs.
pub fn access_unit_delimiter(codec: CodecType) -> &'static [u8] {
    match codec {
        CodecType::H264 => &H264_AUD,
        CodecType::H265 => &H265_AUD,
        _ => &[],
    }
}

/// Offset of the first NAL header byte after a leading Annex B start code.
fn first_nal_header(data: &[u8]) -> Option<usize> {
    if data.starts_with(&[0, 0, 0, 1]) {
        Some(4)
    } else if data.starts_with(&[0, 0, 1]) {
        Some(3)
    } else {
        None
    }
}

/// Whether the first NAL unit of `data` already is an access unit delimiter.
pub fn starts_with_aud(codec: CodecType, data: &[u8]) -> bool {
    let Some(header) = first_nal_header(data).and_then(|pos| data.get(pos)) else {
        return false;
    };
    match codec {
        CodecType::H264 => header & 0x1f == H264_NAL_AUD,
        CodecType::H265 => (header >> 1) & 0x3f == H265_NAL_AUD,
        _ => false,
    }
}
