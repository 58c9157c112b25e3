/// CRC32 as used by MPEG-2 TS PSI sections (ITU-T H.222.0 / ISO/IEC 13818-1).
///
/// Polynomial 0x04C11DB7, initial value 0xFFFFFFFF, no reflection, no final XOR.
const CRC32_MPEG2: u32 = 0x04C11DB7;

const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if (crc & 0x80000000) != 0 {
                (crc << 1) ^ CRC32_MPEG2
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// MPEG-2 CRC32 calculator for PSI sections.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32Mpeg2;

impl Crc32Mpeg2 {
    /// Computes the checksum of `data`.
    ///
    /// ```
    /// use tsmux::utils::Crc32Mpeg2;
    ///
    /// assert_eq!(Crc32Mpeg2::calculate(&[0x01, 0x01]), 0xD66FB816);
    /// ```
    pub fn calculate(data: &[u8]) -> u32 {
        data.iter().fold(0xFFFFFFFF, |crc, &byte| {
            let index = ((crc >> 24) ^ (byte as u32)) & 0xFF;
            (crc << 8) ^ TABLE[index as usize]
        })
    }

    /// Returns true when `section` (CRC included) checks out.
    ///
    /// Running the algorithm over a section together with its trailing CRC
    /// yields zero.
    pub fn verify(section: &[u8]) -> bool {
        section.len() >= 4 && Self::calculate(section) == 0
    }
}
