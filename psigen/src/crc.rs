//! MPEG-2 CRC32 used as the PSI section trailer.
//!
//! Same const-built table as the `crc32_mpeg2` check in recisdb-rs `ts_analyzer::psi`.

/// Calculate CRC32 for MPEG-2 (polynomial 0x04C11DB7).
///
/// Initial value 0xFFFFFFFF, no input/output reflection, no final xor.
/// A section with its CRC appended checksums to zero.
pub fn crc32_mpeg2(data: &[u8]) -> u32 {
    static CRC_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = (i as u32) << 24;
            let mut j = 0;
            while j < 8 {
                if crc & 0x80000000 != 0 {
                    crc = (crc << 1) ^ 0x04C11DB7;
                } else {
                    crc <<= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFFFFFFu32;
    for &byte in data {
        let index = ((crc >> 24) ^ byte as u32) as usize;
        crc = (crc << 8) ^ CRC_TABLE[index];
    }
    crc
}
