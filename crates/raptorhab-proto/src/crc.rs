//! CRC-32 (IEEE 802.3) used for frame integrity and image checksums.
//!
//! Reflected polynomial `0xEDB88320`, initial value `0xFFFF_FFFF`, final XOR
//! `0xFFFF_FFFF` — the same parameters as zlib's `crc32`, so the image
//! checksum in `IMAGE_META` can be cross-checked with any standard tool.

/// Reflected IEEE 802.3 polynomial.
const POLYNOMIAL: u32 = 0xEDB8_8320;

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ POLYNOMIAL } else { crc >> 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static TABLE: [u32; 256] = build_table();

/// Compute the CRC-32 of `data`.
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc = TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize] ^ (crc >> 8);
    }
    crc ^ 0xFFFF_FFFF
}

/// Compute the CRC-32 of `data` as 4 big-endian bytes, ready to append to a
/// frame.
#[must_use]
pub fn crc32_bytes(data: &[u8]) -> [u8; 4] {
    crc32(data).to_be_bytes()
}

/// Verify a complete frame whose last 4 bytes are its big-endian CRC-32.
///
/// Returns `false` for buffers shorter than the CRC itself.
#[must_use]
pub fn verify_packet_crc(packet: &[u8]) -> bool {
    let Some(split) = packet.len().checked_sub(4) else {
        return false;
    };
    let (body, trailer) = packet.split_at(split);
    let Ok(received) = <[u8; 4]>::try_from(trailer) else {
        return false;
    };
    crc32(body) == u32::from_be_bytes(received)
}
