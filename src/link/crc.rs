//! # CRC16-CCITT Implementation
//!
//! CRC-16-CCITT checksum calculation for the Link Protocol.
//!
//! **Polynomial**: 0x1021 (x^16 + x^12 + x^5 + 1)
//! **Initial Value**: 0xFFFF
//! **Reflection**: none, **Final XOR**: none

/// CRC-16-CCITT polynomial
const CRC16_POLY: u16 = 0x1021;

/// Initial CRC register value used by the Link Protocol
pub const CRC16_INIT: u16 = 0xFFFF;

/// Precomputed CRC16 lookup table for fast calculation
const CRC16_TABLE: [u16; 256] = generate_crc16_table();

/// Generate CRC16 lookup table at compile time
const fn generate_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ CRC16_POLY;
            } else {
                crc <<= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate CRC16-CCITT checksum with the protocol seed (0xFFFF)
///
/// # Arguments
///
/// * `data` - Byte slice to calculate CRC for (Type + Sequence + Length + Timestamp + Payload)
///
/// # Returns
///
/// * `u16` - Calculated CRC16 checksum
///
/// # Examples
///
/// ```
/// use link_bench::link::crc::crc16_ccitt;
///
/// assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
/// ```
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    crc16_ccitt_with_seed(data, CRC16_INIT)
}

/// Calculate CRC16-CCITT checksum starting from an explicit register value
///
/// Passing the CRC of a prefix as `seed` continues the calculation over
/// `data`, so a checksum can be built up across several slices.
pub fn crc16_ccitt_with_seed(data: &[u8], seed: u16) -> u16 {
    let mut crc = seed;

    for &byte in data {
        let index = ((crc >> 8) as u8 ^ byte) as usize;
        crc = (crc << 8) ^ CRC16_TABLE[index];
    }

    crc
}

/// Calculate CRC16-CCITT checksum bit by bit
///
/// Reference form of the algorithm: XOR each byte into the high half of the
/// register, then shift eight times, folding in the polynomial whenever the
/// top bit falls out. The table-driven [`crc16_ccitt_with_seed`] must agree
/// with this for every input.
pub fn crc16_ccitt_bitwise(data: &[u8], seed: u16) -> u16 {
    let mut crc = seed;

    for &byte in data {
        crc ^= (byte as u16) << 8;

        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ CRC16_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}
