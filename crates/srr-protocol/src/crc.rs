//! Frame checksum
//!
//! The checksum is a table-free CRC over 16-bit big-endian words. The
//! accumulator is seeded with the first word and every following word is
//! shifted in bit by bit, folding in [`POLYNOMIAL`] whenever the top bit
//! falls out. A trailing odd byte is treated as the high half of a word, and
//! an even-length input gets one extra zero word.

/// Generator polynomial
pub const POLYNOMIAL: u16 = 0x8005;

/// Compute the checksum of `data`
///
/// Inputs shorter than two bytes checksum to zero. A two byte input is its
/// own checksum.
pub fn checksum(data: &[u8]) -> u16 {
    if data.len() < 2 {
        return 0;
    }

    let mut crc = u16::from_be_bytes([data[0], data[1]]);
    if data.len() == 2 {
        return crc;
    }

    let rest = &data[2..];
    let words = data.len() / 2;
    for i in 0..words {
        let word = match (rest.get(2 * i), rest.get(2 * i + 1)) {
            (Some(&hi), Some(&lo)) => u16::from_be_bytes([hi, lo]),
            (Some(&hi), None) => u16::from_be_bytes([hi, 0]),
            _ => 0,
        };
        crc = shift_word(crc, word);
    }

    crc
}

fn shift_word(mut crc: u16, mut word: u16) -> u16 {
    for _ in 0..16 {
        let carry = crc & 0x8000 != 0;
        crc <<= 1;
        if word & 0x8000 != 0 {
            crc |= 1;
        }
        if carry {
            crc ^= POLYNOMIAL;
        }
        word <<= 1;
    }
    crc
}
