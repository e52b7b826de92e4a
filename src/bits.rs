//! Bitfield helpers for pulling fields out of instruction words.

/// Returns the `width` bits of `word` starting at `start` (bit 0 is the LSB).
#[inline]
pub fn extract_bits(word: u32, start: u32, width: u32) -> u32 {
    if width == 0 {
        return 0;
    }
    let mask = if width >= 32 { u32::MAX } else { (1 << width) - 1 };
    (word >> start) & mask
}

#[inline]
pub fn extract_bit(word: u32, pos: u32) -> u32 {
    (word >> pos) & 1
}

/// Interprets the low `width` bits of `value` as two's complement.
#[inline]
pub fn sign_extend(value: u32, width: u32) -> i32 {
    let shift = 32 - width;
    ((value << shift) as i32) >> shift
}
