//! Reading the numeric filler back out of the selected bits.
//!
//! Numeric mode packs three decimal digits into ten bits, so a group can
//! hold 0-1023 but only 0-999 is legal. A group of 1000 or more has its
//! 512, 256, 128, 64 and 32 bits set; clearing the 64 bit (the fourth bit
//! of the group) always brings it under 1000.

use crate::bits::bit_at;

pub const GROUP_BITS: usize = 10;

/// Offset, within a group, of the bit the corrector forces to zero.
pub const CORRECTION_BIT: usize = 3;

/// Decode `groups` ten-bit values starting at bit `head_bits`.
pub fn read_groups(stream: &[u8], head_bits: usize, groups: usize) -> Vec<u16> {
    (0..groups)
        .map(|group| {
            let start = head_bits + group * GROUP_BITS;
            (start..start + GROUP_BITS).fold(0u16, |acc, i| (acc << 1) | u16::from(bit_at(stream, i)))
        })
        .collect()
}

/// Indices of groups whose value is not a valid digit triple.
pub fn overflowed(values: &[u16]) -> impl Iterator<Item = usize> + '_ {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v >= 1000)
        .map(|(i, _)| i)
}

/// Stream offset of the bit to clear in `group`.
pub fn correction_offset(head_bits: usize, group: usize) -> usize {
    head_bits + group * GROUP_BITS + CORRECTION_BIT
}

/// Render group values as decimal digits, three per group. Values above 999
/// are clamped.
pub fn to_digits(values: &[u16]) -> String {
    values
        .iter()
        .map(|&v| format!("{:03}", v.min(999)))
        .collect()
}
