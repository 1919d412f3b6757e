//! Symbol parameters: version, error correction level and mask pattern.
//!
//! Table values follow ISO/IEC 18004:2015 (Tables 1, 9 and Annex E).

use serde::{Deserialize, Serialize};

use crate::error::{QArtError, Result};

/// QR Code error correction levels.
///
/// Higher levels recover more damage but leave fewer data bytes and, for
/// QArt purposes, fewer free bits per block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    /// Low: ~7% error recovery.
    #[default]
    L = 0,
    /// Medium: ~15% error recovery.
    M = 1,
    /// Quartile: ~25% error recovery.
    Q = 2,
    /// High: ~30% error recovery.
    H = 3,
}

impl Level {
    /// 2-bit format indicator (ISO 18004:2015 Table C.1). Not the enum order:
    /// L = 01, M = 00, Q = 11, H = 10.
    pub(crate) fn format_info_bits(self) -> u32 {
        match self {
            Level::L => 0b01,
            Level::M => 0b00,
            Level::Q => 0b11,
            Level::H => 0b10,
        }
    }
}

impl std::str::FromStr for Level {
    type Err = QArtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "L" => Ok(Level::L),
            "M" => Ok(Level::M),
            "Q" => Ok(Level::Q),
            "H" => Ok(Level::H),
            other => Err(QArtError::InvalidConfig(format!(
                "unknown error correction level '{other}'"
            ))),
        }
    }
}

/// A QR version, 1 through 40.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version(u8);

impl Version {
    pub const MIN: Version = Version(1);
    pub const MAX: Version = Version(40);

    pub fn new(version: u8) -> Result<Self> {
        if (1..=40).contains(&version) {
            Ok(Version(version))
        } else {
            Err(QArtError::InvalidConfig(format!(
                "version {version} out of range 1-40"
            )))
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Modules per side.
    pub fn size(self) -> usize {
        self.0 as usize * 4 + 17
    }

    /// Total codewords (data + check) in the symbol.
    pub fn total_bytes(self) -> usize {
        const TOTAL_CODEWORDS: [usize; 40] = [
            26, 44, 70, 100, 134, 172, 196, 242, 292, 346, // 1-10
            404, 466, 532, 581, 655, 733, 815, 901, 991, 1085, // 11-20
            1156, 1258, 1364, 1474, 1588, 1706, 1828, 1921, 2051, 2185, // 21-30
            2323, 2465, 2611, 2761, 2876, 3034, 3196, 3362, 3532, 3706, // 31-40
        ];
        TOTAL_CODEWORDS[self.0 as usize - 1]
    }

    /// Number of data codewords at `level`.
    pub fn data_bytes(self, level: Level) -> usize {
        let (blocks, check) = self.ec_params(level);
        self.total_bytes() - blocks * check
    }

    /// (number of blocks, check bytes per block) at `level`.
    pub fn ec_params(self, level: Level) -> (usize, usize) {
        const PARAMS: [[(usize, usize); 4]; 40] = [
            [(1, 7), (1, 10), (1, 13), (1, 17)],
            [(1, 10), (1, 16), (1, 22), (1, 28)],
            [(1, 15), (1, 26), (2, 18), (2, 22)],
            [(1, 20), (2, 18), (2, 26), (4, 16)],
            [(1, 26), (2, 24), (4, 18), (4, 22)],
            [(2, 18), (4, 16), (4, 24), (4, 28)],
            [(2, 20), (4, 18), (6, 18), (5, 26)],
            [(2, 24), (4, 22), (6, 22), (6, 26)],
            [(2, 30), (5, 22), (8, 20), (8, 24)],
            [(4, 18), (5, 26), (8, 24), (8, 28)],
            [(4, 20), (5, 30), (8, 28), (11, 24)],
            [(4, 24), (8, 22), (10, 26), (11, 28)],
            [(4, 26), (9, 22), (12, 24), (16, 22)],
            [(4, 30), (9, 24), (16, 20), (16, 24)],
            [(6, 22), (10, 24), (12, 30), (18, 24)],
            [(6, 24), (10, 28), (17, 24), (16, 30)],
            [(6, 28), (11, 28), (16, 28), (19, 28)],
            [(6, 30), (13, 26), (18, 28), (21, 28)],
            [(7, 28), (14, 26), (21, 26), (25, 26)],
            [(8, 28), (16, 26), (20, 30), (25, 28)],
            [(8, 28), (17, 26), (23, 28), (25, 30)],
            [(9, 28), (17, 28), (23, 30), (34, 24)],
            [(9, 30), (18, 28), (25, 30), (30, 30)],
            [(10, 30), (20, 28), (27, 30), (32, 30)],
            [(12, 26), (21, 28), (29, 30), (35, 30)],
            [(12, 28), (23, 28), (34, 28), (37, 30)],
            [(12, 30), (25, 28), (34, 30), (40, 30)],
            [(13, 30), (26, 28), (35, 30), (42, 30)],
            [(14, 30), (28, 28), (38, 30), (45, 30)],
            [(15, 30), (29, 28), (40, 30), (48, 30)],
            [(16, 30), (31, 28), (43, 30), (51, 30)],
            [(17, 30), (33, 28), (45, 30), (54, 30)],
            [(18, 30), (35, 28), (48, 30), (57, 30)],
            [(19, 30), (37, 28), (51, 30), (60, 30)],
            [(19, 30), (38, 28), (53, 30), (63, 30)],
            [(20, 30), (40, 28), (56, 30), (66, 30)],
            [(21, 30), (43, 28), (59, 30), (70, 30)],
            [(22, 30), (45, 28), (62, 30), (74, 30)],
            [(24, 30), (47, 28), (65, 30), (77, 30)],
            [(25, 30), (49, 28), (68, 30), (81, 30)],
        ];
        PARAMS[self.0 as usize - 1][level as usize]
    }

    /// Alignment pattern centre coordinates (same list for rows and columns).
    pub(crate) fn alignment_positions(self) -> Vec<usize> {
        let version = self.0 as usize;
        if version == 1 {
            return vec![];
        }

        let count = version / 7 + 2;
        let step = (version * 8 + count * 3 + 5) / (count * 4 - 4) * 2;
        let mut positions: Vec<usize> = (0..count - 1).map(|i| self.size() - 7 - i * step).collect();
        positions.push(6);
        positions.reverse();
        positions
    }

    /// Width of the character count field in byte mode.
    pub(crate) fn byte_count_bits(self) -> usize {
        if self.0 <= 9 { 8 } else { 16 }
    }

    /// Width of the character count field in numeric mode.
    pub(crate) fn numeric_count_bits(self) -> usize {
        match self.0 {
            1..=9 => 10,
            10..=26 => 12,
            _ => 14,
        }
    }

    /// BCH(18,6) version information, for versions 7 and up.
    pub(crate) fn info_bits(self) -> u32 {
        let mut bits = (self.0 as u32) << 12;
        let generator = 0b1111100100101;

        for i in (0..=5).rev() {
            if (bits >> (i + 12)) & 1 == 1 {
                bits ^= generator << i;
            }
        }

        ((self.0 as u32) << 12) | bits
    }
}

/// One of the eight data mask patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Mask(u8);

impl Mask {
    pub fn new(mask: u8) -> Result<Self> {
        if mask < 8 {
            Ok(Mask(mask))
        } else {
            Err(QArtError::InvalidConfig(format!("mask {mask} out of range 0-7")))
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Whether the module at (`row`, `col`) is inverted by this mask.
    ///
    /// - 0: (i + j) mod 2 = 0
    /// - 1: i mod 2 = 0
    /// - 2: j mod 3 = 0
    /// - 3: (i + j) mod 3 = 0
    /// - 4: (i/2 + j/3) mod 2 = 0
    /// - 5: (i*j) mod 2 + (i*j) mod 3 = 0
    /// - 6: ((i*j) mod 2 + (i*j) mod 3) mod 2 = 0
    /// - 7: ((i+j) mod 2 + (i*j) mod 3) mod 2 = 0
    pub(crate) fn inverts(self, row: usize, col: usize) -> bool {
        let i = row;
        let j = col;
        match self.0 {
            0 => (i + j) % 2 == 0,
            1 => i % 2 == 0,
            2 => j % 3 == 0,
            3 => (i + j) % 3 == 0,
            4 => (i / 2 + j / 3) % 2 == 0,
            5 => (i * j) % 2 + (i * j) % 3 == 0,
            6 => ((i * j) % 2 + (i * j) % 3) % 2 == 0,
            _ => ((i + j) % 2 + (i * j) % 3) % 2 == 0,
        }
    }
}

/// BCH(15,5) format information for `level` and `mask`, already XOR'd with
/// 0b101010000010010.
pub(crate) fn format_bits(level: Level, mask: Mask) -> u32 {
    calculate_format_bits((level.format_info_bits() << 3) | mask.0 as u32)
}

fn calculate_format_bits(data: u32) -> u32 {
    let mut bits = data << 10;
    let generator = 0b10100110111;

    for i in (0..=4).rev() {
        if (bits >> (i + 10)) & 1 == 1 {
            bits ^= generator << i;
        }
    }

    ((data << 10) | bits) ^ 0b101010000010010
}
