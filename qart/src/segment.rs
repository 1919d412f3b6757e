//! Byte-mode and numeric-mode payload segments.
//!
//! ```text
//! Byte:    [0100][count: 8 or 16 bits][8 bits per byte]
//! Numeric: [0001][count: 10/12/14 bits][10 bits per 3 digits][7 or 4 bit tail]
//! ```

use crate::bits::Bits;
use crate::error::{QArtError, Result};
use crate::version::Version;

/// QR encoding modes used by QArt payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Numeric = 0b0001,
    Byte = 0b0100,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Literal bytes in byte mode.
    Raw(String),
    /// Decimal digits in numeric mode.
    Number(String),
}

impl Segment {
    pub fn mode(&self) -> Mode {
        match self {
            Segment::Raw(_) => Mode::Byte,
            Segment::Number(_) => Mode::Numeric,
        }
    }

    /// Reject content the segment cannot represent at `version`.
    pub fn check(&self, version: Version) -> Result<()> {
        let (len, count_bits) = match self {
            Segment::Raw(text) => (text.len(), version.byte_count_bits()),
            Segment::Number(digits) => {
                if let Some(c) = digits.chars().find(|c| !c.is_ascii_digit()) {
                    return Err(QArtError::Segment(format!(
                        "non-digit {c:?} in numeric segment"
                    )));
                }
                (digits.len(), version.numeric_count_bits())
            }
        };
        if len >= 1 << count_bits {
            return Err(QArtError::Segment(format!(
                "{len} characters overflow the {count_bits}-bit count field"
            )));
        }
        Ok(())
    }

    /// Number of bits [`encode`](Self::encode) appends.
    pub fn bit_len(&self, version: Version) -> usize {
        match self {
            Segment::Raw(text) => 4 + version.byte_count_bits() + 8 * text.len(),
            Segment::Number(digits) => {
                let tail = match digits.len() % 3 {
                    0 => 0,
                    1 => 4,
                    _ => 7,
                };
                4 + version.numeric_count_bits() + digits.len() / 3 * 10 + tail
            }
        }
    }

    /// Append the segment to `bits`. Call [`check`](Self::check) first; the
    /// numeric encoder assumes ASCII digits.
    pub fn encode(&self, bits: &mut Bits, version: Version) {
        bits.write(self.mode() as u32, 4);
        match self {
            Segment::Raw(text) => {
                bits.write(text.len() as u32, version.byte_count_bits());
                bits.append(text.as_bytes());
            }
            Segment::Number(digits) => {
                bits.write(digits.len() as u32, version.numeric_count_bits());
                for chunk in digits.as_bytes().chunks(3) {
                    let value = chunk
                        .iter()
                        .fold(0u32, |acc, &d| acc * 10 + u32::from(d - b'0'));
                    let width = match chunk.len() {
                        3 => 10,
                        2 => 7,
                        _ => 4,
                    };
                    bits.write(value, width);
                }
            }
        }
    }
}
