//! MSB-first bit stream holding data codewords followed by check codewords.
//!
//! The stream is laid out block by block, not interleaved:
//!
//! ```text
//! [block 0 data][block 1 data]...[block n data][block 0 check]...[block n check]
//! ```
//!
//! The [`Plan`](crate::plan::Plan) maps each bit offset of this stream to its
//! module, which is where interleaving happens.

use crate::error::{QArtError, Result};
use crate::gf256::ReedSolomon;
use crate::version::{Level, Version};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bits {
    bytes: Vec<u8>,
    len: usize,
}

impl Bits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits written.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append the low `count` bits of `value`, most significant first.
    pub fn write(&mut self, value: u32, count: usize) {
        for i in (0..count).rev() {
            if self.len % 8 == 0 {
                self.bytes.push(0);
            }
            if (value >> i) & 1 == 1 {
                self.bytes[self.len / 8] |= 0x80 >> (self.len % 8);
            }
            self.len += 1;
        }
    }

    pub fn append(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write(byte as u32, 8);
        }
    }

    pub fn bit(&self, index: usize) -> bool {
        bit_at(&self.bytes, index)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Fill exactly `n` bits: terminator (up to 4 zero bits), zeros to the
    /// next byte boundary, alternating 0xEC / 0x11 pad codewords, then zeros
    /// for any partial byte left over.
    pub fn pad(&mut self, n: usize) {
        let term = n.min(4);
        self.write(0, term);

        let align = ((8 - self.len % 8) % 8).min(n - term);
        self.write(0, align);

        let rest = n - term - align;
        for i in 0..rest / 8 {
            self.write(if i % 2 == 0 { 0xEC } else { 0x11 }, 8);
        }
        self.write(0, rest % 8);
    }

    /// Pad to the data capacity of `version` at `level`, then append the
    /// Reed-Solomon check bytes of every block.
    pub fn add_check_bytes(&mut self, version: Version, level: Level) -> Result<()> {
        let data_bytes = version.data_bytes(level);
        let capacity = data_bytes * 8;
        if self.len > capacity {
            return Err(QArtError::DataOverflow {
                bits: self.len,
                capacity,
            });
        }
        self.pad(capacity - self.len);
        debug_assert_eq!(self.len, capacity);

        let (blocks, check) = version.ec_params(level);
        let rs = ReedSolomon::new(check);
        let short = data_bytes / blocks;
        let long_blocks = data_bytes % blocks;

        let mut offset = 0;
        let mut ecc = Vec::with_capacity(blocks * check);
        for i in 0..blocks {
            let len = short + usize::from(i >= blocks - long_blocks);
            ecc.extend(rs.ecc(&self.bytes[offset..offset + len]));
            offset += len;
        }
        self.append(&ecc);

        debug_assert_eq!(self.bytes.len(), version.total_bytes());
        Ok(())
    }
}

/// Bit `index` of an MSB-first byte slice.
pub(crate) fn bit_at(bytes: &[u8], index: usize) -> bool {
    (bytes[index / 8] >> (7 - index % 8)) & 1 == 1
}
