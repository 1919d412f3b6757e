//! Per-block freedom tracking over GF(2).
//!
//! Each row of the system is a full Reed-Solomon codeword (data + check
//! bytes). Initially there is one row per data bit: that bit alone in the data
//! region, plus its check bytes. Because the code is linear over XOR, any XOR
//! of rows is again a codeword, so XORing a row into the current bytes keeps
//! the block valid.
//!
//! Pinning bit `b` picks a free row with `b` set as pivot, clears `b` from
//! every other row, and moves the pivot to the pinned set. After that no free
//! row touches `b`, so later pins cannot disturb it.

use crate::bits::bit_at;
use crate::gf256::ReedSolomon;
use crate::plan::BlockLayout;

/// How a constraint on one bit was met.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetBit {
    /// A free row was spent on the bit; it can be flipped later with
    /// [`BitBlock::reset`].
    Pinned,
    /// Earlier pins already fix the bit to the requested value.
    Determined,
    /// Earlier pins fix the bit to the other value.
    Conflict,
}

impl SetBit {
    pub fn is_ok(self) -> bool {
        self != SetBit::Conflict
    }
}

#[derive(Clone, Debug)]
struct Pin {
    bit: usize,
    row: Vec<u8>,
}

/// Constraint state for one Reed-Solomon block.
#[derive(Clone, Debug)]
pub struct BitBlock {
    data_bytes: usize,
    /// Current data + check bytes. Always a valid codeword.
    bytes: Vec<u8>,
    free: Vec<Vec<u8>>,
    pins: Vec<Pin>,
}

fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

impl BitBlock {
    /// Start from an existing codeword `data ++ check`.
    pub fn new(data: &[u8], check: &[u8], rs: &ReedSolomon) -> Self {
        debug_assert_eq!(check.len(), rs.degree());
        let data_bytes = data.len();
        let width = data_bytes + check.len();

        let free = (0..data_bytes * 8)
            .map(|i| {
                let mut row = vec![0u8; width];
                row[i / 8] = 0x80 >> (i % 8);
                let (head, tail) = row.split_at_mut(data_bytes);
                rs.ecc_into(head, tail);
                row
            })
            .collect();

        let mut bytes = Vec::with_capacity(width);
        bytes.extend_from_slice(data);
        bytes.extend_from_slice(check);

        Self {
            data_bytes,
            bytes,
            free,
            pins: Vec::new(),
        }
    }

    /// Load the block described by `layout` out of a data+check stream.
    pub fn from_stream(stream: &[u8], layout: &BlockLayout, rs: &ReedSolomon) -> Self {
        let data = layout.data_offset / 8;
        let check = layout.check_offset / 8;
        Self::new(
            &stream[data..data + layout.data_bytes],
            &stream[check..check + layout.check_bytes],
            rs,
        )
    }

    pub fn data_bytes(&self) -> usize {
        self.data_bytes
    }

    /// Total bits, data then check.
    pub fn bit_count(&self) -> usize {
        self.bytes.len() * 8
    }

    /// Remaining degrees of freedom.
    pub fn free_dimensions(&self) -> usize {
        self.free.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bit(&self, index: usize) -> bool {
        bit_at(&self.bytes, index)
    }

    /// Require bit `index` to equal `value`.
    ///
    /// Returns false only when earlier pins already determine the bit and the
    /// determined value differs.
    pub fn can_set(&mut self, index: usize, value: bool) -> bool {
        self.set(index, value).is_ok()
    }

    /// Like [`can_set`](Self::can_set), but reports whether a degree of
    /// freedom was spent.
    pub fn set(&mut self, index: usize, value: bool) -> SetBit {
        let (byte, mask) = (index / 8, 0x80u8 >> (index % 8));

        let Some(at) = self.free.iter().position(|row| row[byte] & mask != 0) else {
            return if self.bit(index) == value {
                SetBit::Determined
            } else {
                SetBit::Conflict
            };
        };

        let pivot = self.free.swap_remove(at);
        let others = self
            .free
            .iter_mut()
            .chain(self.pins.iter_mut().map(|pin| &mut pin.row));
        for row in others {
            if row[byte] & mask != 0 {
                xor_into(row, &pivot);
            }
        }

        if self.bit(index) != value {
            xor_into(&mut self.bytes, &pivot);
        }
        self.pins.push(Pin {
            bit: index,
            row: pivot,
        });
        SetBit::Pinned
    }

    /// Change a pinned bit to `value` without re-checking feasibility. Other
    /// pins keep their values.
    ///
    /// Returns false if the bit differs from `value` and has no pin of its
    /// own to flip.
    pub fn reset(&mut self, index: usize, value: bool) -> bool {
        if self.bit(index) == value {
            return true;
        }
        match self.pins.iter().find(|pin| pin.bit == index) {
            Some(pin) => {
                xor_into(&mut self.bytes, &pin.row);
                true
            }
            None => false,
        }
    }

    /// Write the current bytes back into the stream at `layout`.
    pub fn copy_out(&self, stream: &mut [u8], layout: &BlockLayout) {
        let (data, check) = self.bytes.split_at(self.data_bytes);
        let d = layout.data_offset / 8;
        let c = layout.check_offset / 8;
        stream[d..d + data.len()].copy_from_slice(data);
        stream[c..c + check.len()].copy_from_slice(check);
    }
}
