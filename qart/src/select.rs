//! Greedy, contrast-ordered bit selection for one block.

use std::ops::Range;

use rand::Rng;

use crate::block::{BitBlock, SetBit};
use crate::error::{QArtError, Result};
use crate::plan::BlockLayout;

/// Contrast given to a module once the digit corrector forces it to zero, so
/// it is tried before anything else.
pub const HARD_ZERO_CONTRAST: i32 = i32::MAX >> 8;

/// Working record for one Data/Check module, indexed by stream bit offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ModuleInfo {
    pub x: usize,
    pub y: usize,
    pub target: u8,
    pub contrast: i32,
    pub invert: bool,
    pub dither_target: i32,
    /// Block this bit was pinned in during the current pass.
    pub block: Option<usize>,
    pub bit_index: usize,
    pub hard_zero: bool,
}

impl ModuleInfo {
    /// The bit value that renders this module closest to its target.
    pub fn wanted_bit(&self) -> bool {
        if self.hard_zero {
            return false;
        }
        (self.target < 128) ^ self.invert
    }

    pub fn is_bound(&self) -> bool {
        self.block.is_some()
    }
}

/// Sort key for one editable bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriorityEntry {
    pub offset: usize,
    /// `(contrast << 8) | random byte`.
    pub priority: i64,
}

/// Data bits of `layout` that lie between the end of the header and the end
/// of the digit groups. Bits outside this range must keep their value.
pub(crate) fn editable_range(layout: &BlockLayout, head_bits: usize, main_bits: usize) -> Range<usize> {
    let all = layout.data_bits();
    let lo = head_bits.saturating_sub(layout.data_offset).min(all);
    let hi = main_bits.saturating_sub(layout.data_offset).clamp(lo, all);
    lo..hi
}

/// Priorities for `offsets`, highest first. Equal priorities keep their
/// input order.
pub(crate) fn prioritize<R: Rng>(
    offsets: impl IntoIterator<Item = usize>,
    modules: &[ModuleInfo],
    rng: &mut R,
) -> Vec<PriorityEntry> {
    let mut order: Vec<PriorityEntry> = offsets
        .into_iter()
        .map(|offset| PriorityEntry {
            offset,
            priority: (i64::from(modules[offset].contrast) << 8) | rng.gen_range(0..256i64),
        })
        .collect();
    order.sort_by(|a, b| b.priority.cmp(&a.priority));
    order
}

/// Pin the required bits of one block, then steer its editable bits toward
/// the target in priority order. Returns how many modules were bound.
///
/// A module is bound only when a degree of freedom was spent on it. Bits the
/// code already fixes to the wanted value stay unbound.
pub(crate) fn select_block<R: Rng>(
    block: &mut BitBlock,
    layout: &BlockLayout,
    editable: Range<usize>,
    only_data_bits: bool,
    modules: &mut [ModuleInfo],
    rng: &mut R,
) -> Result<usize> {
    let required = (0..editable.start).chain(editable.end..layout.data_bits());
    for bit in required {
        if !block.can_set(bit, block.bit(bit)) {
            return Err(QArtError::RequiredBit {
                block: layout.index,
                bit,
            });
        }
    }

    let check_bits = if only_data_bits { 0 } else { layout.check_bits() };
    let offsets = editable
        .map(|i| layout.offset_of(i))
        .chain((0..check_bits).map(|i| layout.check_offset + i));
    let order = prioritize(offsets, modules, rng);

    let mut bound = 0;
    for entry in order {
        let info = &mut modules[entry.offset];
        let Some(index) = layout.bit_index(entry.offset) else {
            continue;
        };
        match block.set(index, info.wanted_bit()) {
            SetBit::Pinned => {
                info.block = Some(layout.index);
                info.bit_index = index;
                bound += 1;
            }
            SetBit::Determined => {}
            SetBit::Conflict if info.hard_zero => {
                return Err(QArtError::HardZero {
                    block: layout.index,
                    bit: index,
                });
            }
            SetBit::Conflict => {}
        }
    }

    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gf256::ReedSolomon;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn layout() -> BlockLayout {
        BlockLayout {
            index: 0,
            data_offset: 0,
            data_bytes: 4,
            check_offset: 32,
            check_bytes: 4,
        }
    }

    fn modules(n: usize) -> Vec<ModuleInfo> {
        vec![ModuleInfo::default(); n]
    }

    #[test]
    fn contrast_dominates_priority() {
        let mut modules = modules(4);
        modules[0].contrast = 1;
        modules[1].contrast = 900;
        modules[2].contrast = -1;
        modules[3].contrast = 30;
        let mut rng = Pcg64::seed_from_u64(7);
        let order: Vec<usize> = prioritize(0..4, &modules, &mut rng)
            .iter()
            .map(|e| e.offset)
            .collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn priority_is_reproducible() {
        let modules = modules(64);
        let a = prioritize(0..64, &modules, &mut Pcg64::seed_from_u64(3));
        let b = prioritize(0..64, &modules, &mut Pcg64::seed_from_u64(3));
        assert_eq!(a, b);
        assert!(a.windows(2).all(|w| w[0].priority >= w[1].priority));
        assert!(a.iter().all(|e| (0..256).contains(&e.priority)));
    }

    #[test]
    fn editable_range_clips_to_block() {
        let block = BlockLayout {
            index: 1,
            data_offset: 80,
            data_bytes: 10,
            check_offset: 400,
            check_bytes: 4,
        };
        // Header ends before the block, groups end inside it.
        assert_eq!(editable_range(&block, 40, 120), 0..40);
        // Header ends inside, groups run past the end.
        assert_eq!(editable_range(&block, 100, 500), 20..80);
        // Everything before the block.
        assert_eq!(editable_range(&block, 30, 60), 0..0);
        // Header past the block entirely.
        assert_eq!(editable_range(&block, 200, 210), 80..80);
    }

    #[test]
    fn wanted_bit_honours_invert_and_hard_zero() {
        let mut info = ModuleInfo {
            target: 10,
            ..ModuleInfo::default()
        };
        assert!(info.wanted_bit());
        info.invert = true;
        assert!(!info.wanted_bit());
        info.target = 200;
        assert!(info.wanted_bit());
        info.hard_zero = true;
        assert!(!info.wanted_bit());
    }

    #[test]
    fn selection_preserves_required_bits_and_binds_targets() {
        let rs = ReedSolomon::new(4);
        let data = [0xDE, 0xAD, 0xBE, 0xEF];
        let mut block = BitBlock::new(&data, &rs.ecc(&data), &rs);
        let mut modules = modules(64);
        for info in modules.iter_mut() {
            info.target = 0;
            info.contrast = 5;
        }

        let bound = select_block(
            &mut block,
            &layout(),
            8..24,
            true,
            &mut modules,
            &mut Pcg64::seed_from_u64(1),
        )
        .unwrap();

        assert_eq!(bound, 16);
        assert_eq!(block.bytes()[0], 0xDE);
        assert_eq!(block.bytes()[1], 0xFF);
        assert_eq!(block.bytes()[2], 0xFF);
        assert_eq!(block.bytes()[3], 0xEF);
        assert!(rs.is_codeword(block.bytes()));
        assert!(modules[8..24].iter().all(ModuleInfo::is_bound));
        assert!(!modules[0].is_bound());
        assert_eq!(modules[9].bit_index, 9);
    }

    #[test]
    fn check_bits_fill_remaining_freedom() {
        let rs = ReedSolomon::new(4);
        let data = [0; 4];
        let mut block = BitBlock::new(&data, &rs.ecc(&data), &rs);
        let mut modules = modules(64);

        let bound = select_block(
            &mut block,
            &layout(),
            0..32,
            false,
            &mut modules,
            &mut Pcg64::seed_from_u64(1),
        )
        .unwrap();

        // One bound module per degree of freedom.
        assert_eq!(bound, 32);
        assert_eq!(modules.iter().filter(|m| m.is_bound()).count(), 32);
        assert_eq!(block.free_dimensions(), 0);
        assert!(rs.is_codeword(block.bytes()));
    }

    #[test]
    fn hard_zero_on_determined_one_fails() {
        let rs = ReedSolomon::new(4);
        let data = [0x12, 0x34, 0x56, 0x78];
        let mut block = BitBlock::new(&data, &rs.ecc(&data), &rs);
        // Every data bit is required, so the check bits are fixed.
        let one = (32..64).find(|&i| block.bit(i)).unwrap();
        let mut modules = modules(64);
        modules[one].hard_zero = true;

        let err = select_block(
            &mut block,
            &layout(),
            0..0,
            false,
            &mut modules,
            &mut Pcg64::seed_from_u64(1),
        )
        .unwrap_err();
        assert!(matches!(err, QArtError::HardZero { block: 0, bit } if bit == one));
    }

    #[test]
    fn hard_zero_on_determined_zero_is_accepted() {
        let rs = ReedSolomon::new(4);
        let data = [0x12, 0x34, 0x56, 0x78];
        let mut block = BitBlock::new(&data, &rs.ecc(&data), &rs);
        let zero = (32..64).find(|&i| !block.bit(i)).unwrap();
        let mut modules = modules(64);
        modules[zero].hard_zero = true;

        let bound = select_block(
            &mut block,
            &layout(),
            0..0,
            false,
            &mut modules,
            &mut Pcg64::seed_from_u64(1),
        )
        .unwrap();
        assert_eq!(bound, 0);
        assert!(!modules[zero].is_bound());
        assert!(!block.bit(zero));
    }
}
