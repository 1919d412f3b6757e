//! Row-wise forward error diffusion over the bound modules.
//!
//! Only the right neighbour receives error (7/16), and only if it is a bound
//! Data/Check module. There is no vertical propagation.

use tracing::debug;

use crate::block::BitBlock;
use crate::plan::Plan;
use crate::select::ModuleInfo;

const THRESHOLD: i32 = 128;

/// Re-choose every bound module by diffusing quantization error along its
/// row, applying each choice with [`BitBlock::reset`]. Returns the number of
/// modules that could not take the dithered value.
pub(crate) fn dither(plan: &Plan, modules: &mut [ModuleInfo], blocks: &mut [BitBlock]) -> usize {
    for info in modules.iter_mut() {
        info.dither_target = i32::from(info.target);
    }

    let mut refused = 0;
    for row in plan.rows() {
        for (x, pixel) in row.iter().enumerate() {
            let Some(offset) = pixel.offset() else {
                continue;
            };
            let info = modules[offset];
            let Some(block) = info.block else {
                continue;
            };

            let target = info.dither_target;
            let black = target < THRESHOLD;
            let mut gray = if black { 0 } else { 255 };
            let mut bit = black ^ info.invert;
            if info.hard_zero && bit {
                bit = false;
                gray ^= 0xff;
            }

            let block = &mut blocks[block];
            if !block.reset(info.bit_index, bit) {
                refused += 1;
                gray = if block.bit(info.bit_index) ^ info.invert { 0 } else { 255 };
            }

            let error = target - gray;
            if let Some(next) = row.get(x + 1).and_then(|p| p.offset()) {
                let next = &mut modules[next];
                if next.is_bound() {
                    next.dither_target += error * 7 / 16;
                }
            }
        }
    }

    debug!(refused, "dithering complete");
    refused
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gf256::ReedSolomon;
    use crate::version::{Level, Mask, Version};

    /// Bind every data bit of a 1-L plan to a single fresh block, with a
    /// uniform target, and dither it.
    fn dithered(target: u8) -> (Plan, Vec<ModuleInfo>, Vec<BitBlock>) {
        let plan = Plan::new(Version::new(1).unwrap(), Level::L, Mask::new(0).unwrap());
        let layout = plan.block_layouts()[0];
        let rs = ReedSolomon::new(layout.check_bytes);
        let data = vec![0u8; layout.data_bytes];
        let mut blocks = vec![BitBlock::new(&data, &rs.ecc(&data), &rs)];

        let mut modules = vec![ModuleInfo::default(); plan.total_bits()];
        for (y, row) in plan.rows().iter().enumerate() {
            for (x, pixel) in row.iter().enumerate() {
                if let Some(offset) = pixel.offset() {
                    modules[offset] = ModuleInfo {
                        x,
                        y,
                        target,
                        invert: pixel.invert(),
                        ..ModuleInfo::default()
                    };
                }
            }
        }
        for i in 0..layout.data_bits() {
            assert!(blocks[0].can_set(i, false));
            modules[i].block = Some(0);
            modules[i].bit_index = i;
        }

        dither(&plan, &mut modules, &mut blocks);
        (plan, modules, blocks)
    }

    fn black_fraction(modules: &[ModuleInfo], blocks: &[BitBlock]) -> f64 {
        let bound: Vec<&ModuleInfo> = modules.iter().filter(|m| m.is_bound()).collect();
        let black = bound
            .iter()
            .filter(|m| blocks[0].bit(m.bit_index) ^ m.invert)
            .count();
        black as f64 / bound.len() as f64
    }

    #[test]
    fn extremes_stay_solid() {
        let (_, modules, blocks) = dithered(0);
        assert_eq!(black_fraction(&modules, &blocks), 1.0);
        let (_, modules, blocks) = dithered(255);
        assert_eq!(black_fraction(&modules, &blocks), 0.0);
    }

    #[test]
    fn mid_tone_mixes_black_and_white() {
        let (_, modules, blocks) = dithered(100);
        let fraction = black_fraction(&modules, &blocks);
        assert!(fraction > 0.3 && fraction < 0.9, "black fraction {}", fraction);
    }

    #[test]
    fn error_moves_right_into_bound_modules_only() {
        let plan = Plan::new(Version::new(1).unwrap(), Level::L, Mask::new(0).unwrap());
        let layout = plan.block_layouts()[0];
        let rs = ReedSolomon::new(layout.check_bytes);
        let data = vec![0u8; layout.data_bytes];
        let mut blocks = vec![BitBlock::new(&data, &rs.ecc(&data), &rs)];
        for i in 0..layout.data_bits() {
            assert!(blocks[0].can_set(i, false));
        }

        // Four adjacent data modules in one row.
        let is_data = |o: Option<usize>| o.is_some_and(|o| o < layout.data_bits());
        let run: Vec<usize> = plan
            .rows()
            .iter()
            .find_map(|row| {
                row.windows(4)
                    .find(|w| w.iter().all(|p| is_data(p.offset())))
                    .map(|w| w.iter().filter_map(|p| p.offset()).collect())
            })
            .unwrap();

        let mut modules = vec![ModuleInfo::default(); plan.total_bits()];
        for (i, &offset) in run.iter().enumerate() {
            modules[offset] = ModuleInfo {
                target: 100,
                block: (i != 2).then_some(0),
                bit_index: offset,
                ..ModuleInfo::default()
            };
        }

        assert_eq!(dither(&plan, &mut modules, &mut blocks), 0);
        let targets: Vec<i32> = run.iter().map(|&o| modules[o].dither_target).collect();
        // 100 -> black, error 100, 700 / 16 = 43 carried right. 143 -> white,
        // error -112 stops at the unbound module.
        assert_eq!(targets, vec![100, 143, 100, 100]);
        assert!(blocks[0].bit(run[0]));
        assert!(!blocks[0].bit(run[1]));
        assert!(blocks[0].bit(run[3]));
        assert!(!modules[run[2]].is_bound());
    }

    #[test]
    fn hard_zero_wins_over_target() {
        let plan = Plan::new(Version::new(1).unwrap(), Level::L, Mask::new(0).unwrap());
        let layout = plan.block_layouts()[0];
        let rs = ReedSolomon::new(layout.check_bytes);
        let data = vec![0u8; layout.data_bytes];
        let mut blocks = vec![BitBlock::new(&data, &rs.ecc(&data), &rs)];
        let mut modules = vec![ModuleInfo::default(); plan.total_bits()];
        modules[5] = ModuleInfo {
            target: 0,
            hard_zero: true,
            block: Some(0),
            bit_index: 5,
            ..ModuleInfo::default()
        };
        assert!(blocks[0].can_set(5, false));

        dither(&plan, &mut modules, &mut blocks);
        assert!(!blocks[0].bit(5));
        assert!(rs.is_codeword(blocks[0].bytes()));
    }
}
