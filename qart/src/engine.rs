//! The encoder: sample the target, run selection passes, correct digit
//! overflow, and build the final symbol.
//!
//! ```text
//!   Encoding ──(no overflow)──> Done
//!      ^  │
//!      │  └──(overflowed groups)──> Correcting
//!      └────────────────────────────────┘
//! ```
//!
//! Each Encoding pass rebuilds the payload with an all-zero digit filler,
//! loads one [`BitBlock`] per Reed-Solomon block, pins the header and padding
//! bits, then steers the editable bits toward the target. Correcting marks
//! one bit of every overflowed digit group as hard zero; those marks persist
//! across passes, so each pass fixes at least one more group.

use std::path::Path;

use image::DynamicImage;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tracing::{debug, info};

use crate::block::BitBlock;
use crate::code::Code;
use crate::config::Config;
use crate::control::ControlMap;
use crate::digits;
use crate::dither::dither;
use crate::error::{QArtError, Result};
use crate::gf256::ReedSolomon;
use crate::plan::{BlockLayout, Plan};
use crate::segment::Segment;
use crate::select::{HARD_ZERO_CONTRAST, ModuleInfo, editable_range, select_block};
use crate::target::Target;
use crate::version::{Level, Mask, Version};

/// How the payload splits the data region of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    /// Bits taken by the byte-mode header and the empty numeric segment.
    pub head_bits: usize,
    /// Data region size in bits.
    pub data_bits: usize,
    /// Ten-bit digit groups that fit after the header.
    pub groups: usize,
}

impl Capacity {
    /// Lay out `header` (the URL plus `#`) in `version` at `level`.
    pub fn new(header: &str, version: Version, level: Level) -> Result<Self> {
        let raw = Segment::Raw(header.to_string());
        let head_bits = raw.bit_len(version) + Segment::Number(String::new()).bit_len(version);
        let data_bits = version.data_bytes(level) * 8;
        if head_bits > data_bits {
            return Err(QArtError::HeaderOverflow {
                needed: head_bits,
                available: data_bits,
            });
        }
        raw.check(version)?;

        Ok(Self {
            head_bits,
            data_bits,
            groups: (data_bits - head_bits) / digits::GROUP_BITS,
        })
    }

    pub fn for_config(config: &Config) -> Result<Self> {
        Self::new(&config.header(), Version::new(config.version)?, config.level)
    }

    /// End of the last digit group.
    pub fn main_bits(&self) -> usize {
        self.head_bits + self.groups * digits::GROUP_BITS
    }

    pub fn digits(&self) -> usize {
        self.groups * 3
    }

    /// Data bits left for the terminator and padding.
    pub fn spare_bits(&self) -> usize {
        self.data_bits - self.main_bits()
    }
}

/// Result of a successful encode.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub code: Code,
    /// The (rotated) layout the code was rendered from.
    pub plan: Plan,
    /// Full decoded payload: URL, `#`, digits.
    pub payload: String,
    pub digits: String,
    pub capacity: Capacity,
    /// Selection passes run, including the final one.
    pub passes: usize,
    /// Hard-zero corrections applied.
    pub corrections: usize,
    /// Modules the final pass bound to a block.
    pub bound: usize,
    pub control: Option<ControlMap>,
}

/// State of the correction loop.
#[derive(Debug)]
enum Phase {
    Encoding,
    Correcting(Vec<usize>),
    Done(PassOutput),
}

#[derive(Debug)]
struct PassOutput {
    stream: Vec<u8>,
    values: Vec<u16>,
    bound: usize,
}

/// A configured encoder holding its resized target.
#[derive(Debug, Clone)]
pub struct QArt {
    config: Config,
    target: Target,
}

impl QArt {
    pub fn new(config: Config, target: Target) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, target })
    }

    /// Load the target from an image file.
    pub fn open(config: Config, path: impl AsRef<Path>) -> Result<Self> {
        config.validate()?;
        let target = Target::open(path, config.target_size())?;
        Ok(Self { config, target })
    }

    pub fn from_image(config: Config, image: &DynamicImage) -> Result<Self> {
        config.validate()?;
        let target = Target::from_image(image, config.target_size());
        Ok(Self { config, target })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn encode(&self) -> Result<Encoded> {
        let config = &self.config;
        let version = Version::new(config.version)?;
        let header = config.header();
        let capacity = Capacity::new(&header, version, config.level)?;

        let mut plan = Plan::new(version, config.level, Mask::new(config.mask)?);
        plan.rotate(config.rotation);

        let mut rng = Pcg64::seed_from_u64(config.seed);
        let mut modules = self.sample_modules(&plan, &mut rng);
        let layouts = plan.block_layouts();
        let rs = ReedSolomon::new(layouts[0].check_bytes);

        debug!(
            version = version.number(),
            head_bits = capacity.head_bits,
            groups = capacity.groups,
            blocks = layouts.len(),
            "starting selection"
        );

        let mut passes = 0;
        let mut corrections = 0;
        let mut phase = Phase::Encoding;
        let output = loop {
            phase = match phase {
                Phase::Encoding => {
                    if passes > capacity.groups {
                        return Err(QArtError::CorrectionDiverged { passes });
                    }
                    passes += 1;

                    let output =
                        self.run_pass(&plan, &header, &capacity, &layouts, &rs, &mut modules, &mut rng)?;
                    let overflowed: Vec<usize> = digits::overflowed(&output.values).collect();
                    debug!(
                        pass = passes,
                        bound = output.bound,
                        overflowed = overflowed.len(),
                        "selection pass"
                    );

                    if overflowed.is_empty() {
                        Phase::Done(output)
                    } else {
                        Phase::Correcting(overflowed)
                    }
                }
                Phase::Correcting(groups) => {
                    for group in groups {
                        let offset = digits::correction_offset(capacity.head_bits, group);
                        debug!(group, offset, "digit group overflow");
                        let info = &mut modules[offset];
                        info.hard_zero = true;
                        info.contrast = HARD_ZERO_CONTRAST;
                        corrections += 1;
                    }
                    Phase::Encoding
                }
                Phase::Done(output) => break output,
            };
        };

        let digits = digits::to_digits(&output.values);
        let segments = [Segment::Raw(header.clone()), Segment::Number(digits.clone())];
        let bits = plan.codewords(&segments)?;
        if bits.bytes() != output.stream.as_slice() {
            return Err(QArtError::CodewordMismatch);
        }
        let code = plan.render(bits.bytes());

        let control = config.save_control.then(|| {
            let controlled = plan
                .rows()
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|pixel| pixel.offset().is_some_and(|o| modules[o].is_bound()))
                        .collect()
                })
                .collect();
            ControlMap::new(code.clone(), controlled)
        });

        info!(
            passes,
            corrections,
            bound = output.bound,
            digits = digits.len(),
            "encoded QR code"
        );

        Ok(Encoded {
            code,
            plan,
            payload: format!("{header}{digits}"),
            digits,
            capacity,
            passes,
            corrections,
            bound: output.bound,
            control,
        })
    }

    /// Build the per-offset working records. Randomized contrast draws from
    /// `rng` in grid order, before any priority is drawn.
    fn sample_modules(&self, plan: &Plan, rng: &mut Pcg64) -> Vec<ModuleInfo> {
        let (dx, dy) = (i64::from(self.config.dx), i64::from(self.config.dy));
        let mut modules = vec![ModuleInfo::default(); plan.total_bits()];

        for (y, row) in plan.rows().iter().enumerate() {
            for (x, pixel) in row.iter().enumerate() {
                let mut sample = self.target.sample(x as i64 + dx, y as i64 + dy);
                if self.config.rand_control && sample.contrast >= 0 {
                    let stripe = 64 * ((x + y) % 2) + 64 * ((x + y) % 3 % 2);
                    sample.contrast = rng.gen_range(0..128) + stripe as i32;
                }
                if let Some(offset) = pixel.offset() {
                    modules[offset] = ModuleInfo {
                        x,
                        y,
                        target: sample.target,
                        contrast: sample.contrast,
                        invert: pixel.invert(),
                        ..ModuleInfo::default()
                    };
                }
            }
        }

        modules
    }

    /// One Encoding pass. Block bindings are rebuilt; hard-zero marks and
    /// raised contrast carry over.
    #[allow(clippy::too_many_arguments)]
    fn run_pass(
        &self,
        plan: &Plan,
        header: &str,
        capacity: &Capacity,
        layouts: &[BlockLayout],
        rs: &ReedSolomon,
        modules: &mut [ModuleInfo],
        rng: &mut Pcg64,
    ) -> Result<PassOutput> {
        let filler = "0".repeat(capacity.digits());
        let mut stream = plan
            .codewords(&[Segment::Raw(header.to_string()), Segment::Number(filler)])?
            .into_bytes();

        for info in modules.iter_mut() {
            info.block = None;
        }

        let mut blocks = Vec::with_capacity(layouts.len());
        let mut bound = 0;
        for layout in layouts {
            let mut block = BitBlock::from_stream(&stream, layout, rs);
            let editable = editable_range(layout, capacity.head_bits, capacity.main_bits());
            bound += select_block(
                &mut block,
                layout,
                editable,
                self.config.only_data_bits,
                modules,
                rng,
            )?;
            block.copy_out(&mut stream, layout);
            blocks.push(block);
        }

        if self.config.dither {
            dither(plan, modules, &mut blocks);
            for (block, layout) in blocks.iter().zip(layouts) {
                block.copy_out(&mut stream, layout);
            }
        }

        let values = digits::read_groups(&stream, capacity.head_bits, capacity.groups);
        Ok(PassOutput {
            stream,
            values,
            bound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::bit_at;
    use crate::plan::{Role, Rotation};

    /// A dark disc on a light background, one pixel per module.
    fn disc(size: usize) -> Target {
        let c = size as i64 / 2;
        let r2 = (size as i64 / 3).pow(2);
        let luma = (0..size * size)
            .map(|i| {
                let (x, y) = ((i % size) as i64, (i / size) as i64);
                if (x - c).pow(2) + (y - c).pow(2) < r2 { 20 } else { 235 }
            })
            .collect();
        Target::from_luma(size, size, luma)
    }

    /// Left-to-right ramp from black to white.
    fn ramp(size: usize) -> Target {
        let luma = (0..size * size).map(|i| ((i % size) * 255 / size) as i32).collect();
        Target::from_luma(size, size, luma)
    }

    fn config(version: u8) -> Config {
        Config {
            url: "https://qart.test/".into(),
            version,
            save_control: true,
            ..Config::default()
        }
    }

    fn encode(config: Config) -> Result<Encoded> {
        let size = config.target_size() as usize;
        QArt::new(config, disc(size))?.encode()
    }

    fn assert_valid_blocks(encoded: &Encoded) {
        let stream = encoded.plan.read_codewords(&encoded.code);
        for layout in encoded.plan.block_layouts() {
            let rs = ReedSolomon::new(layout.check_bytes);
            let block = BitBlock::from_stream(&stream, &layout, &rs);
            assert!(rs.is_codeword(block.bytes()), "block {} invalid", layout.index);
        }
    }

    /// Parse the byte-mode header and numeric digits back out of the symbol.
    fn decode_payload(encoded: &Encoded) -> String {
        let stream = encoded.plan.read_codewords(&encoded.code);
        let version = encoded.plan.version();
        let mut pos = 0;
        let mut read = |n: usize| {
            let v = (pos..pos + n).fold(0usize, |acc, i| (acc << 1) | usize::from(bit_at(&stream, i)));
            pos += n;
            v
        };

        assert_eq!(read(4), 0b0100);
        let len = read(version.byte_count_bits());
        let mut payload: String = (0..len).map(|_| read(8) as u8 as char).collect();

        assert_eq!(read(4), 0b0001);
        let count = read(version.numeric_count_bits());
        for _ in 0..count / 3 {
            let v = read(10);
            assert!(v < 1000, "group value {}", v);
            payload.push_str(&format!("{:03}", v));
        }
        assert_eq!(count % 3, 0);
        payload
    }

    #[test]
    fn same_seed_same_code() {
        let a = encode(config(4)).unwrap();
        let b = encode(config(4)).unwrap();
        assert_eq!(a.code, b.code);
        assert_eq!(a.digits, b.digits);

        let noisy = Config {
            rand_control: true,
            seed: 42,
            ..config(4)
        };
        let c = encode(noisy.clone()).unwrap();
        let d = encode(noisy).unwrap();
        assert_eq!(c.code, d.code);
    }

    #[test]
    fn every_block_is_a_codeword() {
        for (version, level) in [(3, Level::L), (5, Level::Q), (7, Level::M)] {
            let encoded = encode(Config { level, ..config(version) }).unwrap();
            assert_valid_blocks(&encoded);
        }
    }

    #[test]
    fn payload_decodes_from_symbol() {
        let encoded = encode(config(6)).unwrap();
        assert_eq!(decode_payload(&encoded), encoded.payload);
        assert!(encoded.payload.starts_with("https://qart.test/#"));
        assert_eq!(encoded.digits.len(), encoded.capacity.digits());
        assert!(encoded.passes <= encoded.capacity.groups + 1);
    }

    #[test]
    fn steered_modules_follow_target() {
        let encoded = encode(config(6)).unwrap();
        let control = encoded.control.as_ref().unwrap();
        assert!(control.controlled_count() > 0);
        assert_eq!(control.controlled_count(), encoded.bound);

        let target = disc(encoded.code.size());
        let mut matches = 0;
        for y in 0..encoded.code.size() {
            for x in 0..encoded.code.size() {
                if control.is_controlled(x, y) {
                    let want_black = target.sample(x as i64, y as i64).target < 128;
                    matches += usize::from(encoded.code.black(x, y) == want_black);
                }
            }
        }
        // Only hard-zero modules may disagree.
        assert!(encoded.bound - matches <= encoded.corrections);
    }

    #[test]
    fn bound_modules_never_exceed_freedom() {
        let config = config(6);
        let size = config.target_size() as usize;
        // Vertical stripes: high contrast everywhere.
        let stripes = |size: usize| {
            let luma = (0..size * size).map(|i| if i % size % 2 == 0 { 0 } else { 255 }).collect();
            Target::from_luma(size, size, luma)
        };

        for only_data_bits in [true, false] {
            let config = Config {
                only_data_bits,
                ..config.clone()
            };
            let encoded = QArt::new(config, stripes(size)).unwrap().encode().unwrap();
            let free = encoded.capacity.groups * 10;
            assert!(encoded.bound <= free, "{} bound, {} free", encoded.bound, free);
            let control = encoded.control.as_ref().unwrap();
            assert_eq!(control.controlled_count(), encoded.bound);
            assert_valid_blocks(&encoded);
        }
    }

    #[test]
    fn header_fills_data_region() {
        // 1-L holds 152 data bits. A 15 byte header takes 12 + 120 + 14 = 146,
        // leaving 6 bits: no digit group fits.
        let config = Config {
            url: "https://qa.rt/".into(),
            ..config(1)
        };
        let encoded = encode(config).unwrap();
        assert_eq!(encoded.capacity.groups, 0);
        assert_eq!(encoded.capacity.spare_bits(), 6);
        assert_eq!(encoded.digits, "");
        assert_eq!(encoded.passes, 1);
        assert_eq!(decode_payload(&encoded), "https://qa.rt/#");
        assert_valid_blocks(&encoded);
    }

    #[test]
    fn mid_gray_renders_white() {
        let config = config(5);
        let size = config.target_size() as usize;
        let encoded = QArt::new(config, Target::from_luma(size, size, vec![128; size * size]))
            .unwrap()
            .encode()
            .unwrap();
        let control = encoded.control.as_ref().unwrap();

        let mut black = 0;
        for y in 0..encoded.code.size() {
            for x in 0..encoded.code.size() {
                if control.is_controlled(x, y) && encoded.code.black(x, y) {
                    black += 1;
                }
            }
        }
        assert!(black <= encoded.corrections, "{} bound modules black", black);
    }

    #[test]
    fn long_url_overflows_header() {
        let config = Config {
            url: "https://example.com/a/rather/long/path".into(),
            ..config(1)
        };
        let err = encode(config).unwrap_err();
        assert!(matches!(err, QArtError::HeaderOverflow { available: 152, .. }), "{}", err);
    }

    #[test]
    fn all_ones_target_is_corrected() {
        let version = Version::new(3).unwrap();
        let plan = Plan::new(version, Level::L, Mask::new(2).unwrap());
        let n = plan.size();
        // Every data bit wants to be 1.
        let luma = (0..n * n)
            .map(|i| if plan.pixel(i % n, i / n).invert() { 255 } else { 0 })
            .collect();
        let config = Config {
            only_data_bits: true,
            ..config(3)
        };

        let encoded = QArt::new(config, Target::from_luma(n, n, luma))
            .unwrap()
            .encode()
            .unwrap();

        let groups = encoded.capacity.groups;
        assert!(groups > 0);
        assert_eq!(encoded.corrections, groups);
        assert_eq!(encoded.passes, 2);
        assert_eq!(encoded.digits, "959".repeat(groups));
        assert_eq!(decode_payload(&encoded), encoded.payload);
        assert_valid_blocks(&encoded);
    }

    #[test]
    fn overflow_with_check_bits_settles() {
        let version = Version::new(4).unwrap();
        let plan = Plan::new(version, Level::L, Mask::new(2).unwrap());
        let n = plan.size();
        let luma = (0..n * n)
            .map(|i| if plan.pixel(i % n, i / n).invert() { 255 } else { 0 })
            .collect();

        let encoded = QArt::new(config(4), Target::from_luma(n, n, luma))
            .unwrap()
            .encode()
            .unwrap();

        assert!(encoded.corrections >= 1);
        assert!(encoded.passes <= encoded.capacity.groups + 1);
        assert_eq!(decode_payload(&encoded), encoded.payload);
        assert_valid_blocks(&encoded);
    }

    #[test]
    fn dithering_keeps_symbol_valid() {
        let config = config(6);
        let size = config.target_size() as usize;
        let plain = QArt::new(config.clone(), ramp(size)).unwrap().encode().unwrap();
        let dithered = QArt::new(Config { dither: true, ..config }, ramp(size))
            .unwrap()
            .encode()
            .unwrap();

        assert_ne!(plain.code, dithered.code);
        assert_eq!(decode_payload(&dithered), dithered.payload);
        assert_valid_blocks(&dithered);
    }

    #[test]
    fn rotation_moves_function_patterns() {
        let encoded = encode(Config {
            rotation: Rotation::R90,
            ..config(2)
        })
        .unwrap();
        let n = encoded.code.size();
        assert_eq!(encoded.plan.pixel(n - 1, n - 1).role(), Role::Function);
        assert_ne!(encoded.plan.pixel(n - 1, 0).role(), Role::Function);
        assert_valid_blocks(&encoded);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = Config {
            mask: 9,
            ..config(2)
        };
        assert!(matches!(
            QArt::new(config, disc(25)),
            Err(QArtError::InvalidConfig(_))
        ));
    }
}
