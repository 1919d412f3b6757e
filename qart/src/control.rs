//! Map of which modules the engine actually steered.

use crate::code::Code;
#[cfg(feature = "png")]
use crate::error::Result;

const CONTROLLED_BLACK: u8 = 0x00;
const CONTROLLED_WHITE: u8 = 0xff;
const FIXED_BLACK: u8 = 0x3f;
const FIXED_WHITE: u8 = 0xbf;

/// The final symbol, annotated with whether each module was bound to a block
/// during the last pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlMap {
    code: Code,
    controlled: Vec<Vec<bool>>,
}

impl ControlMap {
    pub(crate) fn new(code: Code, controlled: Vec<Vec<bool>>) -> Self {
        debug_assert_eq!(controlled.len(), code.size());
        Self { code, controlled }
    }

    pub fn size(&self) -> usize {
        self.code.size()
    }

    pub fn is_controlled(&self, x: usize, y: usize) -> bool {
        self.controlled[y][x]
    }

    pub fn controlled_count(&self) -> usize {
        self.controlled.iter().flatten().filter(|c| **c).count()
    }

    /// Pure black/white for controlled modules, dark or light gray otherwise.
    pub fn gray(&self, x: usize, y: usize) -> u8 {
        match (self.is_controlled(x, y), self.code.black(x, y)) {
            (true, true) => CONTROLLED_BLACK,
            (true, false) => CONTROLLED_WHITE,
            (false, true) => FIXED_BLACK,
            (false, false) => FIXED_WHITE,
        }
    }

    #[cfg(feature = "png")]
    pub fn to_png(&self, scale: u32, quiet_zone: usize) -> Result<Vec<u8>> {
        use crate::code::{encode_grayscale, fill_square};

        let scale = scale as usize;
        let total_size = (self.size() + 2 * quiet_zone) * scale;
        let mut pixels = vec![CONTROLLED_WHITE; total_size * total_size];

        for y in 0..self.size() {
            for x in 0..self.size() {
                fill_square(
                    &mut pixels,
                    total_size,
                    (x + quiet_zone) * scale,
                    (y + quiet_zone) * scale,
                    scale,
                    self.gray(x, y),
                );
            }
        }

        encode_grayscale(&pixels, total_size)
    }
}
