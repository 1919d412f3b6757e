//! Module layout: which cell of the symbol carries which bit.
//!
//! A [`Plan`] is built once per (version, level, mask). Every cell is either a
//! fixed function module (finder, separator, timing, alignment, format,
//! version, dark module), a data or check module tied to one bit offset of
//! the [`Bits`](crate::bits::Bits) stream, or a remainder module.
//!
//! ```text
//!     Codeword placement: 2-column strips, bottom-right to top-left,
//!     alternating up/down, skipping the vertical timing column.
//!
//!     |8 |7 |6 |5 |4 |3 |2 |1 |  <- bit order within a strip pair
//!     v  ^  v  ^  v  ^  v  ^
//! ```
//!
//! Data codewords are interleaved across blocks (first byte of every block,
//! then the second byte, ...), followed by the interleaved check codewords.

use serde::{Deserialize, Serialize};

use crate::bits::{Bits, bit_at};
use crate::code::Code;
use crate::error::{QArtError, Result};
use crate::segment::Segment;
use crate::version::{Level, Mask, Version, format_bits};

/// What a module is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Finder, timing, alignment, format, version or dark module.
    Function,
    /// One bit of a data codeword.
    Data,
    /// One bit of a check codeword.
    Check,
    /// Remainder module after the last codeword.
    Other,
}

impl Role {
    pub fn carries_data(self) -> bool {
        matches!(self, Role::Data | Role::Check)
    }
}

/// One cell of the plan.
///
/// For Data/Check modules `black` is the colour of a zero bit, i.e. equal to
/// `invert`; the rendered colour is `black ^ bit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pixel {
    role: Role,
    black: bool,
    invert: bool,
    offset: usize,
}

impl Pixel {
    const UNSET: Pixel = Pixel {
        role: Role::Other,
        black: false,
        invert: false,
        offset: 0,
    };

    fn function(black: bool) -> Self {
        Pixel {
            role: Role::Function,
            black,
            invert: false,
            offset: 0,
        }
    }

    fn codeword(role: Role, offset: usize) -> Self {
        Pixel {
            role,
            black: false,
            invert: false,
            offset,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Colour of the module before any codeword bit is applied.
    pub fn black(&self) -> bool {
        self.black
    }

    /// Whether the mask inverts this module.
    pub fn invert(&self) -> bool {
        self.invert
    }

    /// Bit offset into the data+check stream, for Data/Check modules.
    pub fn offset(&self) -> Option<usize> {
        self.role.carries_data().then_some(self.offset)
    }
}

/// Quarter-turn rotation applied to the module grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn from_quarter_turns(turns: u8) -> Result<Self> {
        match turns {
            0 => Ok(Rotation::R0),
            1 => Ok(Rotation::R90),
            2 => Ok(Rotation::R180),
            3 => Ok(Rotation::R270),
            _ => Err(QArtError::InvalidConfig(format!(
                "rotation {turns} out of range 0-3"
            ))),
        }
    }

    pub fn quarter_turns(self) -> u8 {
        self as u8
    }

    pub fn inverse(self) -> Self {
        match self {
            Rotation::R0 => Rotation::R0,
            Rotation::R90 => Rotation::R270,
            Rotation::R180 => Rotation::R180,
            Rotation::R270 => Rotation::R90,
        }
    }
}

/// Geometry of one Reed-Solomon block inside the bit stream.
///
/// Offsets are absolute bit offsets into the stream. Within the block, bit
/// indices `0..data_bytes*8` are data bits and the following
/// `check_bytes*8` indices are check bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockLayout {
    pub index: usize,
    pub data_offset: usize,
    pub data_bytes: usize,
    pub check_offset: usize,
    pub check_bytes: usize,
}

impl BlockLayout {
    pub fn data_bits(&self) -> usize {
        self.data_bytes * 8
    }

    pub fn check_bits(&self) -> usize {
        self.check_bytes * 8
    }

    /// Block-relative index of stream offset `offset`, if it belongs here.
    pub fn bit_index(&self, offset: usize) -> Option<usize> {
        if (self.data_offset..self.data_offset + self.data_bits()).contains(&offset) {
            Some(offset - self.data_offset)
        } else if (self.check_offset..self.check_offset + self.check_bits()).contains(&offset) {
            Some(offset - self.check_offset + self.data_bits())
        } else {
            None
        }
    }

    /// Stream offset of block-relative bit `index`.
    pub fn offset_of(&self, index: usize) -> usize {
        if index < self.data_bits() {
            self.data_offset + index
        } else {
            self.check_offset + index - self.data_bits()
        }
    }
}

/// The module layout for one (version, level, mask).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    version: Version,
    level: Level,
    mask: Mask,
    data_bytes: usize,
    check_bytes: usize,
    blocks: usize,
    /// Indexed `[y][x]`.
    pixels: Vec<Vec<Pixel>>,
}

impl Plan {
    pub fn new(version: Version, level: Level, mask: Mask) -> Self {
        let size = version.size();
        let (blocks, check_per_block) = version.ec_params(level);

        let mut plan = Self {
            version,
            level,
            mask,
            data_bytes: version.data_bytes(level),
            check_bytes: blocks * check_per_block,
            blocks,
            pixels: vec![vec![Pixel::UNSET; size]; size],
        };

        plan.place_finder_patterns();
        plan.place_alignment_patterns();
        plan.place_timing_patterns();
        plan.place_format_info();
        plan.set_function(size - 8, 8, true); // dark module
        if version.number() >= 7 {
            plan.place_version_info();
        }
        plan.place_codewords();
        plan.apply_mask();

        plan
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn mask(&self) -> Mask {
        self.mask
    }

    pub fn size(&self) -> usize {
        self.pixels.len()
    }

    pub fn data_bytes(&self) -> usize {
        self.data_bytes
    }

    pub fn check_bytes(&self) -> usize {
        self.check_bytes
    }

    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Length of the data+check stream in bits.
    pub fn total_bits(&self) -> usize {
        (self.data_bytes + self.check_bytes) * 8
    }

    pub fn pixel(&self, x: usize, y: usize) -> Pixel {
        self.pixels[y][x]
    }

    pub fn rows(&self) -> &[Vec<Pixel>] {
        &self.pixels
    }

    /// Block geometry. The last `data_bytes % blocks` blocks carry one extra
    /// data byte.
    pub fn block_layouts(&self) -> Vec<BlockLayout> {
        let short = self.data_bytes / self.blocks;
        let long_blocks = self.data_bytes % self.blocks;
        let check_per_block = self.check_bytes / self.blocks;

        let mut data_offset = 0;
        (0..self.blocks)
            .map(|index| {
                let data_bytes = short + usize::from(index >= self.blocks - long_blocks);
                let layout = BlockLayout {
                    index,
                    data_offset,
                    data_bytes,
                    check_offset: (self.data_bytes + index * check_per_block) * 8,
                    check_bytes: check_per_block,
                };
                data_offset += data_bytes * 8;
                layout
            })
            .collect()
    }

    /// Remap the grid by a quarter-turn rotation. Values are untouched.
    pub fn rotate(&mut self, rotation: Rotation) {
        let n = self.size();
        let src = &self.pixels;
        let pick: fn(&[Vec<Pixel>], usize, usize, usize) -> Pixel = match rotation {
            Rotation::R0 => return,
            Rotation::R90 => |s, n, x, y| s[x][n - 1 - y],
            Rotation::R180 => |s, n, x, y| s[n - 1 - y][n - 1 - x],
            Rotation::R270 => |s, n, x, y| s[n - 1 - x][y],
        };

        let rotated = (0..n)
            .map(|y| (0..n).map(|x| pick(src, n, x, y)).collect())
            .collect();
        self.pixels = rotated;
    }

    /// Encode `segments`, pad, and append check bytes.
    pub fn codewords(&self, segments: &[Segment]) -> Result<Bits> {
        let mut bits = Bits::new();
        for segment in segments {
            segment.check(self.version)?;
            segment.encode(&mut bits, self.version);
        }
        bits.add_check_bytes(self.version, self.level)?;
        Ok(bits)
    }

    /// Build the final symbol for `segments`.
    pub fn encode(&self, segments: &[Segment]) -> Result<Code> {
        let bits = self.codewords(segments)?;
        Ok(self.render(bits.bytes()))
    }

    /// Rasterize a complete data+check stream onto the grid.
    pub fn render(&self, stream: &[u8]) -> Code {
        let modules = self
            .pixels
            .iter()
            .map(|row| {
                row.iter()
                    .map(|pixel| match pixel.offset() {
                        Some(offset) => pixel.black ^ bit_at(stream, offset),
                        None => pixel.black,
                    })
                    .collect()
            })
            .collect();
        Code::from_modules(modules)
    }

    /// Read the data+check stream back out of a rendered symbol.
    pub fn read_codewords(&self, code: &Code) -> Vec<u8> {
        let mut stream = vec![0u8; self.data_bytes + self.check_bytes];
        for (y, row) in self.pixels.iter().enumerate() {
            for (x, pixel) in row.iter().enumerate() {
                if let Some(offset) = pixel.offset() {
                    if code.black(x, y) ^ pixel.invert {
                        stream[offset / 8] |= 0x80 >> (offset % 8);
                    }
                }
            }
        }
        stream
    }

    fn set_function(&mut self, row: usize, col: usize, black: bool) {
        self.pixels[row][col] = Pixel::function(black);
    }

    fn is_function(&self, row: usize, col: usize) -> bool {
        self.pixels[row][col].role == Role::Function
    }

    /// Three 7x7 finders, each with its white separator.
    ///
    /// ```text
    /// #######
    /// #.....#
    /// #.###.#
    /// #.###.#
    /// #.###.#
    /// #.....#
    /// #######
    /// ```
    fn place_finder_patterns(&mut self) {
        let size = self.size() as isize;
        for (top, left) in [(0, 0), (size - 7, 0), (0, size - 7)] {
            for dr in -1..=7isize {
                for dc in -1..=7isize {
                    let (r, c) = (top + dr, left + dc);
                    if r < 0 || r >= size || c < 0 || c >= size {
                        continue;
                    }
                    let inside = (0..=6).contains(&dr) && (0..=6).contains(&dc);
                    let is_edge = dr == 0 || dr == 6 || dc == 0 || dc == 6;
                    let is_center = (2..=4).contains(&dr) && (2..=4).contains(&dc);
                    self.set_function(r as usize, c as usize, inside && (is_edge || is_center));
                }
            }
        }
    }

    /// 5x5 alignment patterns at every pair of centre coordinates that does
    /// not collide with a finder.
    fn place_alignment_patterns(&mut self) {
        let positions = self.version.alignment_positions();
        for &row in &positions {
            for &col in &positions {
                if self.is_function(row, col) {
                    continue;
                }
                for dr in 0..5 {
                    for dc in 0..5 {
                        let is_edge = dr == 0 || dr == 4 || dc == 0 || dc == 4;
                        let is_center = dr == 2 && dc == 2;
                        self.set_function(row + dr - 2, col + dc - 2, is_edge || is_center);
                    }
                }
            }
        }
    }

    /// Alternating modules on row 6 and column 6 between the finders.
    fn place_timing_patterns(&mut self) {
        let size = self.size();
        for i in 8..size - 8 {
            let black = i % 2 == 0;
            if !self.is_function(6, i) {
                self.set_function(6, i, black);
            }
            if !self.is_function(i, 6) {
                self.set_function(i, 6, black);
            }
        }
    }

    /// 15 format bits, bit 0 first, in two copies.
    fn place_format_info(&mut self) {
        let size = self.size();
        let bits = format_bits(self.level, self.mask);

        for i in 0..15 {
            let black = (bits >> i) & 1 == 1;

            // Around the top-left finder.
            match i {
                0..=5 => self.set_function(i, 8, black),
                6..=7 => self.set_function(i + 1, 8, black),
                8 => self.set_function(8, 7, black),
                _ => self.set_function(8, 14 - i, black),
            }

            // Split between the top-right and bottom-left finders.
            if i < 8 {
                self.set_function(8, size - 1 - i, black);
            } else {
                self.set_function(size - 15 + i, 8, black);
            }
        }
    }

    /// 18 version bits in two 6x3 blocks (version 7 and up).
    fn place_version_info(&mut self) {
        let size = self.size();
        let bits = self.version.info_bits();

        for i in 0..18 {
            let black = (bits >> i) & 1 == 1;
            let (a, b) = (size - 11 + i % 3, i / 3);
            self.set_function(a, b, black);
            self.set_function(b, a, black);
        }
    }

    /// Codeword modules in transmission order: interleaved data bytes, then
    /// interleaved check bytes.
    fn transmission_order(&self) -> Vec<Pixel> {
        let layouts = self.block_layouts();
        let longest = layouts.iter().map(|b| b.data_bytes).max().unwrap_or(0);
        let check_per_block = self.check_bytes / self.blocks;

        let mut order = Vec::with_capacity(self.total_bits());
        for i in 0..longest {
            for block in layouts.iter().filter(|b| i < b.data_bytes) {
                let start = block.data_offset + i * 8;
                order.extend((start..start + 8).map(|o| Pixel::codeword(Role::Data, o)));
            }
        }
        for i in 0..check_per_block {
            for block in &layouts {
                let start = block.check_offset + i * 8;
                order.extend((start..start + 8).map(|o| Pixel::codeword(Role::Check, o)));
            }
        }
        order
    }

    /// Zigzag placement from the bottom-right corner. Cells left over after
    /// the last codeword stay remainder modules.
    fn place_codewords(&mut self) {
        let size = self.size();
        let mut order = self.transmission_order().into_iter();

        let mut col = size - 1;
        let mut going_up = true;

        while col > 0 {
            // Skip timing pattern column
            if col == 6 {
                col -= 1;
            }

            for step in 0..size {
                let row = if going_up { size - 1 - step } else { step };
                for dc in 0..2 {
                    let c = col - dc;
                    if !self.is_function(row, c) {
                        self.pixels[row][c] = order.next().unwrap_or(Pixel::UNSET);
                    }
                }
            }

            going_up = !going_up;
            col = col.saturating_sub(2);
        }

        debug_assert!(order.next().is_none(), "codewords left unplaced");
    }

    fn apply_mask(&mut self) {
        let mask = self.mask;
        for (row, pixels) in self.pixels.iter_mut().enumerate() {
            for (col, pixel) in pixels.iter_mut().enumerate() {
                if pixel.role != Role::Function && mask.inverts(row, col) {
                    pixel.invert = true;
                    pixel.black = true;
                }
            }
        }
    }
}
