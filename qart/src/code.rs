//! A rendered symbol and its output formats.

#[cfg(feature = "png")]
use crate::error::Result;

/// A finished QR symbol: a square grid of black/white modules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Code {
    /// Indexed `[y][x]`, `true` is black.
    modules: Vec<Vec<bool>>,
}

impl Code {
    pub(crate) fn from_modules(modules: Vec<Vec<bool>>) -> Self {
        debug_assert!(modules.iter().all(|row| row.len() == modules.len()));
        Self { modules }
    }

    /// Modules per side.
    pub fn size(&self) -> usize {
        self.modules.len()
    }

    pub fn black(&self, x: usize, y: usize) -> bool {
        self.modules[y][x]
    }

    pub fn rows(&self) -> &[Vec<bool>] {
        &self.modules
    }

    /// Render as an SVG string, `scale` pixels per module.
    pub fn to_svg(&self, scale: u32, quiet_zone: usize) -> String {
        let scale = scale as usize;
        let total_size = (self.size() + 2 * quiet_zone) * scale;

        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {0} {0}" width="{0}" height="{0}">"#,
            total_size
        );
        svg.push_str(&format!(
            r#"<rect width="{0}" height="{0}" fill="white"/>"#,
            total_size
        ));

        for (y, row) in self.modules.iter().enumerate() {
            for (x, _) in row.iter().enumerate().filter(|(_, black)| **black) {
                svg.push_str(&format!(
                    r#"<rect x="{}" y="{}" width="{s}" height="{s}" fill="black"/>"#,
                    (x + quiet_zone) * scale,
                    (y + quiet_zone) * scale,
                    s = scale
                ));
            }
        }

        svg.push_str("</svg>");
        svg
    }

    /// Render for a terminal using half-block characters, two module rows
    /// per line.
    pub fn to_ascii(&self, quiet_zone: usize) -> String {
        let size = self.size();
        let total = size + 2 * quiet_zone;
        let module = |row: usize, col: usize| {
            row >= quiet_zone
                && row < size + quiet_zone
                && col >= quiet_zone
                && col < size + quiet_zone
                && self.modules[row - quiet_zone][col - quiet_zone]
        };

        let mut result = String::with_capacity((total + 1) * total.div_ceil(2) * 3);
        for row in (0..total).step_by(2) {
            for col in 0..total {
                let ch = match (module(row, col), module(row + 1, col)) {
                    (true, true) => '\u{2588}',
                    (true, false) => '\u{2580}',
                    (false, true) => '\u{2584}',
                    (false, false) => ' ',
                };
                result.push(ch);
            }
            result.push('\n');
        }
        result
    }

    /// Render as an 8-bit grayscale PNG, `scale` pixels per module.
    #[cfg(feature = "png")]
    pub fn to_png(&self, scale: u32, quiet_zone: usize) -> Result<Vec<u8>> {
        let scale = scale as usize;
        let total_size = (self.size() + 2 * quiet_zone) * scale;
        let mut pixels = vec![255u8; total_size * total_size];

        for (y, row) in self.modules.iter().enumerate() {
            for (x, &black) in row.iter().enumerate() {
                if black {
                    fill_square(
                        &mut pixels,
                        total_size,
                        (x + quiet_zone) * scale,
                        (y + quiet_zone) * scale,
                        scale,
                        0,
                    );
                }
            }
        }

        encode_grayscale(&pixels, total_size)
    }
}

#[cfg(feature = "png")]
pub(crate) fn fill_square(
    pixels: &mut [u8],
    stride: usize,
    px: usize,
    py: usize,
    scale: usize,
    gray: u8,
) {
    for dy in 0..scale {
        let start = (py + dy) * stride + px;
        pixels[start..start + scale].fill(gray);
    }
}

/// Encode a square grayscale buffer as PNG.
#[cfg(feature = "png")]
pub(crate) fn encode_grayscale(pixels: &[u8], side: usize) -> Result<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, side as u32, side as u32);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(pixels)?;
    }
    Ok(png_data)
}
