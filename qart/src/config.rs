//! Encoder configuration.
//!
//! Every field has a default, so a JSON config only needs the keys it
//! changes:
//!
//! ```json
//! { "url": "https://swtch.com/pjw", "version": 8, "dither": true }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{QArtError, Result};
use crate::plan::Rotation;
use crate::version::{Level, Mask, Version};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL prefix encoded verbatim. `#` and the digit filler follow it.
    pub url: String,
    /// QR version, 1-40.
    pub version: u8,
    /// Error correction level.
    pub level: Level,
    /// Mask pattern, 0-7.
    pub mask: u8,
    /// Horizontal offset of the symbol within the target image, in pixels.
    pub dx: i32,
    /// Vertical offset of the symbol within the target image, in pixels.
    pub dy: i32,
    /// Extra pixels added to the target side beyond the symbol size.
    pub margin: u32,
    /// Quiet zone width in modules.
    pub quiet_zone: usize,
    /// Output pixels per module.
    pub scale: u32,
    /// Rotation applied to the module grid before sampling.
    pub rotation: Rotation,
    /// Replace measured contrast with seeded noise.
    pub rand_control: bool,
    /// Seed for tie-breaking and `rand_control`.
    pub seed: u64,
    /// Run the error-diffusion pass.
    pub dither: bool,
    /// Only steer data bits, leave check bits to the code.
    pub only_data_bits: bool,
    /// Also produce a [`ControlMap`](crate::ControlMap).
    pub save_control: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: "https://example.com/".to_string(),
            version: 6,
            level: Level::L,
            mask: 2,
            dx: 0,
            dy: 0,
            margin: 0,
            quiet_zone: 4,
            scale: 4,
            rotation: Rotation::R0,
            rand_control: false,
            seed: 0,
            dither: false,
            only_data_bits: false,
            save_control: false,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        Version::new(self.version)?;
        Mask::new(self.mask)?;
        if self.scale == 0 {
            return Err(QArtError::InvalidConfig("scale must be at least 1".into()));
        }
        if self.url.is_empty() {
            return Err(QArtError::InvalidConfig("url must not be empty".into()));
        }
        Ok(())
    }

    /// Side length, in pixels, the target image is resized to.
    pub fn target_size(&self) -> u32 {
        17 + 4 * u32::from(self.version) + self.margin
    }

    /// The literal part of the payload.
    pub fn header(&self) -> String {
        format!("{}#", self.url)
    }
}
