//! # QArt
//!
//! QR codes that decode to a URL and, at normal viewing scale, look like a
//! picture.
//!
//! The payload is `URL#` in byte mode followed by a numeric segment of filler
//! digits. The filler bits, and any Reed-Solomon check bits the code leaves
//! free, are chosen to match a target image. Every block is still a valid
//! Reed-Solomon codeword and every digit group decodes to 000-999.
//!
//! ## Library Organization
//!
//! ```text
//! lib.rs
//! +-- Public API
//! |   +-- QArt::open() / new()       Config + target image -> encoder
//! |   +-- QArt::encode()             Run selection passes -> Encoded
//! |   +-- Code::to_svg/png/ascii()   Render the symbol
//! |   +-- ControlMap                 Which modules were steered
//! |
//! +-- Engine (engine.rs)
//! |   +-- Capacity                   Header bits, digit groups
//! |   +-- Phase                      Encoding -> Correcting -> Done
//! |
//! +-- Selection
//! |   +-- target.rs                  Luma + 11x11 local contrast
//! |   +-- block.rs   BitBlock        GF(2) freedom per RS block
//! |   +-- select.rs                  Contrast-ordered greedy pinning
//! |   +-- digits.rs                  Digit group overflow correction
//! |   +-- dither.rs                  Forward error diffusion
//! |
//! +-- QR collaborators
//!     +-- plan.rs    Plan            Module roles, offsets, rotation
//!     +-- segment.rs                 Byte and numeric segments
//!     +-- bits.rs    Bits            Bit stream, padding, check bytes
//!     +-- gf256.rs   ReedSolomon     GF(2^8) and RS encoder
//!     +-- version.rs                 Version, Level, Mask tables
//! ```
//!
//! ## Why bits are free
//!
//! A block of `k` data bytes has `8k` degrees of freedom over GF(2). Header
//! and padding bits use some of them up. Each remaining degree can be spent
//! on one data or check bit, and the engine spends them on the modules with
//! the highest local contrast first.
//!
//! ```text
//!     block bits:  [ header | digit groups | pad ][ check bytes ]
//!                    pinned   editable      pinned  editable
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use qart::{Config, QArt};
//!
//! let config = Config {
//!     url: "https://example.com/".into(),
//!     version: 6,
//!     ..Config::default()
//! };
//! let encoded = QArt::open(config, "gopher.png")?.encode()?;
//! let svg = encoded.code.to_svg(4, 4);
//! # Ok::<(), qart::QArtError>(())
//! ```

mod bits;
mod block;
mod code;
mod config;
mod control;
mod digits;
mod dither;
mod engine;
mod error;
mod gf256;
mod plan;
mod segment;
mod select;
mod target;
mod version;

pub use bits::Bits;
pub use block::{BitBlock, SetBit};
pub use code::Code;
pub use config::Config;
pub use control::ControlMap;
pub use engine::{Capacity, Encoded, QArt};
pub use error::{QArtError, Result};
pub use gf256::ReedSolomon;
pub use plan::{BlockLayout, Pixel, Plan, Role, Rotation};
pub use segment::{Mode, Segment};
pub use select::{HARD_ZERO_CONTRAST, PriorityEntry};
pub use target::{Target, TargetSample};
pub use version::{Level, Mask, Version};
