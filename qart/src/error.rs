//! Error types for planning, encoding and target sampling.

use thiserror::Error;

/// Everything that can abort an encode.
///
/// Bits that merely could not be steered toward the target are not errors;
/// they keep the value the Reed-Solomon code gives them.
#[derive(Debug, Error)]
pub enum QArtError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The URL plus the empty numeric segment does not fit in the data region.
    #[error("cannot encode URL into available bits: header needs {needed} bits, version has {available}")]
    HeaderOverflow { needed: usize, available: usize },

    /// A header or padding bit is already determined by the block and disagrees.
    #[error("cannot preserve required bit {bit} in block {block}")]
    RequiredBit { block: usize, bit: usize },

    /// The digit corrector asked for a zero the block can no longer provide.
    #[error("hard zero cannot be set: bit {bit} in block {block}")]
    HardZero { block: usize, bit: usize },

    #[error("digit correction did not settle after {passes} passes")]
    CorrectionDiverged { passes: usize },

    #[error("invalid segment: {0}")]
    Segment(String),

    #[error("cannot encode {bits} bits into {capacity}-bit data region")]
    DataOverflow { bits: usize, capacity: usize },

    /// Re-encoding the chosen digits did not reproduce the selected codewords.
    #[error("re-encoded codewords differ from the selected bits")]
    CodewordMismatch,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "png")]
    #[error("PNG encoding error: {0}")]
    Png(#[from] png::EncodingError),
}

pub type Result<T> = std::result::Result<T, QArtError>;
