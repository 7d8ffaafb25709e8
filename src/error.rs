//! Error types for mdlpatch operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Image bytes could not be decoded (or re-encoded for extraction).
    #[error("image codec error: {0}")]
    Decode(#[from] image::ImageError),

    /// A raster's dimensions or pixel count are unusable.
    #[error("invalid raster: {0}")]
    Raster(String),

    /// A texture region would fall outside the model buffer.
    #[error("texture region 0x{offset:x}..0x{end:x} exceeds buffer of {len} bytes")]
    Range {
        offset: usize,
        end: usize,
        len: usize,
    },

    /// Palette construction failed on degenerate input.
    #[error("quantization failed: {0}")]
    Quantization(&'static str),

    /// The model file could not be parsed.
    #[error("{0}")]
    Parse(String),

    /// No texture matched the requested name.
    #[error("no texture matching {0:?}")]
    NoSuchTexture(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
