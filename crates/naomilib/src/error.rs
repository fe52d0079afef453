//! Error type for file-level operations.

use naomilib_decode::DecodeError;
use thiserror::Error;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// No texture definition has this index.
    #[error("no texture with index {0}")]
    UnknownTexture(usize),

    /// Pixel data does not match the texture's dimensions.
    #[error("texture is {width}x{height} but the pixels are {actual_width}x{actual_height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}
