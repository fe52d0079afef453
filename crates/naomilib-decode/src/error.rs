//! Error types for decoding operations.

use thiserror::Error;

/// Result alias used by every decoding function in this crate.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors that can occur while decoding or encoding NaomiLib data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer is shorter than the smallest structure it must contain.
    #[error("buffer too small: expected at least {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    /// A read or write would touch bytes past the end of the buffer.
    #[error("read of {len} bytes at offset {offset:#x} exceeds buffer of {buffer_len} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        buffer_len: usize,
    },

    /// A runtime pointer does not land inside the loaded file.
    #[error("pointer {pointer:#010x} is below load address {ram_offset:#010x}")]
    PointerOutOfRange { pointer: u32, ram_offset: u32 },

    /// The data is structurally invalid.
    #[error("invalid {context}: {detail}")]
    InvalidFormat {
        context: &'static str,
        detail: String,
    },

    /// Word-oriented codecs only accept an even number of bytes.
    #[error("expected an even number of bytes, got {0}")]
    OddLength(usize),
}

impl DecodeError {
    /// Whether this error is a range error: the data ran out, or pointed
    /// outside the buffer.
    ///
    /// This is the class of failure that signals a buffer is probably still
    /// compressed. Everything else is a genuine format error.
    #[must_use]
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(
            self,
            Self::OutOfBounds { .. } | Self::BufferTooSmall { .. } | Self::PointerOutOfRange { .. }
        )
    }

    pub(crate) fn invalid(context: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidFormat {
            context,
            detail: detail.into(),
        }
    }
}
