//! 24-bit bitmap loading
//!
//! Reads uncompressed 24 bits-per-pixel BMP files through a
//! [`FileStorage`](lumen_hal::FileStorage) and converts them into packed
//! [`Rgb565`](crate::color::Rgb565) pixels, top row first.
//!
//! Rows are fetched one at a time by file offset, so only a single row is
//! ever buffered regardless of image height.

pub mod decoder;
pub mod header;

pub use decoder::{decode_image, read_header};
pub use header::{BmpHeader, ImageInfo, HEADER_SIZE, MAX_ROW_PIXELS};

use lumen_hal::StorageError;

/// Errors from bitmap loading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// File could not be opened or read
    Storage(StorageError),
    /// File does not start with the `BM` signature
    BadMagic,
    /// Only 24 bits per pixel is supported
    UnsupportedBitDepth(u16),
    /// Only uncompressed images are supported
    UnsupportedCompression(u32),
    /// Width or height is zero or out of range
    InvalidDimensions,
    /// Image is wider than the surface
    RowTooWide,
    /// Output buffer holds fewer pixels than the image
    BufferTooSmall,
    /// File ends before the last pixel row
    Truncated,
}

impl From<StorageError> for DecodeError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::UnexpectedEof => DecodeError::Truncated,
            other => DecodeError::Storage(other),
        }
    }
}
