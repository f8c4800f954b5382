//! BMP file and info header
//!
//! Layout of the 54-byte header (all fields little-endian):
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 2 | signature `BM` |
//! | 2 | 4 | file size |
//! | 10 | 4 | pixel data offset |
//! | 14 | 4 | info header size |
//! | 18 | 4 | width (signed) |
//! | 22 | 4 | height (signed, negative = top-down) |
//! | 26 | 2 | colour planes |
//! | 28 | 2 | bits per pixel |
//! | 30 | 4 | compression |
//! | 34 | 4 | image size |

use super::DecodeError;
use crate::geometry::{Area, WIDTH};

/// Size of the file header plus the BITMAPINFOHEADER
pub const HEADER_SIZE: usize = 54;

/// `BM` read as a little-endian u16
pub const SIGNATURE: u16 = 0x4D42;

/// Widest image that can be decoded, one surface row
pub const MAX_ROW_PIXELS: usize = WIDTH as usize;

/// Bytes in the widest supported row, without padding
pub const MAX_ROW_BYTES: usize = MAX_ROW_PIXELS * 3;

const BITS_PER_PIXEL: u16 = 24;
const COMPRESSION_NONE: u32 = 0;

/// Raw header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BmpHeader {
    pub file_size: u32,
    pub pixel_offset: u32,
    pub info_size: u32,
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bits_per_pixel: u16,
    pub compression: u32,
    pub image_size: u32,
}

impl BmpHeader {
    /// Parse the header bytes, checking only the signature
    pub fn parse(bytes: &[u8; HEADER_SIZE]) -> Result<Self, DecodeError> {
        if le_u16(bytes, 0) != SIGNATURE {
            return Err(DecodeError::BadMagic);
        }

        Ok(Self {
            file_size: le_u32(bytes, 2),
            pixel_offset: le_u32(bytes, 10),
            info_size: le_u32(bytes, 14),
            width: le_u32(bytes, 18) as i32,
            height: le_u32(bytes, 22) as i32,
            planes: le_u16(bytes, 26),
            bits_per_pixel: le_u16(bytes, 28),
            compression: le_u32(bytes, 30),
            image_size: le_u32(bytes, 34),
        })
    }

    /// Validate the header and derive the decoding geometry
    pub fn image_info(&self) -> Result<ImageInfo, DecodeError> {
        if self.bits_per_pixel != BITS_PER_PIXEL {
            return Err(DecodeError::UnsupportedBitDepth(self.bits_per_pixel));
        }
        if self.compression != COMPRESSION_NONE {
            return Err(DecodeError::UnsupportedCompression(self.compression));
        }
        if self.width <= 0 || self.height == 0 {
            return Err(DecodeError::InvalidDimensions);
        }

        let width = self.width as u32;
        let height = self.height.unsigned_abs();
        if width as usize > MAX_ROW_PIXELS {
            return Err(DecodeError::RowTooWide);
        }
        if height > u32::from(u16::MAX) {
            return Err(DecodeError::InvalidDimensions);
        }

        Ok(ImageInfo {
            width: width as u16,
            height: height as u16,
            stride: row_stride(width as usize),
            pixel_offset: self.pixel_offset,
            top_down: self.height < 0,
        })
    }
}

/// Decoding geometry of a validated image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
    /// Bytes per stored row including padding
    pub stride: usize,
    /// File offset of the first stored row
    pub pixel_offset: u32,
    /// Rows are stored top to bottom
    pub top_down: bool,
}

impl ImageInfo {
    /// Number of pixels in the image
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Bytes of sample data in one row, without padding
    pub const fn row_bytes(&self) -> usize {
        self.width as usize * 3
    }

    /// File offset of output row `row` (0 = top of the image)
    pub fn row_offset(&self, row: u16) -> u32 {
        let stored = if self.top_down {
            row
        } else {
            self.height - 1 - row
        };
        self.pixel_offset
            .saturating_add(u32::from(stored).saturating_mul(self.stride as u32))
    }

    /// File offset of the last sample byte of the image
    pub fn last_sample_offset(&self) -> u32 {
        let last_stored_row = self.pixel_offset.saturating_add(
            u32::from(self.height - 1).saturating_mul(self.stride as u32),
        );
        last_stored_row.saturating_add(self.row_bytes() as u32 - 1)
    }

    /// Rectangle the image covers when drawn with its corner at (x, y)
    pub const fn area_at(&self, x: u16, y: u16) -> Area {
        Area::new(x, y, self.width, self.height)
    }
}

/// Row length rounded up to a multiple of four bytes
pub const fn row_stride(width: usize) -> usize {
    (width * 3 + 3) & !3
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
