//! Packed 16-bit colour
//!
//! The panel takes RGB565 most significant byte first. [`Rgb565`] stores
//! its value already in that byte order, so a pixel slice can be handed to
//! the SPI transport as bytes without a conversion pass.

use bytemuck::{Pod, Zeroable};

/// RGB565 pixel in panel (big-endian) byte order
///
/// Red in bits 15..11, green in 10..5, blue in 4..0 of the logical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(transparent)]
pub struct Rgb565(u16);

impl Rgb565 {
    pub const BLACK: Self = Self::from_rgb888(0, 0, 0);
    pub const BLUE: Self = Self::from_rgb888(0, 0, 255);
    pub const RED: Self = Self::from_rgb888(255, 0, 0);
    pub const GREEN: Self = Self::from_rgb888(0, 255, 0);
    pub const CYAN: Self = Self::from_rgb888(0, 255, 255);
    pub const MAGENTA: Self = Self::from_rgb888(255, 0, 255);
    pub const YELLOW: Self = Self::from_rgb888(255, 255, 0);
    pub const WHITE: Self = Self::from_rgb888(255, 255, 255);
    pub const NAVY: Self = Self::from_rgb888(0, 0, 128);
    pub const DARK_GREEN: Self = Self::from_rgb888(0, 128, 0);
    pub const DARK_CYAN: Self = Self::from_rgb888(0, 128, 128);
    pub const MAROON: Self = Self::from_rgb888(128, 0, 0);
    pub const PURPLE: Self = Self::from_rgb888(128, 0, 128);
    pub const OLIVE: Self = Self::from_rgb888(128, 128, 0);
    pub const LIGHT_GREY: Self = Self::from_rgb888(192, 192, 192);
    pub const DARK_GREY: Self = Self::from_rgb888(128, 128, 128);
    pub const ORANGE: Self = Self::from_rgb888(255, 165, 0);
    pub const GREEN_YELLOW: Self = Self::from_rgb888(173, 255, 47);

    /// Pack 8-bit channels, truncating red and blue to 5 bits and green to 6
    pub const fn from_rgb888(r: u8, g: u8, b: u8) -> Self {
        let value = ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3);
        Self::from_raw(value)
    }

    /// Pack a `[blue, green, red]` sample as stored in 24-bit bitmaps
    pub const fn from_bgr888(bgr: [u8; 3]) -> Self {
        Self::from_rgb888(bgr[2], bgr[1], bgr[0])
    }

    /// Create from a logical RGB565 value
    pub const fn from_raw(value: u16) -> Self {
        Self(value.to_be())
    }

    /// Logical RGB565 value
    pub const fn raw(self) -> u16 {
        u16::from_be(self.0)
    }

    /// Bytes in transmission order
    pub const fn to_bytes(self) -> [u8; 2] {
        self.raw().to_be_bytes()
    }

    /// 5-bit red field
    pub const fn r(self) -> u8 {
        (self.raw() >> 11) as u8
    }

    /// 6-bit green field
    pub const fn g(self) -> u8 {
        ((self.raw() >> 5) & 0x3F) as u8
    }

    /// 5-bit blue field
    pub const fn b(self) -> u8 {
        (self.raw() & 0x1F) as u8
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Rgb565 {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Rgb565({=u16:#06x})", self.raw())
    }
}
