//! Surface dimensions and rectangles

/// Surface width in pixels (landscape)
pub const WIDTH: u16 = 320;

/// Surface height in pixels (landscape)
pub const HEIGHT: u16 = 240;

/// Pixels on the whole surface
pub const SCREEN_PIXELS: usize = WIDTH as usize * HEIGHT as usize;

/// Bytes per packed pixel
pub const BYTES_PER_PIXEL: usize = 2;

/// A rectangle in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Area {
    /// Left column
    pub x: u16,
    /// Top row
    pub y: u16,
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
}

impl Area {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole surface
    pub const fn screen() -> Self {
        Self::new(0, 0, WIDTH, HEIGHT)
    }

    /// Check if the rectangle covers no pixels
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size of the packed pixel payload in bytes
    ///
    /// `None` when the payload does not fit in 32 bits, which only happens
    /// for rectangles far larger than any surface.
    pub const fn byte_len(&self) -> Option<usize> {
        let pixels = self.width as u32 * self.height as u32;
        match pixels.checked_mul(BYTES_PER_PIXEL as u32) {
            Some(bytes) => Some(bytes as usize),
            None => None,
        }
    }

    /// Check if the top-left corner lies on the surface
    pub const fn origin_on_screen(&self) -> bool {
        self.x < WIDTH && self.y < HEIGHT
    }
}
