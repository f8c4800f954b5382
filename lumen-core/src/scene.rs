//! Frame buffer composition for the sprite demo
//!
//! A frame is a row-major 320x240 pixel buffer. Sprites are row-major
//! too, exactly as [`decode_image`](crate::bitmap::decode_image) writes
//! them, and may hang off any edge of the frame.

use crate::color::Rgb565;
use crate::geometry::{HEIGHT, SCREEN_PIXELS, WIDTH};

/// Paint the whole frame one colour
pub fn clear(frame: &mut [Rgb565], color: Rgb565) {
    let len = frame.len().min(SCREEN_PIXELS);
    frame[..len].fill(color);
}

/// Paint a `width` x `height` rectangle with its corner at (x, y)
///
/// Clipped to the frame like [`draw_sprite`]. Stops at the end of a short
/// frame buffer.
pub fn fill_rect(frame: &mut [Rgb565], x: i32, y: i32, width: u16, height: u16, color: Rgb565) {
    let first_col = x.max(0);
    let last_col = x.saturating_add(i32::from(width)).min(i32::from(WIDTH));
    let first_row = y.max(0);
    let last_row = y.saturating_add(i32::from(height)).min(i32::from(HEIGHT));
    if first_col >= last_col {
        return;
    }

    for row in first_row..last_row {
        let start = (row * i32::from(WIDTH) + first_col) as usize;
        let end = (row * i32::from(WIDTH) + last_col) as usize;
        let Some(dest) = frame.get_mut(start..end) else {
            return;
        };
        dest.fill(color);
    }
}

/// Copy a `width` x `height` sprite into the frame with its corner at (x, y)
///
/// Pixels falling outside the frame are skipped.
pub fn draw_sprite(frame: &mut [Rgb565], x: i32, y: i32, width: u16, height: u16, sprite: &[Rgb565]) {
    let width = i32::from(width);
    let height = i32::from(height);

    // Visible column range, relative to the sprite
    let first_col = (-x).clamp(0, width);
    let last_col = (i32::from(WIDTH) - x).clamp(0, width);
    if first_col >= last_col {
        return;
    }

    for row in 0..height {
        let dest_row = y + row;
        if dest_row < 0 || dest_row >= i32::from(HEIGHT) {
            continue;
        }

        let start = (row * width) as usize;
        let Some(src) = sprite.get(start + first_col as usize..start + last_col as usize) else {
            return;
        };

        let dest = (dest_row * i32::from(WIDTH) + x + first_col) as usize;
        let Some(dest) = frame.get_mut(dest..dest + src.len()) else {
            return;
        };
        dest.copy_from_slice(src);
    }
}

/// Horizontal ping-pong motion between 0 and `max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bounce {
    position: i32,
    direction: i32,
    speed: i32,
    max: i32,
}

impl Bounce {
    /// Start at 0 moving right by `speed` per step
    pub fn new(speed: u16, max: i32) -> Self {
        let speed = i32::from(speed);
        Self {
            position: 0,
            direction: speed,
            speed,
            max,
        }
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    /// Advance one frame
    ///
    /// The direction turns once the position reaches either end, so the
    /// position may overshoot an end by less than one step.
    pub fn step(&mut self) -> i32 {
        self.position += self.direction;
        if self.position <= 0 {
            self.direction = self.speed;
        }
        if self.position >= self.max {
            self.direction = -self.speed;
        }
        self.position
    }
}
