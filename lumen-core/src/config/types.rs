//! Configuration type definitions
//!
//! These types describe one board: the display bus and control lines, the
//! SD card bus, and the demo application's assets and timing.

use heapless::String;
use lumen_hal::spi::{Mode, SpiConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum asset path length
pub const MAX_PATH_LEN: usize = 32;

/// Display bus and bring-up timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayConfig {
    /// SPI clock in Hz
    pub frequency_hz: u32,
    /// SPI mode (0-3)
    pub spi_mode: u8,
    /// Reset low time, and settle time after release
    pub reset_pulse_ms: u32,
    /// Wait after init commands flagged with a delay
    pub post_command_delay_ms: u32,
    /// Backlight is lit by driving its pin low
    pub backlight_active_low: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 40_000_000,
            spi_mode: 0,
            reset_pulse_ms: 100,
            post_command_delay_ms: 100,
            backlight_active_low: false,
        }
    }
}

impl DisplayConfig {
    /// SPI device configuration, or `None` if the mode number is invalid
    pub fn spi_config(&self) -> Option<SpiConfig> {
        let mode = Mode::from_u8(self.spi_mode)?;
        Some(SpiConfig {
            frequency: self.frequency_hz,
            ..SpiConfig::default()
        }
        .with_mode(mode))
    }
}

/// SD card bus settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StorageConfig {
    /// SPI clock in Hz once the card is initialised
    pub frequency_hz: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 4_000_000,
        }
    }
}

/// Demo application assets and timing
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AppConfig {
    /// Full-screen splash image
    pub splash_path: String<MAX_PATH_LEN>,
    /// Sprite bounced across the screen
    pub sprite_path: String<MAX_PATH_LEN>,
    /// Time the solid splash colour is held before the image
    pub splash_hold_ms: u32,
    /// Time the splash image is held before the animation starts
    pub logo_hold_ms: u32,
    /// Frame period of the sprite animation
    pub frame_period_ms: u32,
    /// Sprite top row
    pub sprite_row: u16,
    /// Sprite horizontal speed in pixels per frame
    pub sprite_speed: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut splash_path = String::new();
        let _ = splash_path.push_str("/logo.bmp");
        let mut sprite_path = String::new();
        let _ = sprite_path.push_str("/ghost.bmp");

        Self {
            splash_path,
            sprite_path,
            splash_hold_ms: 1000,
            logo_hold_ms: 5000,
            frame_period_ms: 40,
            sprite_row: 88,
            sprite_speed: 4,
        }
    }
}

/// Complete board configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoardConfig {
    pub display: DisplayConfig,
    pub storage: StorageConfig,
    pub app: AppConfig,
}
