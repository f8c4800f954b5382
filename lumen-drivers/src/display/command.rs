//! Synchronous command and parameter transfers
//!
//! Small transfers used during bring-up go through the transport's polling
//! path, one command byte or one parameter block per transfer unit.

use lumen_hal::{QueuedSpi, Transaction};

use super::fatal;

/// ST7789 commands
#[allow(dead_code)]
pub mod cmd {
    pub const SWRESET: u8 = 0x01;
    pub const SLPOUT: u8 = 0x11;
    pub const DISPON: u8 = 0x29;
    pub const CASET: u8 = 0x2A;
    pub const RASET: u8 = 0x2B;
    pub const RAMWR: u8 = 0x2C;
    pub const MADCTL: u8 = 0x36;
    pub const COLMOD: u8 = 0x3A;
    pub const PORCTRL: u8 = 0xB2;
    pub const GCTRL: u8 = 0xB7;
    pub const VCOMS: u8 = 0xBB;
    pub const LCMCTRL: u8 = 0xC0;
    pub const VDVVRHEN: u8 = 0xC2;
    pub const VRHS: u8 = 0xC3;
    pub const VDVS: u8 = 0xC4;
    pub const FRCTRL2: u8 = 0xC6;
    pub const PWCTRL1: u8 = 0xD0;
    pub const PVGAMCTRL: u8 = 0xE0;
    pub const NVGAMCTRL: u8 = 0xE1;
}

/// Send one command byte and wait for it
///
/// A transport failure is fatal.
pub fn send_command<SPI: QueuedSpi>(spi: &mut SPI, command: u8) {
    if let Err(e) = spi.polling_transmit(&Transaction::command(command)) {
        fatal("send_command", e);
    }
}

/// Send a block of parameter bytes and wait for it
///
/// Does nothing for an empty block. A transport failure is fatal.
pub fn send_data<SPI: QueuedSpi>(spi: &mut SPI, data: &[u8]) {
    if data.is_empty() {
        return;
    }
    if let Err(e) = spi.polling_transmit(&Transaction::data(data)) {
        fatal("send_data", e);
    }
}
