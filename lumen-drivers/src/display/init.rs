//! ST7789 bring-up table
//!
//! Each entry is a command byte followed by up to 16 parameter bytes. The
//! `databytes` field holds the parameter count in its low five bits and a
//! post-command delay flag in bit 7. An entry whose `databytes` is `0xFF`
//! ends the table.

use embedded_hal::delay::DelayNs;
use lumen_hal::QueuedSpi;

use super::command::{cmd, send_command, send_data};

/// Longest parameter block in one entry
pub const MAX_PARAMS: usize = 16;

/// Wait after this command
pub const DELAY_FLAG: u8 = 0x80;

/// Bits of `databytes` holding the parameter count
pub const LENGTH_MASK: u8 = 0x1F;

/// `databytes` value of the terminating entry
pub const END_OF_TABLE: u8 = 0xFF;

/// One bring-up table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitCommand {
    pub cmd: u8,
    pub data: [u8; MAX_PARAMS],
    pub databytes: u8,
}

impl InitCommand {
    /// Table terminator
    pub const END: Self = Self {
        cmd: 0,
        data: [0; MAX_PARAMS],
        databytes: END_OF_TABLE,
    };

    pub const fn new(cmd: u8, params: &[u8]) -> Self {
        assert!(params.len() <= MAX_PARAMS);
        let mut data = [0; MAX_PARAMS];
        let mut i = 0;
        while i < params.len() {
            data[i] = params[i];
            i += 1;
        }
        Self {
            cmd,
            data,
            databytes: params.len() as u8,
        }
    }

    /// Same entry, followed by the post-command delay
    pub const fn with_delay(mut self) -> Self {
        self.databytes |= DELAY_FLAG;
        self
    }

    pub const fn is_end(&self) -> bool {
        self.databytes == END_OF_TABLE
    }

    pub const fn has_delay(&self) -> bool {
        self.databytes & DELAY_FLAG != 0
    }

    /// Parameter bytes with the flag bits masked off the count
    pub fn params(&self) -> &[u8] {
        let count = (self.databytes & LENGTH_MASK) as usize;
        &self.data[..count.min(MAX_PARAMS)]
    }
}

/// Power-on sequence for a 320x240 landscape panel in RGB565
pub static ST7789_INIT: [InitCommand; 16] = [
    // Row/column exchange + row order: landscape
    InitCommand::new(cmd::MADCTL, &[0xA0]),
    // 16 bits per pixel
    InitCommand::new(cmd::COLMOD, &[0x55]),
    InitCommand::new(cmd::PORCTRL, &[0x0C, 0x0C, 0x00, 0x33, 0x33]),
    InitCommand::new(cmd::GCTRL, &[0x45]),
    InitCommand::new(cmd::VCOMS, &[0x2B]),
    InitCommand::new(cmd::LCMCTRL, &[0x2C]),
    InitCommand::new(cmd::VDVVRHEN, &[0x01, 0xFF]),
    InitCommand::new(cmd::VRHS, &[0x11]),
    InitCommand::new(cmd::VDVS, &[0x20]),
    InitCommand::new(cmd::FRCTRL2, &[0x0F]),
    // PWCTRL1 takes two parameters: the fixed 0xA4 key, then AVDD 6.8 V,
    // AVCL -4.8 V, VDS 2.3 V (0xA1, the reset value). A lone 0xA4 leaves the
    // second parameter unwritten.
    InitCommand::new(cmd::PWCTRL1, &[0xA4, 0xA1]),
    InitCommand::new(
        cmd::PVGAMCTRL,
        &[
            0xD0, 0x00, 0x05, 0x0E, 0x15, 0x0D, 0x37, 0x43, 0x47, 0x09, 0x15, 0x12, 0x16, 0x19,
        ],
    ),
    InitCommand::new(
        cmd::NVGAMCTRL,
        &[
            0xD0, 0x00, 0x05, 0x0D, 0x0C, 0x06, 0x2D, 0x44, 0x40, 0x0E, 0x1C, 0x18, 0x16, 0x19,
        ],
    ),
    InitCommand::new(cmd::SLPOUT, &[]).with_delay(),
    InitCommand::new(cmd::DISPON, &[]).with_delay(),
    InitCommand::END,
];

/// Replay a bring-up table up to its terminator
///
/// Returns the number of commands sent.
pub fn run_init_sequence<SPI, D>(
    spi: &mut SPI,
    table: &[InitCommand],
    delay: &mut D,
    delay_ms: u32,
) -> usize
where
    SPI: QueuedSpi,
    D: DelayNs,
{
    let mut sent = 0;
    for entry in table.iter().take_while(|entry| !entry.is_end()) {
        send_command(spi, entry.cmd);
        send_data(spi, entry.params());
        if entry.has_delay() {
            delay.delay_ms(delay_ms);
        }
        sent += 1;
    }
    sent
}
