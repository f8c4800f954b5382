//! SPI bus abstractions
//!
//! Display controllers on a 4-wire SPI bus distinguish command bytes from
//! data bytes with a separate D/C line. This module models one physical
//! transfer unit as a [`Transaction`] that carries its own D/C level, and
//! defines [`QueuedSpi`], the transport the display pipeline submits those
//! units to.

/// Largest single transfer the bus accepts, in bytes
///
/// Forty full-width lines of RGB565 at 320 pixels per line. The DMA
/// descriptor chain for the shared bus is sized for this.
pub const MAX_TRANSFER_SIZE: usize = 40 * 320 * 2;

/// Bytes a transaction can carry without a backing buffer
pub const INLINE_CAPACITY: usize = 4;

/// Level of the data/command select line for one transfer unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DcLevel {
    /// D/C low: the unit is a command byte
    Command,
    /// D/C high: the unit is parameter or pixel data
    Data,
}

impl DcLevel {
    /// Check if the line must be driven high for this level
    pub const fn is_high(self) -> bool {
        matches!(self, DcLevel::Data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payload<'a> {
    /// Short payload stored in the transaction itself
    Inline {
        bytes: [u8; INLINE_CAPACITY],
        len: u8,
    },
    /// Payload borrowed from a caller-owned buffer
    Borrowed(&'a [u8]),
}

/// One physical transfer unit on the bus
///
/// The D/C level travels with the unit. Transports read it from the
/// transaction at the moment the unit is dispatched, so units can be
/// prepared well ahead of time and still be tagged correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction<'a> {
    payload: Payload<'a>,
    dc: DcLevel,
}

impl<'a> Transaction<'a> {
    /// A single command byte (D/C low)
    pub const fn command(cmd: u8) -> Self {
        Self {
            payload: Payload::Inline {
                bytes: [cmd, 0, 0, 0],
                len: 1,
            },
            dc: DcLevel::Command,
        }
    }

    /// Four parameter bytes carried inline (D/C high)
    ///
    /// Used for address windows, which are always four bytes long.
    pub const fn data_inline(bytes: [u8; INLINE_CAPACITY]) -> Self {
        Self {
            payload: Payload::Inline {
                bytes,
                len: INLINE_CAPACITY as u8,
            },
            dc: DcLevel::Data,
        }
    }

    /// Data bytes borrowed from a buffer (D/C high)
    pub const fn data(bytes: &'a [u8]) -> Self {
        Self {
            payload: Payload::Borrowed(bytes),
            dc: DcLevel::Data,
        }
    }

    /// Bytes to clock out for this unit
    pub fn bytes(&self) -> &[u8] {
        match &self.payload {
            Payload::Inline { bytes, len } => &bytes[..*len as usize],
            Payload::Borrowed(bytes) => bytes,
        }
    }

    /// Length of the unit in bytes
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    /// Check if the unit carries no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// D/C level the transport must apply before clocking this unit
    pub const fn dc(&self) -> DcLevel {
        self.dc
    }

    /// Check if the payload lives inside the transaction
    pub const fn is_inline(&self) -> bool {
        matches!(self.payload, Payload::Inline { .. })
    }
}

/// SPI device with a synchronous path and a bounded in-flight queue
///
/// Implementations must:
/// - apply each transaction's [`DcLevel`] immediately before its first
///   clock edge, reading it from the transaction being dispatched
/// - complete queued transactions in submission order
///
/// A queued transaction may still be on the wire when `queue_transaction`
/// returns. Inline bytes are copied by the transport; borrowed bytes are
/// not, so the buffer behind them must not be modified or freed until the
/// completion has been collected with [`QueuedSpi::transaction_result`].
pub trait QueuedSpi {
    /// Error type for transfer operations
    type Error: core::fmt::Debug;

    /// Number of transactions that can be queued before results are collected
    fn queue_depth(&self) -> usize;

    /// Transmit one transaction and wait for it to finish
    fn polling_transmit(&mut self, transaction: &Transaction<'_>) -> Result<(), Self::Error>;

    /// Submit one transaction to the in-flight queue without waiting
    fn queue_transaction(&mut self, transaction: &Transaction<'_>) -> Result<(), Self::Error>;

    /// Wait for the oldest queued transaction to complete
    fn transaction_result(&mut self) -> Result<(), Self::Error>;
}

/// SPI device configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
    /// Clock polarity
    pub polarity: Polarity,
    /// Clock phase
    pub phase: Phase,
    /// Transactions that may be in flight at once
    pub queue_depth: usize,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            frequency: 40_000_000, // 40 MHz
            polarity: Polarity::IdleLow,
            phase: Phase::CaptureOnFirstTransition,
            queue_depth: 12,
        }
    }
}

impl SpiConfig {
    /// Queue depth a transport with `capacity` slots can honour
    pub fn bounded_queue_depth(&self, capacity: usize) -> usize {
        self.queue_depth.min(capacity)
    }

    /// Set clock polarity and phase from a combined SPI mode
    pub fn with_mode(mut self, mode: Mode) -> Self {
        let (polarity, phase) = mode.into();
        self.polarity = polarity;
        self.phase = phase;
        self
    }
}

/// SPI clock polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Clock idles low (CPOL=0)
    IdleLow,
    /// Clock idles high (CPOL=1)
    IdleHigh,
}

/// SPI clock phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Data captured on first clock transition (CPHA=0)
    CaptureOnFirstTransition,
    /// Data captured on second clock transition (CPHA=1)
    CaptureOnSecondTransition,
}

/// SPI mode (combined polarity and phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Mode 0: CPOL=0, CPHA=0
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl Mode {
    /// Mode from its number (0-3)
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Mode::Mode0),
            1 => Some(Mode::Mode1),
            2 => Some(Mode::Mode2),
            3 => Some(Mode::Mode3),
            _ => None,
        }
    }
}

impl From<Mode> for (Polarity, Phase) {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Mode0 => (Polarity::IdleLow, Phase::CaptureOnFirstTransition),
            Mode::Mode1 => (Polarity::IdleLow, Phase::CaptureOnSecondTransition),
            Mode::Mode2 => (Polarity::IdleHigh, Phase::CaptureOnFirstTransition),
            Mode::Mode3 => (Polarity::IdleHigh, Phase::CaptureOnSecondTransition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_single_low_byte() {
        let t = Transaction::command(0x2A);
        assert_eq!(t.bytes(), &[0x2A]);
        assert_eq!(t.dc(), DcLevel::Command);
        assert!(t.is_inline());
    }

    #[test]
    fn test_inline_data_keeps_all_four_bytes() {
        let t = Transaction::data_inline([0x00, 0x10, 0x01, 0x3F]);
        assert_eq!(t.bytes(), &[0x00, 0x10, 0x01, 0x3F]);
        assert_eq!(t.dc(), DcLevel::Data);
        assert_eq!(t.len(), INLINE_CAPACITY);
    }

    #[test]
    fn test_borrowed_data_references_buffer() {
        let buffer = [0xAAu8; 64];
        let t = Transaction::data(&buffer[8..40]);
        assert_eq!(t.len(), 32);
        assert!(!t.is_inline());
        assert_eq!(t.bytes().as_ptr(), buffer[8..].as_ptr());
    }

    #[test]
    fn test_dc_level() {
        assert!(DcLevel::Data.is_high());
        assert!(!DcLevel::Command.is_high());
    }

    #[test]
    fn test_mode_conversion() {
        let config = SpiConfig::default().with_mode(Mode::Mode3);
        assert_eq!(config.polarity, Polarity::IdleHigh);
        assert_eq!(config.phase, Phase::CaptureOnSecondTransition);
        assert_eq!(Mode::from_u8(2), Some(Mode::Mode2));
        assert_eq!(Mode::from_u8(4), None);
    }

    #[test]
    fn test_queue_depth_bounded_by_capacity() {
        let config = SpiConfig::default();
        assert_eq!(config.bounded_queue_depth(32), 12);
        assert_eq!(config.bounded_queue_depth(4), 4);
    }
}
