//! Shared SPI0 bus
//!
//! The display and the SD card sit on the same bus at different clocks
//! and possibly different modes. The bus lives in an async mutex: the
//! display transfer task clocks units out by DMA through
//! [`DisplayDevice`], while the SD card driver, which is blocking, goes
//! through [`ClockedDevice`]. Both reprogram the bus with their own
//! settings before every transaction.

use embassy_embedded_hal::shared_bus::asynch::spi::SpiDeviceWithConfig;
use embassy_embedded_hal::shared_bus::SpiDeviceError;
use embassy_rp::gpio::Output;
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{self, Async, Spi};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{block_for, Duration};
use embedded_hal::spi::{ErrorType, Operation, SpiDevice};
use lumen_hal::spi::{Phase, Polarity, SpiConfig};

/// The bus every device shares
pub type Bus = Spi<'static, SPI0, Async>;

pub type SharedBus = Mutex<CriticalSectionRawMutex, Bus>;

/// Display chip select, driven by the transfer task
pub type DisplayDevice = SpiDeviceWithConfig<'static, CriticalSectionRawMutex, Bus, Output<'static>>;

/// Error reported for a display unit
pub type TransferError = SpiDeviceError<spi::Error, core::convert::Infallible>;

/// Bus settings for one device
pub fn bus_config(config: &SpiConfig) -> spi::Config {
    let mut bus = spi::Config::default();
    bus.frequency = config.frequency;
    bus.polarity = match config.polarity {
        Polarity::IdleLow => spi::Polarity::IdleLow,
        Polarity::IdleHigh => spi::Polarity::IdleHigh,
    };
    bus.phase = match config.phase {
        Phase::CaptureOnFirstTransition => spi::Phase::CaptureOnFirstTransition,
        Phase::CaptureOnSecondTransition => spi::Phase::CaptureOnSecondTransition,
    };
    bus
}

/// Blocking chip select on the shared bus, with its own clock and mode
pub struct ClockedDevice {
    bus: &'static SharedBus,
    cs: Output<'static>,
    config: spi::Config,
}

impl ClockedDevice {
    pub fn new(bus: &'static SharedBus, cs: Output<'static>, config: spi::Config) -> Self {
        Self { bus, cs, config }
    }

    /// Change the clock used from the next transaction on
    pub fn set_frequency(&mut self, hz: u32) {
        self.config.frequency = hz;
    }
}

impl ErrorType for ClockedDevice {
    type Error = spi::Error;
}

impl SpiDevice<u8> for ClockedDevice {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        // The transfer task holds the lock for one DMA unit at most
        let mut bus = loop {
            if let Ok(bus) = self.bus.try_lock() {
                break bus;
            }
        };
        bus.set_config(&self.config);

        self.cs.set_low();
        let result = run_operations(&mut bus, operations);
        let flushed = embedded_hal::spi::SpiBus::flush(&mut *bus);
        self.cs.set_high();

        result.and(flushed)
    }
}

fn run_operations(bus: &mut Bus, operations: &mut [Operation<'_, u8>]) -> Result<(), spi::Error> {
    for operation in operations {
        match operation {
            Operation::Read(words) => bus.blocking_read(words)?,
            Operation::Write(words) => bus.blocking_write(words)?,
            Operation::Transfer(read, write) => bus.blocking_transfer(read, write)?,
            Operation::TransferInPlace(words) => bus.blocking_transfer_in_place(words)?,
            Operation::DelayNs(ns) => {
                embedded_hal::spi::SpiBus::flush(bus)?;
                block_for(Duration::from_nanos(u64::from(*ns)));
            }
        }
    }
    Ok(())
}
