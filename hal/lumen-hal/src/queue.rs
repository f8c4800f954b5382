//! Blocking `QueuedSpi` adapter
//!
//! Wraps an `embedded_hal` [`SpiDevice`] and the D/C output pin. Each
//! transaction is clocked out as soon as it is queued; its completion is
//! parked in a FIFO so callers still collect results one per unit, in
//! submission order, exactly as they would from
//! [`ChannelQueue`](crate::channel::ChannelQueue). Nothing overlaps with
//! the caller; use it where there is no DMA worker to hand units to.

use embedded_hal::digital::{OutputPin, PinState};
use embedded_hal::spi::SpiDevice;
use heapless::Deque;

use crate::spi::{QueuedSpi, SpiConfig, Transaction};

/// Queue depth used by the display pipeline
pub const DEFAULT_QUEUE_DEPTH: usize = 12;

/// Errors from the blocking queue adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueError<SpiErr, DcErr> {
    /// SPI bus error
    Spi(SpiErr),
    /// D/C pin error
    Dc(DcErr),
    /// More transactions queued than the queue depth allows
    QueueFull,
    /// Result requested with no transaction in flight
    NothingQueued,
}

/// `QueuedSpi` over an `embedded_hal` SPI device and a D/C pin
pub struct SpiDeviceQueue<SPI, DC, const N: usize = DEFAULT_QUEUE_DEPTH>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
{
    spi: SPI,
    dc: DC,
    depth: usize,
    completions: Deque<Result<(), QueueError<SPI::Error, DC::Error>>, N>,
}

impl<SPI, DC, const N: usize> SpiDeviceQueue<SPI, DC, N>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
{
    /// Create a new adapter using all `N` queue slots
    pub fn new(spi: SPI, dc: DC) -> Self {
        Self {
            spi,
            dc,
            depth: N,
            completions: Deque::new(),
        }
    }

    /// Create a new adapter with the queue depth from `config`, capped at `N`
    pub fn with_config(spi: SPI, dc: DC, config: &SpiConfig) -> Self {
        Self {
            depth: config.bounded_queue_depth(N),
            ..Self::new(spi, dc)
        }
    }

    /// Completions waiting to be collected
    pub fn pending(&self) -> usize {
        self.completions.len()
    }

    /// Release the SPI device and D/C pin
    pub fn release(self) -> (SPI, DC) {
        (self.spi, self.dc)
    }

    /// Drive D/C from the transaction, then clock its bytes
    fn dispatch(
        &mut self,
        transaction: &Transaction<'_>,
    ) -> Result<(), QueueError<SPI::Error, DC::Error>> {
        let level = PinState::from(transaction.dc().is_high());
        self.dc.set_state(level).map_err(QueueError::Dc)?;

        if transaction.is_empty() {
            return Ok(());
        }
        self.spi
            .write(transaction.bytes())
            .map_err(QueueError::Spi)
    }
}

impl<SPI, DC, const N: usize> QueuedSpi for SpiDeviceQueue<SPI, DC, N>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
{
    type Error = QueueError<SPI::Error, DC::Error>;

    fn queue_depth(&self) -> usize {
        self.depth
    }

    fn polling_transmit(&mut self, transaction: &Transaction<'_>) -> Result<(), Self::Error> {
        self.dispatch(transaction)
    }

    fn queue_transaction(&mut self, transaction: &Transaction<'_>) -> Result<(), Self::Error> {
        if self.completions.len() >= self.depth {
            return Err(QueueError::QueueFull);
        }
        let result = self.dispatch(transaction);
        // Cannot fail, depth never exceeds N
        let _ = self.completions.push_back(result);
        Ok(())
    }

    fn transaction_result(&mut self) -> Result<(), Self::Error> {
        self.completions
            .pop_front()
            .unwrap_or(Err(QueueError::NothingQueued))
    }
}
