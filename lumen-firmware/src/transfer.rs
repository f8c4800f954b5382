//! Display transfer task
//!
//! Runs on the high-priority interrupt executor. Takes units from
//! [`CHANNELS`], drives D/C, clocks the bytes out by DMA and posts the
//! outcome back to the display queue.

use embassy_rp::gpio::{Level, Output};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal_async::spi::SpiDevice;
use lumen_hal::channel::{ChannelQueue, RequestBytes, TransferChannels};
use lumen_hal::queue::DEFAULT_QUEUE_DEPTH;

use crate::bus::{DisplayDevice, TransferError};

/// Queue between the display driver and the transfer task
pub static CHANNELS: TransferChannels<CriticalSectionRawMutex, TransferError, DEFAULT_QUEUE_DEPTH> =
    TransferChannels::new();

/// The display driver's end of [`CHANNELS`]
pub type DisplayQueue =
    ChannelQueue<'static, CriticalSectionRawMutex, TransferError, DEFAULT_QUEUE_DEPTH>;

#[embassy_executor::task]
pub async fn transfer_task(mut device: DisplayDevice, mut dc: Output<'static>) {
    loop {
        let request = CHANNELS.next_request().await;
        dc.set_level(if request.dc().is_high() {
            Level::High
        } else {
            Level::Low
        });

        let result = match *request.bytes() {
            RequestBytes::Inline { bytes, len } => device.write(&bytes[..usize::from(len)]).await,
            RequestBytes::Buffer { address, len } => {
                // SAFETY: the driver keeps the buffer alive and untouched
                // until this unit's completion is collected.
                let bytes = unsafe { core::slice::from_raw_parts(address as *const u8, len) };
                device.write(bytes).await
            }
        };

        CHANNELS.complete(&request, result).await;
    }
}
