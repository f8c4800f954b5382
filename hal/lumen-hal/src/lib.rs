//! Lumen Hardware Abstraction Layer
//!
//! This crate defines the bus and storage abstractions that the display
//! pipeline and the bitmap loader are written against. Chip-specific code
//! (the firmware) only has to provide an `embedded-hal` SPI device, a few
//! output pins and a block device.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (lumen-firmware)           │
//! └─────────────────────────────────────────┘
//!            │                    │
//!            ▼                    ▼
//! ┌───────────────────┐  ┌───────────────────┐
//! │  lumen-drivers    │  │  lumen-core       │
//! │  (ST7789 blits)   │  │  (BMP decoding)   │
//! └───────────────────┘  └───────────────────┘
//!            │                    │
//!            ▼                    ▼
//! ┌─────────────────────────────────────────┐
//! │  lumen-hal (this crate - traits)        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`spi::QueuedSpi`] - tagged command/data transfers with a FIFO queue
//! - [`storage::FileStorage`] - read-only file access
//!
//! # Adapters
//!
//! - [`queue::SpiDeviceQueue`] - `QueuedSpi` over any `embedded_hal` `SpiDevice`
//! - [`channel::ChannelQueue`] - `QueuedSpi` fed to a DMA transfer worker
//! - `sdmmc::SdmmcStorage` - `FileStorage` over `embedded-sdmmc` (feature `sdmmc`)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod channel;
pub mod queue;
pub mod spi;
pub mod storage;

#[cfg(feature = "sdmmc")]
pub mod sdmmc;

// Re-export key traits at crate root for convenience
pub use channel::{ChannelError, ChannelQueue, TransferChannels, TransferRequest};
pub use queue::{QueueError, SpiDeviceQueue};
pub use spi::{DcLevel, QueuedSpi, SpiConfig, Transaction, MAX_TRANSFER_SIZE};
pub use storage::{FileStorage, StorageError};
