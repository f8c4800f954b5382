//! Hardware driver implementations
//!
//! This crate provides the display driver built on the traits in
//! `lumen-hal` and the pixel types in `lumen-core`:
//!
//! - ST7789 320x240 TFT over SPI (bring-up, windowed blits, solid fills)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod display;

pub use display::{Config, DisplayDriver, DisplayError, InFlight};
