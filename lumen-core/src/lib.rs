//! Board-agnostic core logic for the Lumen display firmware
//!
//! This crate contains everything that does not depend on a specific
//! display controller or chip:
//!
//! - Packed RGB565 colour and the named palette
//! - Surface dimensions and rectangles
//! - 24-bit bitmap parsing and decoding
//! - Board configuration types and parser
//! - Frame composition for the sprite demo

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod bitmap;
pub mod color;
pub mod config;
pub mod geometry;
pub mod scene;

pub use color::Rgb565;
pub use geometry::{Area, HEIGHT, WIDTH};
