//! Board configuration
//!
//! Configuration types with reference-board defaults, and a parser for the
//! TOML board file embedded in the firmware image.

pub mod parse;
pub mod types;

pub use parse::{parse_config, ParseError};
pub use types::*;
