//! Schema module - Frame data and configuration types for growth-form packing.

mod config;
mod frame;

pub use config::*;
pub use frame::*;
