//! Core data types and unit conversions for the Orion bridge
//!
//! This crate provides the observation record model shared between the
//! acquisition pipeline and downstream consumers, along with the exact
//! unit-conversion tables for the MicroServer's unit vocabulary.

pub mod pipeline;
pub mod types;
pub mod units;

pub use pipeline::*;
pub use types::*;
pub use units::*;
