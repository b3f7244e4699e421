#![doc = include_str!("../README.md")]

mod common;
pub use common::*;
// Public re-export so downstream crates can reach the engine via
// `fibstream_tonic_core::fibstream`
pub use fibstream;
