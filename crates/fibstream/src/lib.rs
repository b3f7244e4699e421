#![doc = include_str!("../README.md")]

mod bounds;
mod cancel;
mod digits;
mod engine;
mod error;
mod metrics;
mod sequence;
mod stream;

pub use crate::bounds::*;
pub use crate::cancel::*;
pub use crate::digits::*;
pub use crate::engine::*;
pub use crate::error::*;
pub use crate::metrics::*;
pub use crate::sequence::*;
pub use crate::stream::*;
