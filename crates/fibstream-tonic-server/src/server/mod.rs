//! Server-side components of the fibstream gRPC service.
//!
//! - [`config`] - CLI/environment configuration.
//! - [`lifecycle`] - Request admission, draining and shutdown cancellation.
//! - [`service`] - The `FibonacciService` implementation.
//! - [`streaming`] - Forwarding of computed chunks to the response stream.
//! - [`telemetry`] - Logging, tracing and metrics setup.

pub mod config;
pub mod lifecycle;
pub mod service;
pub mod streaming;
pub mod telemetry;
