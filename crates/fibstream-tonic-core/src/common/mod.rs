//! Definitions shared by the fibstream gRPC server and its clients.
//!
//! - [`error`] - Transport error type and its mapping onto `tonic::Status`.
//! - [`proto`] - Generated protobuf messages, client and server stubs.

pub mod error;

/// gRPC service and message definitions generated from
/// `proto/fibonacci.proto`.
pub mod proto {
    tonic::include_proto!("fibonacci");

    /// Encoded file descriptor set, registered with the reflection service.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("fibonacci_descriptor");
}

pub use error::*;
