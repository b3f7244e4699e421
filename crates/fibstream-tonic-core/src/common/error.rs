//! Error types for the Fibonacci gRPC service.
//!
//! [`Error`] is what the service layer works with. Engine failures are folded
//! into it with `From<fibstream::Error<Error>>`, and it converts into a
//! [`tonic::Status`] with the matching gRPC code.
//!
//! ## Error Cases
//! - `InvalidRequest`: `n` or `chunk_size` is outside the configured limits.
//! - `RequestCancelled`: The client went away before the call finished.
//! - `ServiceShutdown`: The request was refused or aborted by shutdown.
//! - `ChannelError`: A computed chunk could not be handed to the response
//!   stream.
//! - `Internal`: Anything else, including a panicked computation task.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the Fibonacci service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// Internal channel send failure, usually a disconnected client.
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The client aborted the request.
    #[error("Request cancelled by client")]
    RequestCancelled,

    /// The client request was outside the configured limits.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,

    /// Unclassified failure.
    #[error("Internal error: {context}")]
    Internal { context: String },
}

impl From<fibstream::Error<Error>> for Error {
    fn from(err: fibstream::Error<Error>) -> Self {
        use fibstream::Error as Engine;

        match err {
            Engine::DeliveryFailed(e) => e,
            Engine::CancellationRequested => Self::RequestCancelled,
            Engine::Internal { context } => Self::Internal { context },
            e if e.is_invalid_request() => Self::InvalidRequest {
                reason: e.to_string(),
            },
            e => Self::Internal {
                context: e.to_string(),
            },
        }
    }
}

impl From<fibstream::Error> for Error {
    fn from(err: fibstream::Error) -> Self {
        err.widen::<Self>().into()
    }
}

impl From<fibstream::BoundsError> for Error {
    fn from(err: fibstream::BoundsError) -> Self {
        Self::InvalidRequest {
            reason: err.to_string(),
        }
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::ChannelError { context } => Status::internal(format!("Channel error: {context}")),
            Error::RequestCancelled => Status::cancelled("Request was cancelled"),
            Error::InvalidRequest { reason } => Status::invalid_argument(reason),
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
            Error::Internal { context } => Status::internal(context),
        }
    }
}
