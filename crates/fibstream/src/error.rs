use core::{convert::Infallible, fmt};

/// A result type whose error defaults to an engine [`Error`] with no delivery
/// failure.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Which side of a configured range a value fell outside of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bound {
    /// The value must be less than or equal to the contained limit.
    AtMost(usize),
    /// The value must be greater than or equal to the contained limit.
    AtLeast(usize),
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtMost(limit) => write!(f, "must not exceed {limit}"),
            Self::AtLeast(limit) => write!(f, "must be at least {limit}"),
        }
    }
}

/// A request that was rejected before any computation started.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum BoundsError {
    /// The requested sequence length is negative.
    #[error("n must not be negative (got {n})")]
    NegativeN { n: i64 },

    /// The requested sequence length exceeds the applicable limit.
    #[error("n {n} is too large: must not exceed {limit}")]
    TooLargeN { n: i64, limit: usize },

    /// The requested chunk size is outside `[min_chunk_size, max_chunk_size]`.
    #[error("invalid chunk size {chunk_size}: {bound}")]
    InvalidChunkSize { chunk_size: i64, bound: Bound },
}

/// All errors the engine can report.
///
/// The generic parameter `E` is the error type of the delivery callback used
/// by [`crate::Engine::compute_stream`]. It is carried through
/// [`Error::DeliveryFailed`] untouched, so a caller gets back exactly the value
/// its callback returned. Operations without a callback use the default
/// [`Infallible`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error<E = Infallible> {
    /// See [`BoundsError::NegativeN`].
    #[error("n must not be negative (got {n})")]
    NegativeN { n: i64 },

    /// See [`BoundsError::TooLargeN`].
    #[error("n {n} is too large: must not exceed {limit}")]
    TooLargeN { n: i64, limit: usize },

    /// See [`BoundsError::InvalidChunkSize`].
    #[error("invalid chunk size {chunk_size}: {bound}")]
    InvalidChunkSize { chunk_size: i64, bound: Bound },

    /// The cancellation signal was observed before the operation completed.
    /// Partial results are discarded.
    #[error("cancellation requested")]
    CancellationRequested,

    /// The delivery callback failed. The stream stopped at that chunk.
    #[error("delivery failed: {0}")]
    DeliveryFailed(E),

    /// Anything that does not fit the kinds above.
    #[error("internal failure: {context}")]
    Internal { context: String },
}

impl<E> Error<E> {
    /// Returns `true` for the kinds produced by bounds validation.
    pub const fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            Self::NegativeN { .. } | Self::TooLargeN { .. } | Self::InvalidChunkSize { .. }
        )
    }

    /// Extracts the delivery callback's own error, if that is what stopped the
    /// stream.
    pub fn into_delivery(self) -> Option<E> {
        match self {
            Self::DeliveryFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl Error {
    /// Re-types an error from a callback-free operation into the error type
    /// of a streaming call.
    pub fn widen<F>(self) -> Error<F> {
        match self {
            Self::NegativeN { n } => Error::NegativeN { n },
            Self::TooLargeN { n, limit } => Error::TooLargeN { n, limit },
            Self::InvalidChunkSize { chunk_size, bound } => {
                Error::InvalidChunkSize { chunk_size, bound }
            }
            Self::CancellationRequested => Error::CancellationRequested,
            Self::DeliveryFailed(never) => match never {},
            Self::Internal { context } => Error::Internal { context },
        }
    }
}

impl<E> From<BoundsError> for Error<E> {
    fn from(err: BoundsError) -> Self {
        match err {
            BoundsError::NegativeN { n } => Self::NegativeN { n },
            BoundsError::TooLargeN { n, limit } => Self::TooLargeN { n, limit },
            BoundsError::InvalidChunkSize { chunk_size, bound } => {
                Self::InvalidChunkSize { chunk_size, bound }
            }
        }
    }
}
