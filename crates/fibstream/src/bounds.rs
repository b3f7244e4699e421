use crate::error::{Bound, BoundsError};

/// Default upper bound on `n` for a fully materialized sequence.
pub const DEFAULT_N_LIMIT: usize = 500;

/// Default upper bound on `n` for a streamed sequence.
pub const DEFAULT_STREAM_N_LIMIT: usize = 1000;

/// Default smallest accepted chunk size.
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 5;

/// Default largest accepted chunk size.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 100;

/// Numeric limits enforced on every request before work starts.
///
/// Limits are fixed when an [`Engine`](crate::Engine) is built and never change
/// for its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Largest `n` accepted by [`Engine::compute_sequence`](crate::Engine::compute_sequence).
    pub n_limit: usize,
    /// Largest `n` accepted by [`Engine::compute_stream`](crate::Engine::compute_stream).
    pub stream_n_limit: usize,
    /// Smallest accepted chunk size (inclusive).
    pub min_chunk_size: usize,
    /// Largest accepted chunk size (inclusive).
    pub max_chunk_size: usize,
}

/// A [`Limits`] value that would make the engine unusable.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LimitsError {
    #[error("min_chunk_size must be at least 1")]
    ZeroMinChunkSize,

    #[error("min_chunk_size ({min}) must not exceed max_chunk_size ({max})")]
    InvertedChunkRange { min: usize, max: usize },
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            n_limit: DEFAULT_N_LIMIT,
            stream_n_limit: DEFAULT_STREAM_N_LIMIT,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}

impl Limits {
    /// Checks that the limits admit at least one chunk size.
    ///
    /// # Errors
    ///
    /// Returns a [`LimitsError`] if `min_chunk_size` is zero or greater than
    /// `max_chunk_size`.
    pub const fn validate(&self) -> Result<(), LimitsError> {
        if self.min_chunk_size == 0 {
            return Err(LimitsError::ZeroMinChunkSize);
        }
        if self.min_chunk_size > self.max_chunk_size {
            return Err(LimitsError::InvertedChunkRange {
                min: self.min_chunk_size,
                max: self.max_chunk_size,
            });
        }
        Ok(())
    }

    /// Validates a full-sequence request and returns `n` as a length.
    ///
    /// # Errors
    ///
    /// [`BoundsError::NegativeN`] if `n < 0`, then [`BoundsError::TooLargeN`]
    /// if `n > n_limit`.
    pub fn check_sequence(&self, n: i64) -> Result<usize, BoundsError> {
        check_n(n, self.n_limit)
    }

    /// Validates a streaming request and returns `(n, chunk_size)` as lengths.
    ///
    /// Checks run in a fixed order: negative `n`, `n` above `stream_n_limit`,
    /// chunk size above `max_chunk_size`, chunk size below `min_chunk_size`.
    /// The first violation wins.
    ///
    /// # Errors
    ///
    /// Returns the first [`BoundsError`] encountered.
    pub fn check_stream(&self, n: i64, chunk_size: i64) -> Result<(usize, usize), BoundsError> {
        let n = check_n(n, self.stream_n_limit)?;

        if chunk_size > to_i64(self.max_chunk_size) {
            return Err(BoundsError::InvalidChunkSize {
                chunk_size,
                bound: Bound::AtMost(self.max_chunk_size),
            });
        }

        // `min_chunk_size >= 1` for validated limits, which also rules out
        // zero and negative sizes here.
        let min = self.min_chunk_size.max(1);
        match usize::try_from(chunk_size) {
            Ok(size) if size >= min => Ok((n, size)),
            _ => Err(BoundsError::InvalidChunkSize {
                chunk_size,
                bound: Bound::AtLeast(min),
            }),
        }
    }
}

fn check_n(n: i64, limit: usize) -> Result<usize, BoundsError> {
    let Ok(len) = usize::try_from(n) else {
        return Err(BoundsError::NegativeN { n });
    };
    if len > limit {
        return Err(BoundsError::TooLargeN { n, limit });
    }
    Ok(len)
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: Limits = Limits {
        n_limit: 100,
        stream_n_limit: 200,
        min_chunk_size: 2,
        max_chunk_size: 10,
    };

    #[test]
    fn sequence_bounds() {
        assert_eq!(LIMITS.check_sequence(0), Ok(0));
        assert_eq!(LIMITS.check_sequence(100), Ok(100));
        assert_eq!(
            LIMITS.check_sequence(-5),
            Err(BoundsError::NegativeN { n: -5 })
        );
        assert_eq!(
            LIMITS.check_sequence(101),
            Err(BoundsError::TooLargeN { n: 101, limit: 100 })
        );
    }

    #[test]
    fn stream_uses_its_own_n_limit() {
        assert_eq!(LIMITS.check_stream(150, 4), Ok((150, 4)));
        assert_eq!(
            LIMITS.check_stream(201, 4),
            Err(BoundsError::TooLargeN { n: 201, limit: 200 })
        );
    }

    #[test]
    fn stream_chunk_size_bounds() {
        assert_eq!(LIMITS.check_stream(10, 2), Ok((10, 2)));
        assert_eq!(LIMITS.check_stream(10, 10), Ok((10, 10)));
        assert_eq!(
            LIMITS.check_stream(10, 11),
            Err(BoundsError::InvalidChunkSize {
                chunk_size: 11,
                bound: Bound::AtMost(10)
            })
        );
        assert_eq!(
            LIMITS.check_stream(10, 1),
            Err(BoundsError::InvalidChunkSize {
                chunk_size: 1,
                bound: Bound::AtLeast(2)
            })
        );
        assert_eq!(
            LIMITS.check_stream(10, -3),
            Err(BoundsError::InvalidChunkSize {
                chunk_size: -3,
                bound: Bound::AtLeast(2)
            })
        );
    }

    #[test]
    fn stream_checks_run_in_order() {
        // Both n and chunk size are bad: n is reported first.
        assert_eq!(
            LIMITS.check_stream(-1, 0),
            Err(BoundsError::NegativeN { n: -1 })
        );
        assert_eq!(
            LIMITS.check_stream(500, 50),
            Err(BoundsError::TooLargeN { n: 500, limit: 200 })
        );
    }

    #[test]
    fn rejects_unusable_limits() {
        assert_eq!(Limits::default().validate(), Ok(()));
        assert_eq!(
            Limits {
                min_chunk_size: 0,
                ..LIMITS
            }
            .validate(),
            Err(LimitsError::ZeroMinChunkSize)
        );
        assert_eq!(
            Limits {
                min_chunk_size: 20,
                ..LIMITS
            }
            .validate(),
            Err(LimitsError::InvertedChunkRange { min: 20, max: 10 })
        );
    }
}
