//! The two public operations of the engine.
//!
//! [`Engine`] validates each request against its [`Limits`], hands valid
//! requests to the sequence generator or the chunk streamer, and reports the
//! duration of every successful call to its [`MetricsSink`].

use crate::{
    bounds::{Limits, LimitsError},
    cancel::CancelSignal,
    digits::DigitString,
    error::{Error, Result},
    metrics::{MetricsSink, NoopMetrics},
    sequence::generate,
    stream::stream_chunks,
};
use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Validates, computes and measures Fibonacci requests.
///
/// An engine holds no per-request state: it can be shared between threads
/// (for example behind an [`Arc`](std::sync::Arc)) and called concurrently.
/// Every call owns its own buffers and runs to completion on the calling
/// thread.
///
/// # Example
///
/// ```
/// use fibstream::{Engine, Limits, NeverCancel};
///
/// let engine = Engine::new(Limits::default()).unwrap();
///
/// let seq = engine.compute_sequence(10, &NeverCancel).unwrap();
/// assert_eq!(seq.last().unwrap(), "34");
///
/// let mut starts = Vec::new();
/// engine
///     .compute_stream(10, 5, &NeverCancel, |chunk, start| {
///         starts.push((start, chunk.len()));
///         Ok::<_, std::convert::Infallible>(())
///     })
///     .unwrap();
/// assert_eq!(starts, [(0, 5), (5, 5)]);
/// ```
#[derive(Clone, Debug)]
pub struct Engine<M = NoopMetrics> {
    limits: Limits,
    metrics: M,
}

impl Engine {
    /// Creates an engine that discards its metrics.
    ///
    /// # Errors
    ///
    /// Returns a [`LimitsError`] if `limits` admits no chunk size.
    pub fn new(limits: Limits) -> Result<Self, LimitsError> {
        Self::with_metrics(limits, NoopMetrics)
    }
}

impl<M: MetricsSink> Engine<M> {
    /// Creates an engine that reports to `metrics`.
    ///
    /// # Errors
    ///
    /// Returns a [`LimitsError`] if `limits` admits no chunk size.
    pub fn with_metrics(limits: Limits, metrics: M) -> Result<Self, LimitsError> {
        limits.validate()?;
        Ok(Self { limits, metrics })
    }

    /// The limits this engine enforces.
    pub const fn limits(&self) -> &Limits {
        &self.limits
    }

    /// The metrics sink this engine reports to.
    pub const fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Returns the first `n` Fibonacci numbers.
    ///
    /// # Errors
    ///
    /// - [`Error::NegativeN`] / [`Error::TooLargeN`] if `n` is outside
    ///   `0..=n_limit`. Nothing is computed.
    /// - [`Error::CancellationRequested`] if `cancel` is raised while
    ///   computing.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, cancel), err))]
    pub fn compute_sequence<C>(&self, n: i64, cancel: &C) -> Result<Vec<DigitString>>
    where
        C: CancelSignal + ?Sized,
    {
        let len = self.limits.check_sequence(n)?;

        let start = Instant::now();
        let seq = generate(len, cancel)?;
        self.metrics.record_sequence(len, start.elapsed());

        Ok(seq)
    }

    /// Streams the first `n` Fibonacci numbers to `deliver` in chunks of
    /// `chunk_size`.
    ///
    /// `deliver` gets a borrowed slice of the chunk and the sequence index of
    /// its first element. The slice is only valid for the duration of the
    /// call; clone whatever needs to outlive it.
    ///
    /// # Errors
    ///
    /// - [`Error::NegativeN`], [`Error::TooLargeN`] (against
    ///   `stream_n_limit`) or [`Error::InvalidChunkSize`] before any delivery.
    /// - [`Error::CancellationRequested`] if `cancel` is raised between chunks.
    /// - [`Error::DeliveryFailed`] carrying the callback's error unchanged.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, cancel, deliver))
    )]
    pub fn compute_stream<C, F, E>(
        &self,
        n: i64,
        chunk_size: i64,
        cancel: &C,
        deliver: F,
    ) -> Result<(), Error<E>>
    where
        C: CancelSignal + ?Sized,
        F: FnMut(&[DigitString], usize) -> Result<(), E>,
    {
        let (len, chunk_size) = self.limits.check_stream(n, chunk_size)?;

        let start = Instant::now();
        stream_chunks(len, chunk_size, cancel, deliver)?;
        self.metrics.record_stream(len, chunk_size, start.elapsed());

        Ok(())
    }
}
