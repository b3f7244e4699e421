use core::time::Duration;

/// Receives observations about successfully completed engine calls.
///
/// Implementations must be cheap and must never fail or block the caller.
/// Anything that can go wrong while exporting (a full queue, a missing
/// exporter) is the sink's problem to swallow.
pub trait MetricsSink {
    /// A [`compute_sequence`](crate::Engine::compute_sequence) call for `n`
    /// values finished in `elapsed`.
    fn record_sequence(&self, n: usize, elapsed: Duration);

    /// A [`compute_stream`](crate::Engine::compute_stream) call for `n` values
    /// in chunks of `chunk_size` finished in `elapsed`.
    fn record_stream(&self, n: usize, chunk_size: usize, elapsed: Duration);
}

/// A sink that drops every observation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_sequence(&self, _n: usize, _elapsed: Duration) {}

    fn record_stream(&self, _n: usize, _chunk_size: usize, _elapsed: Duration) {}
}

impl<M: MetricsSink + ?Sized> MetricsSink for &M {
    fn record_sequence(&self, n: usize, elapsed: Duration) {
        (**self).record_sequence(n, elapsed);
    }

    fn record_stream(&self, n: usize, chunk_size: usize, elapsed: Duration) {
        (**self).record_stream(n, chunk_size, elapsed);
    }
}

impl<M: MetricsSink + ?Sized> MetricsSink for std::sync::Arc<M> {
    fn record_sequence(&self, n: usize, elapsed: Duration) {
        (**self).record_sequence(n, elapsed);
    }

    fn record_stream(&self, n: usize, chunk_size: usize, elapsed: Duration) {
        (**self).record_stream(n, chunk_size, elapsed);
    }
}
