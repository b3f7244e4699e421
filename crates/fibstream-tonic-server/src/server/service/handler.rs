//! gRPC service implementation for Fibonacci sequences.
//!
//! [`SequenceService`] implements the generated [`FibonacciService`] trait on
//! top of a shared [`Engine`]. Computation is CPU-bound and synchronous, so
//! every call runs on tokio's blocking pool and talks back to the async side
//! through its return value (unary) or a bounded channel (streaming).
//!
//! ## Responsibilities
//!
//! - Admit or refuse requests through the shared [`Lifecycle`].
//! - Give each request its own cancellation token, derived from the shutdown
//!   token and cancelled when the client goes away.
//! - Map engine failures onto gRPC statuses.

use crate::server::{
    config::ServerConfig,
    lifecycle::Lifecycle,
    streaming::coordinator::feed_chunks,
    telemetry::{
        Method, OtelMetrics, decrement_streams_inflight, increment_errors, increment_requests,
        increment_streams_inflight,
    },
};
use core::{pin::Pin, time::Duration};
use fibstream::{Engine, LimitsError};
use fibstream_tonic_core::{
    Error,
    proto::{
        FibonacciChunk, FibonacciRequest, FibonacciResponse, FibonacciStreamRequest,
        fibonacci_service_server::FibonacciService,
    },
};
use futures::TryStreamExt;
use std::sync::Arc;
use tokio::{runtime::Handle, sync::mpsc, task::JoinError};
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tonic::{Request, Response, Status};

/// How long a failed stream waits for room to report its final error.
const ERROR_DELIVERY_TIMEOUT: Duration = Duration::from_secs(1);

/// The `FibonacciService` gRPC service.
///
/// Cheap to clone: the engine and lifecycle are shared.
#[derive(Clone)]
pub struct SequenceService {
    config: ServerConfig,
    engine: Arc<Engine<OtelMetrics>>,
    lifecycle: Arc<Lifecycle>,
}

impl SequenceService {
    /// Creates the service with the limits from `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`LimitsError`] if the configured chunk bounds are unusable.
    pub fn new(config: ServerConfig) -> Result<Self, LimitsError> {
        let engine = Engine::with_metrics(config.limits, OtelMetrics)?;
        Ok(Self {
            config,
            engine: Arc::new(engine),
            lifecycle: Arc::new(Lifecycle::new()),
        })
    }

    #[cfg(test)]
    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    /// Graceful shutdown: refuse new requests, drain for at most the
    /// configured timeout (or until `abort` resolves), then cancel the rest.
    pub async fn shutdown<A>(&self, abort: A)
    where
        A: Future<Output = ()>,
    {
        self.lifecycle
            .shutdown(self.config.shutdown_timeout, abort)
            .await;
    }

    /// Immediate shutdown: refuse new requests and cancel everything running.
    pub fn terminate(&self) {
        self.lifecycle.terminate();
    }

    fn fail(&self, method: Method, err: Error) -> Status {
        increment_errors(method);
        let err = self.lifecycle.classify(err);
        #[cfg(feature = "tracing")]
        tracing::warn!("{method:?} failed: {err}");
        err.into()
    }
}

fn join_failure(err: JoinError) -> Error {
    Error::Internal {
        context: format!("Computation task failed: {err}"),
    }
}

#[tonic::async_trait]
impl FibonacciService for SequenceService {
    type FibonacciStreamStream =
        Pin<Box<dyn Stream<Item = Result<FibonacciChunk, Status>> + Send>>;

    /// Returns the first `n` Fibonacci numbers in one response.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(n = req.get_ref().n)))]
    async fn fibonacci(
        &self,
        req: Request<FibonacciRequest>,
    ) -> Result<Response<FibonacciResponse>, Status> {
        let method = Method::Fibonacci;
        increment_requests(method);

        let inflight = self
            .lifecycle
            .admit()
            .map_err(|e| self.fail(method, e))?;

        let n = i64::from(req.get_ref().n);
        let token = self.lifecycle.request_token();
        // Cancels the computation if this future is dropped, i.e. the client
        // disconnected.
        let _cancel_on_drop = token.clone().drop_guard();

        let engine = Arc::clone(&self.engine);
        #[cfg(feature = "tracing")]
        let span = tracing::Span::current();
        // The slot is held by the computation, not by this future, so a
        // client disconnect does not end the drain early.
        let result = tokio::task::spawn_blocking(move || {
            #[cfg(feature = "tracing")]
            let _entered = span.enter();
            let _inflight = inflight;
            engine.compute_sequence(n, &token)
        })
        .await
        .map_err(join_failure)
        .and_then(|res| res.map_err(Error::from));

        match result {
            Ok(seq) => Ok(Response::new(FibonacciResponse {
                values: seq.into_iter().map(String::from).collect(),
            })),
            Err(e) => Err(self.fail(method, e)),
        }
    }

    /// Streams the first `n` Fibonacci numbers in chunks of `chunk_size`.
    ///
    /// Bounds are checked before the stream opens, so an invalid request
    /// fails the call itself. Failures after that arrive as the last item of
    /// the stream.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            skip_all,
            fields(n = req.get_ref().n, chunk_size = req.get_ref().chunk_size)
        )
    )]
    async fn fibonacci_stream(
        &self,
        req: Request<FibonacciStreamRequest>,
    ) -> Result<Response<Self::FibonacciStreamStream>, Status> {
        let method = Method::FibonacciStream;
        increment_requests(method);

        let inflight = self
            .lifecycle
            .admit()
            .map_err(|e| self.fail(method, e))?;

        let FibonacciStreamRequest { n, chunk_size } = req.into_inner();
        self.engine
            .limits()
            .check_stream(i64::from(n), i64::from(chunk_size))
            .map_err(|e| self.fail(method, e.into()))?;

        let token = self.lifecycle.request_token();
        let cancel_on_drop = token.clone().drop_guard();
        let (resp_tx, resp_rx) =
            mpsc::channel::<Result<FibonacciChunk, Status>>(self.config.stream_buffer_size);

        let engine = Arc::clone(&self.engine);
        let lifecycle = Arc::clone(&self.lifecycle);
        #[cfg(feature = "tracing")]
        let span = tracing::info_span!("streaming");

        let handle = Handle::current();
        increment_streams_inflight();
        tokio::task::spawn_blocking(move || {
            #[cfg(feature = "tracing")]
            let _entered = span.enter();

            let result = feed_chunks(&handle, &engine, n, chunk_size, &token, &resp_tx);
            decrement_streams_inflight();
            drop(inflight);

            if let Err(e) = result {
                let e = lifecycle.classify(e);
                #[cfg(feature = "tracing")]
                tracing::warn!("Stream ended early: {e}");

                // Best effort: a client that went away, or one that stopped
                // reading, cannot be told.
                let sent = handle.block_on(tokio::time::timeout(
                    ERROR_DELIVERY_TIMEOUT,
                    resp_tx.send(Err(e.into())),
                ));
                if !matches!(sent, Ok(Ok(()))) {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Failed to forward stream error");
                }
            }
        });

        let stream = ReceiverStream::new(resp_rx)
            .inspect_ok(move |_chunk| {
                // Lives as long as the response stream.
                let _guard = &cancel_on_drop;
            })
            .inspect_err(move |_e| increment_errors(method));

        Ok(Response::new(Box::pin(stream)))
    }
}
