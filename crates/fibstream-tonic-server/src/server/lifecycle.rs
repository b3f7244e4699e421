//! Request admission and coordinated shutdown.
//!
//! [`Lifecycle`] tracks how many requests are in flight, refuses new ones once
//! shutdown starts, and owns the shutdown [`CancellationToken`]. Every request
//! gets a child of that token, so cancelling it reaches every running
//! computation while a single request can still be cancelled on its own.

use core::{future::Future, time::Duration};
use fibstream_tonic_core::Error;
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct Lifecycle {
    shutdown_token: CancellationToken,
    draining: AtomicBool,
    inflight: AtomicUsize,
}

/// Marks one admitted request. Dropping it releases the slot.
#[derive(Debug)]
pub struct InflightGuard {
    lifecycle: Arc<Lifecycle>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.lifecycle.inflight.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceShutdown`] once shutdown has started.
    pub fn admit(self: &Arc<Self>) -> Result<InflightGuard, Error> {
        // Count first so a concurrent drain either sees this request or we
        // see the draining flag.
        self.inflight.fetch_add(1, Ordering::AcqRel);
        let guard = InflightGuard {
            lifecycle: Arc::clone(self),
        };

        if self.is_shutting_down() {
            return Err(Error::ServiceShutdown);
        }
        Ok(guard)
    }

    /// A fresh cancellation token for one request, cancelled with the
    /// shutdown token.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown_token.child_token()
    }

    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Acquire)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.draining.load(Ordering::Acquire) || self.shutdown_token.is_cancelled()
    }

    /// Whether running computations have been cancelled by shutdown.
    pub fn is_cancelled(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Attributes a cancelled request to shutdown when the shutdown token
    /// fired, otherwise leaves the error as is.
    pub fn classify(&self, err: Error) -> Error {
        match err {
            Error::RequestCancelled if self.is_cancelled() => Error::ServiceShutdown,
            other => other,
        }
    }

    /// Stops admitting requests.
    pub fn refuse_new(&self) {
        self.draining.store(true, Ordering::Release);
    }

    /// Stops admitting requests and cancels everything in flight.
    pub fn terminate(&self) {
        self.refuse_new();
        self.shutdown_token.cancel();
    }

    /// Gracefully shuts down.
    ///
    /// - Refuses new requests.
    /// - Waits up to `drain_timeout` for in-flight requests to finish, or
    ///   until `abort` resolves.
    /// - Cancels whatever is still running.
    pub async fn shutdown<A>(&self, drain_timeout: Duration, abort: A)
    where
        A: Future<Output = ()>,
    {
        // === Phase 0: Stop accepting new requests ===
        #[cfg(feature = "tracing")]
        tracing::info!("Refusing new requests");
        self.refuse_new();

        // === Phase 1: Wait for in-flight requests to drain ===
        #[cfg(feature = "tracing")]
        tracing::info!("Draining in-flight requests ({} active)", self.inflight());
        let drain = timeout(drain_timeout, async {
            while self.inflight() > 0 {
                sleep(Duration::from_millis(100)).await;
            }
        });

        tokio::select! {
            res = drain => match res {
                Ok(()) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("All in-flight requests drained successfully");
                }
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        "Graceful drain timed out ({} requests still active)",
                        self.inflight()
                    );
                }
            },
            () = abort => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Drain aborted ({} requests still active)", self.inflight());
            }
        }

        // === Phase 2: Cancel any remaining work ===
        #[cfg(feature = "tracing")]
        tracing::debug!("Cancelling remaining work via shutdown token");
        self.shutdown_token.cancel();
    }
}
