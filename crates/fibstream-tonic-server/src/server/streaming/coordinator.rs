use crate::server::telemetry::OtelMetrics;
use fibstream::{DigitString, Engine};
use fibstream_tonic_core::{Error, proto::FibonacciChunk};
use tokio::{runtime::Handle, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// Runs a streamed computation and forwards every chunk to the response
/// channel.
///
/// Blocks the calling thread: run it on the blocking pool, with `handle`
/// captured from the runtime beforehand. Each chunk is copied out of the
/// engine's reused buffer into a [`FibonacciChunk`] and sent on `handle`, so a
/// slow client stalls the computation once `resp_tx` is full. A send waiting
/// on a full channel gives up as soon as `cancel` fires.
///
/// # Errors
///
/// - [`Error::InvalidRequest`] if `n` or `chunk_size` is out of bounds.
/// - [`Error::RequestCancelled`] if `cancel` fired between chunks or while a
///   chunk was waiting for room.
/// - [`Error::ChannelError`] if the client went away.
pub fn feed_chunks(
    handle: &Handle,
    engine: &Engine<OtelMetrics>,
    n: i32,
    chunk_size: i32,
    cancel: &CancellationToken,
    resp_tx: &mpsc::Sender<Result<FibonacciChunk, Status>>,
) -> fibstream_tonic_core::Result<()> {
    let deliver = |chunk: &[DigitString], start: usize| -> Result<(), Error> {
        let index = i32::try_from(start).map_err(|_| Error::Internal {
            context: format!("chunk index {start} does not fit the wire format"),
        })?;
        let msg = FibonacciChunk {
            index,
            values: chunk.iter().map(ToString::to_string).collect(),
        };

        handle.block_on(async {
            tokio::select! {
                biased;
                () = cancel.cancelled() => Err(Error::RequestCancelled),
                sent = resp_tx.send(Ok(msg)) => sent.map_err(|e| Error::ChannelError {
                    context: format!("Failed to forward chunk at index {index}: {e}"),
                }),
            }
        })
    };

    engine
        .compute_stream(i64::from(n), i64::from(chunk_size), cancel, deliver)
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fibstream::Limits;
    use std::thread;
    use tokio::runtime::{Builder, Runtime};

    const LIMITS: Limits = Limits {
        n_limit: 50,
        stream_n_limit: 100,
        min_chunk_size: 2,
        max_chunk_size: 10,
    };

    fn engine() -> Engine<OtelMetrics> {
        Engine::with_metrics(LIMITS, OtelMetrics).unwrap()
    }

    fn runtime() -> Runtime {
        Builder::new_current_thread().build().unwrap()
    }

    #[test]
    fn forwards_chunks_in_order() {
        let (tx, mut rx) = mpsc::channel(16);
        let token = CancellationToken::new();

        feed_chunks(runtime().handle(), &engine(), 10, 4, &token, &tx).unwrap();
        drop(tx);

        let mut chunks = Vec::new();
        while let Some(msg) = rx.blocking_recv() {
            chunks.push(msg.unwrap());
        }
        assert_eq!(
            chunks
                .iter()
                .map(|c| (c.index, c.values.len()))
                .collect::<Vec<_>>(),
            [(0, 4), (4, 4), (8, 2)]
        );
        assert_eq!(chunks[2].values, ["21", "34"]);
    }

    #[test]
    fn closed_receiver_is_a_channel_error() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let token = CancellationToken::new();

        let err = feed_chunks(runtime().handle(), &engine(), 10, 4, &token, &tx).unwrap_err();
        assert!(matches!(err, Error::ChannelError { .. }), "{err:?}");
    }

    #[test]
    fn cancelled_token_stops_before_delivery() {
        let (tx, mut rx) = mpsc::channel(16);
        let token = CancellationToken::new();
        token.cancel();

        let err = feed_chunks(runtime().handle(), &engine(), 10, 4, &token, &tx).unwrap_err();
        assert_eq!(err, Error::RequestCancelled);
        drop(tx);
        assert!(rx.blocking_recv().is_none());
    }

    #[test]
    fn out_of_bounds_is_invalid() {
        let (tx, _rx) = mpsc::channel(16);
        let token = CancellationToken::new();

        let err = feed_chunks(runtime().handle(), &engine(), 101, 4, &token, &tx).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }), "{err:?}");
    }

    #[test]
    fn cancel_interrupts_a_send_waiting_for_room() {
        let rt = runtime();
        let (tx, mut rx) = mpsc::channel(1);
        let token = CancellationToken::new();

        let canceller = {
            let token = token.clone();
            thread::spawn(move || {
                thread::sleep(core::time::Duration::from_millis(50));
                token.cancel();
            })
        };

        // The first chunk fills the channel and nothing ever reads it.
        let err = feed_chunks(rt.handle(), &engine(), 100, 2, &token, &tx).unwrap_err();
        canceller.join().unwrap();

        assert_eq!(err, Error::RequestCancelled);
        assert_eq!(rx.try_recv().unwrap().unwrap().index, 0);
    }
}
