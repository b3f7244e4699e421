use crate::{
    cancel::CancelSignal,
    digits::{DigitString, add_digits},
    error::Error,
};
use core::mem;

/// The next two Fibonacci values to be emitted.
///
/// This is all the state needed to continue the sequence, so a stream never
/// holds more than one chunk plus these two values in memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RollingPair {
    current: DigitString,
    next: DigitString,
}

impl RollingPair {
    /// Starts at `F(0) = 0`, `F(1) = 1`.
    pub fn new() -> Self {
        Self {
            current: DigitString::zero(),
            next: DigitString::one(),
        }
    }

    /// The value the next call to [`Self::advance`] will return.
    pub fn peek(&self) -> &DigitString {
        &self.current
    }

    /// Returns the current value and moves one step along the sequence.
    ///
    /// The returned value is moved out rather than cloned; only the new
    /// look-ahead value is allocated.
    pub fn advance(&mut self) -> DigitString {
        let following = add_digits(&self.current, &self.next);
        mem::replace(&mut self.current, mem::replace(&mut self.next, following))
    }
}

impl Default for RollingPair {
    fn default() -> Self {
        Self::new()
    }
}

/// Streams `F(0)` through `F(n - 1)` to `deliver` in chunks of `chunk_size`.
///
/// `deliver` receives each chunk together with the index of its first element
/// (`0`, `chunk_size`, `2 * chunk_size`, ...). Every chunk holds exactly
/// `chunk_size` values except possibly the last one. Chunks are produced one
/// at a time and `deliver` is called synchronously, so the producer never runs
/// ahead of the consumer.
///
/// All chunks are written into one buffer that lives for the whole call. The
/// slice passed to `deliver` borrows that buffer and is overwritten by the next
/// chunk, so a callback that wants to keep values must clone them.
///
/// `cancel` is polled once before each chunk.
///
/// # Errors
///
/// - [`Error::CancellationRequested`] if `cancel` is raised before a chunk is
///   produced. The chunk being prepared is never delivered.
/// - [`Error::DeliveryFailed`] with the callback's own error if `deliver`
///   fails. No further chunks are produced.
///
/// # Panics
///
/// Panics if `chunk_size` is zero and `n` is not.
pub fn stream_chunks<C, F, E>(
    n: usize,
    chunk_size: usize,
    cancel: &C,
    mut deliver: F,
) -> Result<(), Error<E>>
where
    C: CancelSignal + ?Sized,
    F: FnMut(&[DigitString], usize) -> Result<(), E>,
{
    if n == 0 {
        return Ok(());
    }
    assert!(chunk_size > 0, "chunk_size must be non-zero");

    let mut pair = RollingPair::new();
    let mut buffer: Vec<DigitString> = Vec::with_capacity(chunk_size.min(n));

    for offset in (0..n).step_by(chunk_size) {
        if cancel.is_cancelled() {
            return Err(Error::CancellationRequested);
        }

        let count = chunk_size.min(n - offset);
        buffer.clear();
        buffer.extend((0..count).map(|_| pair.advance()));

        deliver(&buffer, offset).map_err(Error::DeliveryFailed)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cancel::NeverCancel, sequence::generate};
    use core::convert::Infallible;
    use core::sync::atomic::{AtomicBool, Ordering};

    fn collect(n: usize, chunk_size: usize) -> Vec<(usize, Vec<DigitString>)> {
        let mut chunks = Vec::new();
        stream_chunks(n, chunk_size, &NeverCancel, |chunk, offset| {
            chunks.push((offset, chunk.to_vec()));
            Ok::<_, Infallible>(())
        })
        .unwrap();
        chunks
    }

    #[test]
    fn rolling_pair_walks_the_sequence() {
        let mut pair = RollingPair::new();
        let values: Vec<_> = (0..8).map(|_| pair.advance()).collect();
        assert_eq!(values, ["0", "1", "1", "2", "3", "5", "8", "13"]);
        assert_eq!(pair.peek(), "21");
    }

    #[test]
    fn chunks_of_four() {
        let chunks = collect(10, 4);
        let offsets: Vec<_> = chunks.iter().map(|(o, _)| *o).collect();
        let lens: Vec<_> = chunks.iter().map(|(_, c)| c.len()).collect();
        assert_eq!(offsets, [0, 4, 8]);
        assert_eq!(lens, [4, 4, 2]);
        assert_eq!(chunks[0].1, ["0", "1", "1", "2"]);
        assert_eq!(chunks[1].1, ["3", "5", "8", "13"]);
        assert_eq!(chunks[2].1, ["21", "34"]);
    }

    #[test]
    fn exact_multiple_has_no_short_tail() {
        let lens: Vec<_> = collect(12, 4).iter().map(|(_, c)| c.len()).collect();
        assert_eq!(lens, [4, 4, 4]);
    }

    #[test]
    fn empty_stream_never_delivers() {
        assert!(collect(0, 4).is_empty());
    }

    #[test]
    fn chunk_larger_than_n() {
        let chunks = collect(3, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], (0, generate(3, &NeverCancel).unwrap()));
    }

    #[test]
    fn concatenation_matches_full_sequence() {
        for n in [1, 2, 7, 64, 301] {
            let expected = generate(n, &NeverCancel).unwrap();
            for chunk_size in [1, 2, 3, 5, 64, 500] {
                let joined: Vec<_> = collect(n, chunk_size)
                    .into_iter()
                    .flat_map(|(_, c)| c)
                    .collect();
                assert_eq!(joined, expected, "n={n} chunk_size={chunk_size}");
            }
        }
    }

    #[test]
    fn cancelled_before_start_delivers_nothing() {
        let raised = AtomicBool::new(true);
        let mut calls = 0;
        let res = stream_chunks(10, 4, &raised, |_, _| {
            calls += 1;
            Ok::<_, Infallible>(())
        });
        assert_eq!(res, Err(Error::CancellationRequested));
        assert_eq!(calls, 0);
    }

    #[test]
    fn cancelled_mid_stream_reports_failure() {
        let cancel = AtomicBool::new(false);
        let mut seen = Vec::new();
        let res = stream_chunks(20, 4, &cancel, |_, offset| {
            seen.push(offset);
            if offset == 4 {
                cancel.store(true, Ordering::Release);
            }
            Ok::<_, Infallible>(())
        });
        assert_eq!(res, Err(Error::CancellationRequested));
        assert_eq!(seen, [0, 4]);
    }

    #[test]
    fn delivery_failure_stops_immediately() {
        #[derive(Debug, PartialEq)]
        struct Disconnected {
            at: usize,
        }

        let mut seen = Vec::new();
        let res = stream_chunks(20, 5, &NeverCancel, |_, offset| {
            seen.push(offset);
            if offset == 5 {
                return Err(Disconnected { at: offset });
            }
            Ok(())
        });
        assert_eq!(res, Err(Error::DeliveryFailed(Disconnected { at: 5 })));
        assert_eq!(seen, [0, 5]);
    }
}
