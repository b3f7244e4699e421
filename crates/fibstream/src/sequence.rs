use crate::{
    cancel::CancelSignal,
    digits::{DigitString, add_digits},
    error::{Error, Result},
};

/// Materializes the first `n` Fibonacci numbers, `F(0)` through `F(n - 1)`.
///
/// The cancellation signal is checked before each element from index 2 on.
/// If it is raised the whole result is dropped and
/// [`Error::CancellationRequested`] is returned.
///
/// # Errors
///
/// Only [`Error::CancellationRequested`].
pub fn generate<C>(n: usize, cancel: &C) -> Result<Vec<DigitString>>
where
    C: CancelSignal + ?Sized,
{
    let mut seq = Vec::with_capacity(n);

    if n > 0 {
        seq.push(DigitString::zero());
    }
    if n > 1 {
        seq.push(DigitString::one());
    }

    for i in 2..n {
        if cancel.is_cancelled() {
            return Err(Error::CancellationRequested);
        }
        let next = add_digits(&seq[i - 1], &seq[i - 2]);
        seq.push(next);
    }

    Ok(seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use core::cell::Cell;

    #[test]
    fn short_prefixes() {
        assert!(generate(0, &NeverCancel).unwrap().is_empty());
        assert_eq!(generate(1, &NeverCancel).unwrap(), ["0"]);
        assert_eq!(generate(2, &NeverCancel).unwrap(), ["0", "1"]);
        assert_eq!(
            generate(10, &NeverCancel).unwrap(),
            ["0", "1", "1", "2", "3", "5", "8", "13", "21", "34"]
        );
    }

    #[test]
    fn large_terms_are_exact() {
        let seq = generate(101, &NeverCancel).unwrap();
        assert_eq!(seq.len(), 101);
        assert_eq!(seq[93], "12200160415121876738");
        assert_eq!(seq[100], "354224848179261915075");
    }

    #[test]
    fn cancellation_is_checked_from_index_two() {
        // Seeding does not consult the signal.
        let raised = std::sync::atomic::AtomicBool::new(true);
        assert_eq!(generate(2, &raised).unwrap(), ["0", "1"]);
        assert_eq!(generate(3, &raised), Err(Error::CancellationRequested));
    }

    #[test]
    fn cancellation_mid_way_discards_the_partial_result() {
        struct AfterPolls(Cell<usize>);
        impl CancelSignal for AfterPolls {
            fn is_cancelled(&self) -> bool {
                let left = self.0.get();
                self.0.set(left.saturating_sub(1));
                left == 0
            }
        }

        let signal = AfterPolls(Cell::new(5));
        assert_eq!(generate(50, &signal), Err(Error::CancellationRequested));
        assert_eq!(signal.0.get(), 0);
    }
}
