/// Runs a closure when dropped.
///
/// Used to put shared state back in order even if the code in between
/// returns early or panics. Call [`OnDrop::run`] to trigger the closure at a
/// chosen point instead of waiting for the end of scope.
///
/// # Examples
///
/// ```
/// use h2mm_runner::utils::guard::OnDrop;
///
/// let mut released = false;
/// {
///     let _guard = OnDrop::with(|| released = true);
/// }
/// assert!(released);
/// ```
pub struct OnDrop<F: FnOnce()> {
    exit_cb: Option<F>,
}

impl<F: FnOnce()> OnDrop<F> {
    pub fn with(f: F) -> Self {
        Self { exit_cb: Some(f) }
    }

    /// Run the closure now. Dropping afterwards does nothing.
    pub fn run(mut self) {
        if let Some(f) = self.exit_cb.take() {
            f()
        }
    }
}

impl<F: FnOnce()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        if let Some(f) = self.exit_cb.take() {
            f()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_runs_once_when_triggered_early() {
        let hits = Cell::new(0);
        let guard = OnDrop::with(|| hits.set(hits.get() + 1));
        guard.run();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_runs_on_unwind() {
        let hits = std::sync::atomic::AtomicUsize::new(0);
        let result = std::panic::catch_unwind(|| {
            let _guard = OnDrop::with(|| {
                hits.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            });
            panic!("boom");
        });
        assert!(result.is_err());
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
