use std::cell::Cell;

/// Execution counters for one operation group.
///
/// Counts survive failed passes, so a caller can see how far a pipeline got.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    processed: Cell<usize>,
    errors: Cell<usize>,
    passes: Cell<usize>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_processed(&self) {
        self.processed.set(self.processed.get() + 1);
    }

    pub fn record_error(&self) {
        self.errors.set(self.errors.get() + 1);
    }

    pub fn record_pass(&self) {
        self.passes.set(self.passes.get() + 1);
    }

    /// `(processed, errors)` child executions so far.
    pub fn snapshot(&self) -> (usize, usize) {
        (self.processed.get(), self.errors.get())
    }

    pub fn passes(&self) -> usize {
        self.passes.get()
    }

    pub fn reset(&self) {
        self.processed.set(0);
        self.errors.set(0);
        self.passes.set(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_until_reset() {
        let metrics = MetricsRecorder::new();
        metrics.record_processed();
        metrics.record_processed();
        metrics.record_error();
        metrics.record_pass();
        assert_eq!(metrics.snapshot(), (2, 1));
        assert_eq!(metrics.passes(), 1);

        metrics.reset();
        assert_eq!(metrics.snapshot(), (0, 0));
    }
}
