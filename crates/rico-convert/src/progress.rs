//! Progress reporting passed into the pipeline.

/// Receives progress events from a conversion run.
///
/// Implementations must be cheap; `advance` is called once per committed
/// chunk from the control thread.
pub trait Progress: Sync {
    /// A run over `total` samples begins.
    fn start(&self, label: &str, total: u64) {
        let _ = (label, total);
    }

    /// `n` more samples were committed.
    fn advance(&self, n: u64) {
        let _ = n;
    }

    /// The run finished or aborted.
    fn finish(&self) {}
}

/// Discards all progress events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {}
