/// Point-in-time counters of an [`EntryQueue`](super::EntryQueue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueMetrics {
    pub len: usize,
    pub pushed: u64,
    pub popped: u64,
    pub peak_len: usize,
}

impl QueueMetrics {
    /// Entries that were pushed and are still waiting for their hook.
    pub fn pending(&self) -> u64 {
        self.pushed.saturating_sub(self.popped)
    }
}
