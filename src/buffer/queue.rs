use super::metrics::QueueMetrics;
use crate::domain::{EntryId, LogEntry};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

static GLOBAL_QUEUE: LazyLock<Arc<EntryQueue>> = LazyLock::new(|| Arc::new(EntryQueue::new()));

/// Unbounded FIFO of enriched entries waiting for the dispatch hook.
///
/// Every operation holds the lock only for the push or removal itself.
/// Growth is not bounded: if entries are enriched faster than they are
/// dispatched, the queue keeps growing.
#[derive(Default)]
pub struct EntryQueue {
    entries: Mutex<VecDeque<LogEntry>>,
    pushed: AtomicU64,
    popped: AtomicU64,
    peak_len: AtomicUsize,
}

impl EntryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide queue shared by hooks and enrichers that were not
    /// handed one explicitly.
    pub fn global() -> Arc<EntryQueue> {
        Arc::clone(&GLOBAL_QUEUE)
    }

    pub fn push(&self, entry: LogEntry) {
        let len = {
            let mut entries = self.entries.lock();
            entries.push_back(entry);
            entries.len()
        };
        self.pushed.fetch_add(1, Ordering::Relaxed);
        self.peak_len.fetch_max(len, Ordering::Relaxed);
    }

    /// Removes the head. `None` means the queue is empty.
    pub fn pop(&self) -> Option<LogEntry> {
        let entry = self.entries.lock().pop_front();
        if entry.is_some() {
            self.popped.fetch_add(1, Ordering::Relaxed);
        }
        entry
    }

    /// Removes the entry enriched from the log call `id`.
    ///
    /// The search starts at the head, where the match sits unless other
    /// calls overtook this one.
    pub fn take(&self, id: EntryId) -> Option<LogEntry> {
        let entry = {
            let mut entries = self.entries.lock();
            let position = entries.iter().position(|entry| entry.id == id)?;
            entries.remove(position)
        };
        if entry.is_some() {
            self.popped.fetch_add(1, Ordering::Relaxed);
        }
        entry
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn metrics(&self) -> QueueMetrics {
        QueueMetrics {
            len: self.len(),
            pushed: self.pushed.load(Ordering::Relaxed),
            popped: self.popped.load(Ordering::Relaxed),
            peak_len: self.peak_len.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for EntryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryQueue")
            .field("len", &self.len())
            .field("pushed", &self.pushed.load(Ordering::Relaxed))
            .field("popped", &self.popped.load(Ordering::Relaxed))
            .field("peak_len", &self.peak_len.load(Ordering::Relaxed))
            .finish()
    }
}
