//! Hand-off between the synchronous enrichment path and the dispatch hook.

pub mod metrics;
pub mod queue;

pub use metrics::QueueMetrics;
pub use queue::EntryQueue;
