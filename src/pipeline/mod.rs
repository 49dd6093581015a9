//! Composable logging pipeline: stages that accept an entry plus its fields,
//! and post-commit hooks that see each entry once it has been written.

pub mod enrich;
pub mod hooked;
pub mod layer;
pub mod logger;
pub mod writer;

pub use enrich::{EnrichingCore, SerializationError, encode_fields, enrich};
pub use hooked::HookedCore;
pub use layer::ForwardingLayer;
pub use logger::Logger;
pub use writer::WriterCore;

use crate::domain::{Field, Level, LogEntry};
use std::sync::Arc;
use thiserror::Error;

/// Error returned by a post-commit hook.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
    #[error("Write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Hook failed: {0}")]
    Hook(HookError),
}

/// A pipeline stage.
pub trait Core: Send + Sync {
    /// Static enablement check, consulted before an entry is built.
    fn enabled(&self, level: Level) -> bool;

    fn write(&self, entry: &LogEntry, fields: &[Field]) -> Result<(), PipelineError>;

    fn sync(&self) -> Result<(), PipelineError> {
        Ok(())
    }
}

impl<C: Core + ?Sized> Core for Arc<C> {
    fn enabled(&self, level: Level) -> bool {
        (**self).enabled(level)
    }

    fn write(&self, entry: &LogEntry, fields: &[Field]) -> Result<(), PipelineError> {
        (**self).write(entry, fields)
    }

    fn sync(&self) -> Result<(), PipelineError> {
        (**self).sync()
    }
}

/// Callback run once per written entry.
pub trait Hook: Send + Sync {
    fn on_entry(&self, entry: &LogEntry) -> Result<(), HookError>;
}

impl<F> Hook for F
where
    F: Fn(&LogEntry) -> Result<(), HookError> + Send + Sync,
{
    fn on_entry(&self, entry: &LogEntry) -> Result<(), HookError> {
        self(entry)
    }
}
