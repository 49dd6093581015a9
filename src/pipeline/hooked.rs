use super::{Core, Hook, PipelineError};
use crate::domain::{Field, Level, LogEntry};
use std::sync::Arc;

/// Runs registered hooks after every write through the wrapped stage.
///
/// Hooks receive the entry as the caller built it, never the copy a
/// wrapped stage may have rewritten. Every hook runs even when the write or
/// an earlier hook failed; the first error is returned.
pub struct HookedCore<C> {
    inner: C,
    hooks: Vec<Arc<dyn Hook>>,
}

impl<C: Core> HookedCore<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            hooks: Vec::new(),
        }
    }

    pub fn with_hook(mut self, hook: impl Hook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn with_shared_hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }
}

impl<C: Core> Core for HookedCore<C> {
    fn enabled(&self, level: Level) -> bool {
        self.inner.enabled(level)
    }

    fn write(&self, entry: &LogEntry, fields: &[Field]) -> Result<(), PipelineError> {
        let mut result = self.inner.write(entry, fields);
        for hook in &self.hooks {
            if let Err(e) = hook.on_entry(entry)
                && result.is_ok()
            {
                result = Err(PipelineError::Hook(e));
            }
        }
        result
    }

    fn sync(&self) -> Result<(), PipelineError> {
        self.inner.sync()
    }
}
