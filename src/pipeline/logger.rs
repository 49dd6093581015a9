use super::{Core, PipelineError};
use crate::domain::{Field, Level, LogEntry};
use std::sync::Arc;

/// Application-facing front of a pipeline.
#[derive(Clone)]
pub struct Logger {
    name: String,
    core: Arc<dyn Core>,
}

impl Logger {
    pub fn new(core: impl Core + 'static) -> Self {
        Self {
            name: String::new(),
            core: Arc::new(core),
        }
    }

    pub fn from_shared(core: Arc<dyn Core>) -> Self {
        Self {
            name: String::new(),
            core,
        }
    }

    /// Child logger; names nest with a `.` separator.
    pub fn named(&self, name: &str) -> Self {
        let name = if self.name.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.name, name)
        };
        Self {
            name,
            core: Arc::clone(&self.core),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.core.enabled(level)
    }

    pub fn log(&self, level: Level, message: &str, fields: &[Field]) -> Result<(), PipelineError> {
        if !self.core.enabled(level) {
            return Ok(());
        }
        let entry = LogEntry::new(level, self.name.as_str(), message);
        self.core.write(&entry, fields)
    }

    pub fn debug(&self, message: &str, fields: &[Field]) -> Result<(), PipelineError> {
        self.log(Level::Debug, message, fields)
    }

    pub fn info(&self, message: &str, fields: &[Field]) -> Result<(), PipelineError> {
        self.log(Level::Info, message, fields)
    }

    pub fn warn(&self, message: &str, fields: &[Field]) -> Result<(), PipelineError> {
        self.log(Level::Warn, message, fields)
    }

    pub fn error(&self, message: &str, fields: &[Field]) -> Result<(), PipelineError> {
        self.log(Level::Error, message, fields)
    }

    pub fn sync(&self) -> Result<(), PipelineError> {
        self.core.sync()
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").field("name", &self.name).finish()
    }
}
