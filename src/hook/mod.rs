//! The post-commit hook shipping accepted entries to a CloudWatch stream.

pub mod dispatch;
pub mod setup;

pub use dispatch::{DispatchError, DispatchHook, DispatchStats};
pub use setup::{InitializationError, ensure_stream};

use crate::domain::{Level, LevelFilter, level_threshold};
use serde::{Deserialize, Serialize};

/// How an accepted entry reaches the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// The append runs inline and its outcome is the hook's result.
    #[default]
    Synchronous,
    /// The append runs on a spawned task; the hook returns immediately and
    /// the outcome is discarded. A task whose request never completes is
    /// never reaped.
    Detached,
}

impl DispatchMode {
    pub fn from_async(is_async: bool) -> Self {
        if is_async {
            DispatchMode::Detached
        } else {
            DispatchMode::Synchronous
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookConfig {
    pub group_name: String,
    pub stream_name: String,
    /// `None` accepts every level.
    pub accepted_levels: Option<Vec<Level>>,
    pub mode: DispatchMode,
}

impl HookConfig {
    /// Accepts `level` and everything above it.
    pub fn new(
        group_name: impl Into<String>,
        stream_name: impl Into<String>,
        is_async: bool,
        level: Level,
    ) -> Self {
        Self {
            group_name: group_name.into(),
            stream_name: stream_name.into(),
            accepted_levels: Some(level_threshold(level).to_vec()),
            mode: DispatchMode::from_async(is_async),
        }
    }

    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_levels(self.accepted_levels.clone())
    }
}
