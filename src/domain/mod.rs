//! Domain layer for cloudwatch-hook.
//!
//! Contains the canonical types shared across all modules:
//! - `LogEntry`: one application log call, as the pipeline sees it
//! - `Field`: a typed key/value attached to a log call
//! - `Level` / `LevelFilter`: severity ordering and the accepted-level set

pub mod field;
pub mod level;
pub mod log_entry;

pub use field::{Field, FieldType, ObjectValue};
pub use level::{ALL_LEVELS, Level, LevelFilter, ParseLevelError, level_threshold};
pub use log_entry::{EntryId, LogEntry};
