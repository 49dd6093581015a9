#![deny(warnings, rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Millisecond timestamps fit in i64/u64
    clippy::cast_possible_wrap,       // Unsigned field values are stored as i64 on purpose
    clippy::missing_errors_doc,       // Error enums document themselves
    clippy::module_name_repetitions,  // e.g. HookConfig in hook module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

//! Ships structured log entries to CloudWatch Logs while the in-process
//! pipeline keeps handling them.
//!
//! The synchronous write path ([`pipeline::EnrichingCore`]) folds structured
//! fields into the message and queues the result; the post-commit
//! [`hook::DispatchHook`] picks it up and appends it to the remote stream,
//! threading the stream's sequence token from one append to the next.

pub mod buffer;
pub mod config;
pub mod domain;
pub mod hook;
pub mod logging;
pub mod pipeline;
pub mod sender;

pub use buffer::EntryQueue;
pub use config::HookSettings;
pub use domain::{Field, FieldType, Level, LevelFilter, LogEntry};
pub use hook::{DispatchHook, DispatchMode, HookConfig};
pub use pipeline::{Core, EnrichingCore, Hook, HookedCore, Logger};
pub use sender::{ClientConfig, CloudWatchLogsClient, LogServiceClient};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
