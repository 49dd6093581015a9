use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Severity of a log entry, totally ordered from `Debug` up to `Panic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

/// Every supported level, lowest first.
pub const ALL_LEVELS: &[Level] = &[
    Level::Debug,
    Level::Info,
    Level::Warn,
    Level::Error,
    Level::Fatal,
    Level::Panic,
];

/// Returns every level at or above `level`, in ascending order.
pub fn level_threshold(level: Level) -> &'static [Level] {
    // ALL_LEVELS is declared in discriminant order
    &ALL_LEVELS[level as usize..]
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
            Level::Panic => "panic",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown log level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            "panic" => Ok(Level::Panic),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// The set of levels a stage accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelFilter {
    levels: Vec<Level>,
}

impl LevelFilter {
    pub fn all() -> Self {
        Self {
            levels: ALL_LEVELS.to_vec(),
        }
    }

    pub fn threshold(level: Level) -> Self {
        Self {
            levels: level_threshold(level).to_vec(),
        }
    }

    /// Builds a filter from an explicit list. `None` accepts everything.
    pub fn from_levels<I>(levels: Option<I>) -> Self
    where
        I: IntoIterator<Item = Level>,
    {
        match levels {
            Some(levels) => {
                let mut levels: Vec<Level> = levels.into_iter().collect();
                levels.sort_unstable();
                levels.dedup();
                Self { levels }
            }
            None => Self::all(),
        }
    }

    #[inline]
    pub fn accepts(&self, level: Level) -> bool {
        self.levels.contains(&level)
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }
}

impl Default for LevelFilter {
    fn default() -> Self {
        Self::all()
    }
}
