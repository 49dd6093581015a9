use super::enrich::encode_fields;
use super::{Core, PipelineError};
use crate::domain::{Field, Level, LevelFilter, LogEntry};
use chrono::SecondsFormat;
use parking_lot::Mutex;
use std::io::{self, Write};

/// In-process stage writing one tab-separated line per entry.
pub struct WriterCore<W> {
    writer: Mutex<W>,
    filter: LevelFilter,
}

impl WriterCore<io::Stdout> {
    pub fn stdout(filter: LevelFilter) -> Self {
        Self::new(io::stdout(), filter)
    }
}

impl WriterCore<io::Stderr> {
    pub fn stderr(filter: LevelFilter) -> Self {
        Self::new(io::stderr(), filter)
    }
}

impl<W: Write + Send> WriterCore<W> {
    pub fn new(writer: W, filter: LevelFilter) -> Self {
        Self {
            writer: Mutex::new(writer),
            filter,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn format_line(entry: &LogEntry, fields: &[Field]) -> Result<String, PipelineError> {
        let mut line = format!(
            "{}\t{}\t[{}]\t{}",
            entry.time.to_rfc3339_opts(SecondsFormat::Millis, true),
            entry.level,
            entry.logger_name,
            entry.message
        );
        if !fields.is_empty() {
            line.push('\t');
            line.push_str(&encode_fields(fields)?);
        }
        line.push('\n');
        Ok(line)
    }
}

impl<W: Write + Send> Core for WriterCore<W> {
    fn enabled(&self, level: Level) -> bool {
        self.filter.accepts(level)
    }

    fn write(&self, entry: &LogEntry, fields: &[Field]) -> Result<(), PipelineError> {
        let line = Self::format_line(entry, fields)?;
        self.writer.lock().write_all(line.as_bytes())?;
        Ok(())
    }

    fn sync(&self) -> Result<(), PipelineError> {
        self.writer.lock().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_layout() {
        let core = WriterCore::new(Vec::new(), LevelFilter::all());
        let entry = LogEntry::new(Level::Warn, "svc", "disk almost full");
        core.write(&entry, &[Field::u8("pct", 93)]).unwrap();

        let out = String::from_utf8(core.into_inner()).unwrap();
        let columns: Vec<&str> = out.trim_end().split('\t').collect();
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[1], "WARN");
        assert_eq!(columns[2], "[svc]");
        assert_eq!(columns[3], "disk almost full");
        assert_eq!(columns[4], r#"{"pct":93}"#);
    }

    #[test]
    fn test_enablement_follows_filter() {
        let core = WriterCore::new(Vec::new(), LevelFilter::threshold(Level::Error));
        assert!(!core.enabled(Level::Warn));
        assert!(core.enabled(Level::Fatal));
    }
}
