use super::{Core, PipelineError};
use crate::buffer::EntryQueue;
use crate::domain::{Field, FieldType, Level, LevelFilter, LogEntry};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("Failed to encode field '{key}': {source}")]
    Field {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize fields: {0}")]
    Json(#[from] serde_json::Error),
}

fn field_value(field: &Field) -> Result<Value, SerializationError> {
    let value = match field.kind {
        FieldType::String => Value::String(field.string.clone()),
        kind if kind.is_integer() => Value::from(field.integer),
        FieldType::Bool => Value::Bool(field.integer == 1),
        _ => match &field.interface {
            Some(value) => value.to_json().map_err(|source| SerializationError::Field {
                key: field.key.clone(),
                source,
            })?,
            None => Value::Null,
        },
    };
    Ok(value)
}

/// Serializes `fields` as one JSON object. A repeated key keeps its last value.
pub fn encode_fields(fields: &[Field]) -> Result<String, SerializationError> {
    let mut map = Map::with_capacity(fields.len());
    for field in fields {
        map.insert(field.key.clone(), field_value(field)?);
    }
    Ok(serde_json::to_string(&map)?)
}

/// Returns a copy of `entry` whose message carries its serialized fields.
pub fn enrich(entry: &LogEntry, fields: &[Field]) -> Result<LogEntry, SerializationError> {
    let encoded = encode_fields(fields)?;
    let mut enriched = entry.clone();
    enriched.message = format!("{} {}", entry.message, encoded);
    Ok(enriched)
}

/// Stage that folds structured fields into the message, queues the result
/// for the dispatch hook and forwards it to the wrapped stage.
pub struct EnrichingCore<C> {
    next: C,
    filter: LevelFilter,
    queue: Arc<EntryQueue>,
}

impl<C: Core> EnrichingCore<C> {
    /// `filter` must be the accepted levels of the hook draining `queue`:
    /// an entry queued at a level that hook rejects is never removed.
    /// [`crate::hook::DispatchHook::enriching_core`] wires both from the hook.
    pub fn new(next: C, filter: LevelFilter, queue: Arc<EntryQueue>) -> Self {
        Self {
            next,
            filter,
            queue,
        }
    }

    /// Whether this stage's own side effects apply to `entry`. Rejected
    /// entries still reach the wrapped stage.
    pub fn should_handle(&self, entry: &LogEntry) -> bool {
        self.filter.accepts(entry.level)
    }

    pub fn queue(&self) -> &Arc<EntryQueue> {
        &self.queue
    }

    pub fn filter(&self) -> &LevelFilter {
        &self.filter
    }

    fn forward(&self, entry: &LogEntry, fields: &[Field]) -> Result<(), PipelineError> {
        if self.next.enabled(entry.level) {
            self.next.write(entry, fields)
        } else {
            Ok(())
        }
    }
}

impl<C: Core> Core for EnrichingCore<C> {
    fn enabled(&self, level: Level) -> bool {
        self.filter.accepts(level) || self.next.enabled(level)
    }

    fn write(&self, entry: &LogEntry, fields: &[Field]) -> Result<(), PipelineError> {
        if !self.should_handle(entry) {
            return self.forward(entry, fields);
        }

        let enriched = enrich(entry, fields)?;
        self.queue.push(enriched.clone());
        self.forward(&enriched, fields)
    }

    fn sync(&self) -> Result<(), PipelineError> {
        self.next.sync()
    }
}
