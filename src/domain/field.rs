use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Type tag telling which slot of a [`Field`] carries its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Int64,
    Int32,
    Int16,
    Int8,
    Uint64,
    Uint32,
    Uint16,
    Uint8,
    Bool,
    Float64,
    Float32,
    Duration,
    Time,
    Error,
    Any,
}

impl FieldType {
    /// Signed and unsigned integers of every width.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::Int64
                | FieldType::Int32
                | FieldType::Int16
                | FieldType::Int8
                | FieldType::Uint64
                | FieldType::Uint32
                | FieldType::Uint16
                | FieldType::Uint8
        )
    }
}

/// Opaque value carried by fields that are neither strings, integers nor booleans.
pub trait ObjectValue: fmt::Debug + Send + Sync {
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error>;
}

impl<T> ObjectValue for T
where
    T: Serialize + fmt::Debug + Send + Sync,
{
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// A typed key/value attached to a log call.
///
/// The value lives in one of three slots picked by `kind`: `string` for
/// strings, `integer` for every integer width and for booleans (1 or 0),
/// `interface` for everything else.
#[derive(Debug, Clone)]
pub struct Field {
    pub key: String,
    pub kind: FieldType,
    pub integer: i64,
    pub string: String,
    pub interface: Option<Arc<dyn ObjectValue>>,
}

impl Field {
    fn with_integer(key: impl Into<String>, kind: FieldType, integer: i64) -> Self {
        Self {
            key: key.into(),
            kind,
            integer,
            string: String::new(),
            interface: None,
        }
    }

    fn with_interface<T>(key: impl Into<String>, kind: FieldType, value: T) -> Self
    where
        T: ObjectValue + 'static,
    {
        Self {
            key: key.into(),
            kind,
            integer: 0,
            string: String::new(),
            interface: Some(Arc::new(value)),
        }
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: FieldType::String,
            integer: 0,
            string: value.into(),
            interface: None,
        }
    }

    pub fn i64(key: impl Into<String>, value: i64) -> Self {
        Self::with_integer(key, FieldType::Int64, value)
    }

    pub fn i32(key: impl Into<String>, value: i32) -> Self {
        Self::with_integer(key, FieldType::Int32, i64::from(value))
    }

    pub fn i16(key: impl Into<String>, value: i16) -> Self {
        Self::with_integer(key, FieldType::Int16, i64::from(value))
    }

    pub fn i8(key: impl Into<String>, value: i8) -> Self {
        Self::with_integer(key, FieldType::Int8, i64::from(value))
    }

    /// Stored in the signed slot; values above `i64::MAX` wrap.
    pub fn u64(key: impl Into<String>, value: u64) -> Self {
        Self::with_integer(key, FieldType::Uint64, value as i64)
    }

    pub fn u32(key: impl Into<String>, value: u32) -> Self {
        Self::with_integer(key, FieldType::Uint32, i64::from(value))
    }

    pub fn u16(key: impl Into<String>, value: u16) -> Self {
        Self::with_integer(key, FieldType::Uint16, i64::from(value))
    }

    pub fn u8(key: impl Into<String>, value: u8) -> Self {
        Self::with_integer(key, FieldType::Uint8, i64::from(value))
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self::with_integer(key, FieldType::Bool, i64::from(value))
    }

    pub fn f64(key: impl Into<String>, value: f64) -> Self {
        Self::with_interface(key, FieldType::Float64, value)
    }

    pub fn f32(key: impl Into<String>, value: f32) -> Self {
        Self::with_interface(key, FieldType::Float32, value)
    }

    /// Durations are carried as whole milliseconds.
    pub fn duration(key: impl Into<String>, value: Duration) -> Self {
        Self::with_interface(key, FieldType::Duration, value.as_millis() as u64)
    }

    pub fn time(key: impl Into<String>, value: chrono::DateTime<chrono::Utc>) -> Self {
        Self::with_interface(key, FieldType::Time, value.to_rfc3339())
    }

    pub fn error(key: impl Into<String>, err: &dyn std::error::Error) -> Self {
        Self::with_interface(key, FieldType::Error, err.to_string())
    }

    pub fn any<T>(key: impl Into<String>, value: T) -> Self
    where
        T: Serialize + fmt::Debug + Send + Sync + 'static,
    {
        Self::with_interface(key, FieldType::Any, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_is_stored_as_integer() {
        assert_eq!(Field::bool("ok", true).integer, 1);
        assert_eq!(Field::bool("ok", false).integer, 0);
        assert_eq!(Field::bool("ok", true).kind, FieldType::Bool);
    }

    #[test]
    fn test_integer_widths_share_signed_slot() {
        assert_eq!(Field::u8("n", 255).integer, 255);
        assert_eq!(Field::i8("n", -3).integer, -3);
        assert_eq!(Field::u32("n", u32::MAX).integer, i64::from(u32::MAX));
        assert!(Field::u16("n", 1).kind.is_integer());
        assert!(!FieldType::Bool.is_integer());
    }

    #[test]
    fn test_other_types_use_interface_slot() {
        let field = Field::f64("ratio", 0.5);
        let value = field.interface.as_ref().map(|v| v.to_json().unwrap());
        assert_eq!(value, Some(serde_json::json!(0.5)));

        let field = Field::duration("elapsed", Duration::from_millis(1500));
        let value = field.interface.as_ref().map(|v| v.to_json().unwrap());
        assert_eq!(value, Some(serde_json::json!(1500)));
    }
}
