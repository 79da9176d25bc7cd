use std::fmt;

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;

use crate::schema::FieldKind;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single column value as it moves between an entity field and the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Decimal(f64),
    Text(String),
    Date(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("expected {expected} value, found {found}")]
pub struct ValueError {
    pub expected: FieldKind,
    pub found: String,
}

impl ValueError {
    pub(crate) fn new(expected: FieldKind, found: &Value) -> Self {
        Self {
            expected,
            found: found.describe(),
        }
    }
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, or text that is empty after trimming.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text containing a `LIKE` wildcard marker.
    #[must_use]
    pub fn is_pattern(&self) -> bool {
        matches!(self, Value::Text(s) if s.contains('%') || s.contains('_'))
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Integer(i) => format!("integer {i}"),
            Value::Decimal(d) => format!("decimal {d}"),
            Value::Text(s) => format!("text '{s}'"),
            Value::Date(d) => format!("date {d}"),
        }
    }

    /// Convert a raw store value to the declared kind of the receiving field.
    ///
    /// Date columns are always read back as date-only values: SQLite hands
    /// them over as text, sometimes with a time part attached.
    #[allow(clippy::cast_precision_loss)]
    pub fn coerce(self, kind: FieldKind) -> Result<Value, ValueError> {
        match (kind, self) {
            (_, Value::Null) => Ok(Value::Null),
            (FieldKind::Integer, Value::Integer(i)) => Ok(Value::Integer(i)),
            (FieldKind::Integer, Value::Decimal(d))
                if d.fract() == 0.0 && d >= i64::MIN as f64 && d <= i64::MAX as f64 =>
            {
                Ok(Value::Integer(d as i64))
            }
            (FieldKind::Decimal, Value::Integer(i)) => Ok(Value::Decimal(i as f64)),
            (FieldKind::Decimal, Value::Decimal(d)) => Ok(Value::Decimal(d)),
            (FieldKind::Text, Value::Text(s)) => Ok(Value::Text(s)),
            (FieldKind::Date, Value::Date(d)) => Ok(Value::Date(d)),
            (FieldKind::Date, Value::Text(s)) => parse_date(&s)
                .map(Value::Date)
                .ok_or_else(|| ValueError::new(kind, &Value::Text(s))),
            (kind, other) => Err(ValueError::new(kind, &other)),
        }
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, DATE_FORMAT).ok()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

impl From<Option<i64>> for Value {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Value::Null, Value::Integer)
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Value::Null, Value::Decimal)
    }
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        value.map_or(Value::Null, Value::Text)
    }
}

impl From<Option<NaiveDate>> for Value {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map_or(Value::Null, Value::Date)
    }
}

/// Reverse of `Into<Value>` for the optional field types entities declare.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

impl FromValue for Option<i64> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value.coerce(FieldKind::Integer)? {
            Value::Integer(i) => Ok(Some(i)),
            _ => Ok(None),
        }
    }
}

impl FromValue for Option<f64> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value.coerce(FieldKind::Decimal)? {
            Value::Decimal(d) => Ok(Some(d)),
            _ => Ok(None),
        }
    }
}

impl FromValue for Option<String> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value.coerce(FieldKind::Text)? {
            Value::Text(s) => Ok(Some(s)),
            _ => Ok(None),
        }
    }
}

impl FromValue for Option<NaiveDate> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value.coerce(FieldKind::Date)? {
            Value::Date(d) => Ok(Some(d)),
            _ => Ok(None),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::from(rusqlite::types::Null),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Decimal(d) => ToSqlOutput::from(*d),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Date(d) => ToSqlOutput::from(d.format(DATE_FORMAT).to_string()),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Value::Null),
            ValueRef::Integer(i) => Ok(Value::Integer(i)),
            ValueRef::Real(d) => Ok(Value::Decimal(d)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|s| Value::Text(s.to_string()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_detection() {
        assert!(Value::Text("%spoon".to_string()).is_pattern());
        assert!(Value::Text("a_b".to_string()).is_pattern());
        assert!(!Value::Text("spoon".to_string()).is_pattern());
        assert!(!Value::Integer(5).is_pattern());
    }

    #[test]
    fn test_blank() {
        assert!(Value::Null.is_blank());
        assert!(Value::Text("   ".to_string()).is_blank());
        assert!(!Value::Text(" x ".to_string()).is_blank());
        assert!(!Value::Integer(0).is_blank());
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(
            Value::Decimal(3.0).coerce(FieldKind::Integer),
            Ok(Value::Integer(3))
        );
        assert!(Value::Decimal(3.5).coerce(FieldKind::Integer).is_err());
        assert_eq!(
            Value::Integer(2).coerce(FieldKind::Decimal),
            Ok(Value::Decimal(2.0))
        );
        assert!(Value::Text("2".to_string()).coerce(FieldKind::Integer).is_err());
    }

    #[test]
    fn test_coerce_date_truncates_timestamps() {
        let expected = Value::Date(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(
            Value::Text("2025-03-10".to_string()).coerce(FieldKind::Date),
            Ok(expected.clone())
        );
        assert_eq!(
            Value::Text("2025-03-10 00:00:00".to_string()).coerce(FieldKind::Date),
            Ok(expected.clone())
        );
        assert_eq!(
            Value::Text("2025-03-10T12:30:00+00:00".to_string()).coerce(FieldKind::Date),
            Ok(expected)
        );
        assert!(Value::Text("March".to_string()).coerce(FieldKind::Date).is_err());
    }

    #[test]
    fn test_null_coerces_to_any_kind() {
        for kind in [
            FieldKind::Integer,
            FieldKind::Decimal,
            FieldKind::Text,
            FieldKind::Date,
        ] {
            assert_eq!(Value::Null.coerce(kind), Ok(Value::Null));
        }
    }

    #[test]
    fn test_from_value_mismatch() {
        let err = <Option<i64>>::from_value(Value::Text("x".to_string())).unwrap_err();
        assert_eq!(err.expected, FieldKind::Integer);
        assert_eq!(err.to_string(), "expected integer value, found text 'x'");
    }
}
