use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::AccessError;

/// Values that can be bound as query parameters or extracted from result
/// columns.
///
/// The same enum is the currency between model getters, the argument map,
/// the driver parameter list, and model setters, so none of those layers
/// need to know a field's concrete type:
/// ```rust
/// use pgbind::RowValues;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.SSS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S.%3f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Variant name, used in conversion error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RowValues::Int(_) => "Int",
            RowValues::Float(_) => "Float",
            RowValues::Text(_) => "Text",
            RowValues::Bool(_) => "Bool",
            RowValues::Timestamp(_) => "Timestamp",
            RowValues::Null => "Null",
            RowValues::JSON(_) => "JSON",
            RowValues::Blob(_) => "Blob",
        }
    }
}

impl From<i64> for RowValues {
    fn from(v: i64) -> Self {
        RowValues::Int(v)
    }
}

impl From<i32> for RowValues {
    fn from(v: i32) -> Self {
        RowValues::Int(i64::from(v))
    }
}

impl From<i16> for RowValues {
    fn from(v: i16) -> Self {
        RowValues::Int(i64::from(v))
    }
}

impl From<f64> for RowValues {
    fn from(v: f64) -> Self {
        RowValues::Float(v)
    }
}

impl From<f32> for RowValues {
    fn from(v: f32) -> Self {
        RowValues::Float(f64::from(v))
    }
}

impl From<String> for RowValues {
    fn from(v: String) -> Self {
        RowValues::Text(v)
    }
}

impl From<&str> for RowValues {
    fn from(v: &str) -> Self {
        RowValues::Text(v.to_string())
    }
}

impl From<bool> for RowValues {
    fn from(v: bool) -> Self {
        RowValues::Bool(v)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(v: NaiveDateTime) -> Self {
        RowValues::Timestamp(v)
    }
}

impl From<JsonValue> for RowValues {
    fn from(v: JsonValue) -> Self {
        RowValues::JSON(v)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(v: Vec<u8>) -> Self {
        RowValues::Blob(v)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(v: Option<T>) -> Self {
        v.map_or(RowValues::Null, Into::into)
    }
}

/// Conversion from a [`RowValues`] into a concrete field representation.
///
/// Setters use this to write extracted column values (and `Null`) into
/// model fields: `Null` resets the field to its zero value (`None` for
/// options), compatible representations are converted, anything else is an
/// [`AccessError::Incompatible`].
pub trait FromRowValue: Sized {
    /// Name used in error messages.
    const TARGET: &'static str;

    /// Convert `value` into `Self`.
    ///
    /// # Errors
    /// Returns [`AccessError::Incompatible`] when no conversion exists.
    fn from_row_value(value: RowValues) -> Result<Self, AccessError>;
}

fn incompatible<T: FromRowValue>(value: &RowValues) -> AccessError {
    AccessError::Incompatible {
        value: value.kind(),
        target: T::TARGET,
    }
}

impl FromRowValue for i64 {
    const TARGET: &'static str = "i64";

    fn from_row_value(value: RowValues) -> Result<Self, AccessError> {
        match value {
            RowValues::Null => Ok(0),
            RowValues::Int(i) => Ok(i),
            ref other => Err(incompatible::<Self>(other)),
        }
    }
}

impl FromRowValue for i32 {
    const TARGET: &'static str = "i32";

    fn from_row_value(value: RowValues) -> Result<Self, AccessError> {
        match value {
            RowValues::Null => Ok(0),
            RowValues::Int(i) => i32::try_from(i).map_err(|_| AccessError::Incompatible {
                value: "Int",
                target: Self::TARGET,
            }),
            ref other => Err(incompatible::<Self>(other)),
        }
    }
}

impl FromRowValue for i16 {
    const TARGET: &'static str = "i16";

    fn from_row_value(value: RowValues) -> Result<Self, AccessError> {
        match value {
            RowValues::Null => Ok(0),
            RowValues::Int(i) => i16::try_from(i).map_err(|_| AccessError::Incompatible {
                value: "Int",
                target: Self::TARGET,
            }),
            ref other => Err(incompatible::<Self>(other)),
        }
    }
}

impl FromRowValue for f64 {
    const TARGET: &'static str = "f64";

    fn from_row_value(value: RowValues) -> Result<Self, AccessError> {
        match value {
            RowValues::Null => Ok(0.0),
            RowValues::Float(f) => Ok(f),
            RowValues::Int(i) => Ok(i as f64),
            ref other => Err(incompatible::<Self>(other)),
        }
    }
}

impl FromRowValue for f32 {
    const TARGET: &'static str = "f32";

    fn from_row_value(value: RowValues) -> Result<Self, AccessError> {
        f64::from_row_value(value).map(|v| v as f32)
    }
}

impl FromRowValue for String {
    const TARGET: &'static str = "String";

    fn from_row_value(value: RowValues) -> Result<Self, AccessError> {
        match value {
            RowValues::Null => Ok(String::new()),
            RowValues::Text(s) => Ok(s),
            ref other => Err(incompatible::<Self>(other)),
        }
    }
}

impl FromRowValue for bool {
    const TARGET: &'static str = "bool";

    fn from_row_value(value: RowValues) -> Result<Self, AccessError> {
        match value {
            RowValues::Null => Ok(false),
            RowValues::Bool(b) => Ok(b),
            RowValues::Int(0) => Ok(false),
            RowValues::Int(1) => Ok(true),
            ref other => Err(incompatible::<Self>(other)),
        }
    }
}

impl FromRowValue for NaiveDateTime {
    const TARGET: &'static str = "NaiveDateTime";

    fn from_row_value(value: RowValues) -> Result<Self, AccessError> {
        match value {
            RowValues::Null => Ok(NaiveDateTime::default()),
            ref other => other
                .as_timestamp()
                .ok_or_else(|| incompatible::<Self>(other)),
        }
    }
}

impl FromRowValue for JsonValue {
    const TARGET: &'static str = "Json";

    fn from_row_value(value: RowValues) -> Result<Self, AccessError> {
        match value {
            RowValues::Null => Ok(JsonValue::Null),
            RowValues::JSON(v) => Ok(v),
            ref other => Err(incompatible::<Self>(other)),
        }
    }
}

impl FromRowValue for Vec<u8> {
    const TARGET: &'static str = "Vec<u8>";

    fn from_row_value(value: RowValues) -> Result<Self, AccessError> {
        match value {
            RowValues::Null => Ok(Vec::new()),
            RowValues::Blob(b) => Ok(b),
            ref other => Err(incompatible::<Self>(other)),
        }
    }
}

impl<T: FromRowValue> FromRowValue for Option<T> {
    const TARGET: &'static str = "Option";

    fn from_row_value(value: RowValues) -> Result<Self, AccessError> {
        match value {
            RowValues::Null => Ok(None),
            other => T::from_row_value(other).map(Some),
        }
    }
}
