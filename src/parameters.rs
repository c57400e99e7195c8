use crate::result::{DbError, Result};

/// Bind tag telling the driver how to encode a parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindTag {
    Integer,
    Double,
    String,
    Blob,
}

impl BindTag {
    /// Single-character tag as used in a bind-type string
    pub fn as_char(&self) -> char {
        match self {
            BindTag::Integer => 'i',
            BindTag::Double => 'd',
            BindTag::String => 's',
            BindTag::Blob => 'b',
        }
    }
}

impl std::fmt::Display for BindTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A parameter value bound positionally to a placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    Null,
}

impl ParameterValue {
    /// Classify the value: integer, float and text keep their own tag,
    /// everything else falls back to binary.
    pub fn bind_tag(&self) -> BindTag {
        match self {
            ParameterValue::Integer(_) => BindTag::Integer,
            ParameterValue::Float(_) => BindTag::Double,
            ParameterValue::Text(_) => BindTag::String,
            ParameterValue::Blob(_) | ParameterValue::Null => BindTag::Blob,
        }
    }

    /// Infer a tagged value from a JSON value.
    ///
    /// Integer-valued numbers become `Integer`, other numbers `Float`, strings
    /// `Text` and `null` becomes `Null`. An array made only of byte values
    /// (0-255) is taken as raw bytes. Any other value (booleans, objects,
    /// mixed arrays) is bound as a blob holding its JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => ParameterValue::Integer(i),
                // as_f64 only returns None for arbitrary-precision numbers
                None => ParameterValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => ParameterValue::Text(s.clone()),
            serde_json::Value::Null => ParameterValue::Null,
            serde_json::Value::Array(items) => match json_bytes(items) {
                Some(bytes) => ParameterValue::Blob(bytes),
                None => ParameterValue::Blob(value.to_string().into_bytes()),
            },
            other => ParameterValue::Blob(other.to_string().into_bytes()),
        }
    }
}

fn json_bytes(items: &[serde_json::Value]) -> Option<Vec<u8>> {
    items
        .iter()
        .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}

/// Concatenated bind tags for a parameter list, e.g. `"si"`
pub fn bind_types(params: &[ParameterValue]) -> String {
    params.iter().map(|p| p.bind_tag().as_char()).collect()
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ParameterValue {
                fn from(value: $t) -> Self {
                    ParameterValue::Integer(i64::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for ParameterValue {
    fn from(value: f32) -> Self {
        ParameterValue::Float(f64::from(value))
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<Vec<u8>> for ParameterValue {
    fn from(value: Vec<u8>) -> Self {
        ParameterValue::Blob(value)
    }
}

impl From<&[u8]> for ParameterValue {
    fn from(value: &[u8]) -> Self {
        ParameterValue::Blob(value.to_vec())
    }
}

impl<T: Into<ParameterValue>> From<Option<T>> for ParameterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParameterValue::Null, Into::into)
    }
}

/// Insertion-ordered map of column names to parameter values.
///
/// Used both for the data of an insert/update and for equality conditions.
/// Setting a column that is already present replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    entries: Vec<(String, ParameterValue)>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `set`
    pub fn with(mut self, column: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<ParameterValue>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&ParameterValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &ParameterValue> {
        self.entries.iter().map(|(_, value)| value)
    }

    /// Build a map from a JSON object, keeping the object's key order
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            DbError::new_invalid_input(format!("expected a JSON object, got {value}"))
        })?;

        Ok(obj
            .iter()
            .map(|(column, value)| (column.clone(), ParameterValue::from_json(value)))
            .collect())
    }
}

impl<K, V> FromIterator<(K, V)> for ColumnMap
where
    K: Into<String>,
    V: Into<ParameterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ColumnMap::new();
        for (column, value) in iter {
            map.set(column, value);
        }
        map
    }
}
