//! Lenient typed access to block property bags.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Free-form block properties as authored in the editor.
///
/// Values arrive from hand-edited JSON and from several editor generations, so
/// lookups are forgiving: numeric strings read as numbers, numbers read as
/// strings, and `null` is treated the same as a missing key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Props(Map<String, Value>);

impl Props {
    /// Create an empty property bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a raw value. `null` counts as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Set a value, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Read a value as text. Numbers and booleans are stringified.
    pub fn str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Read a value as text, falling back to `default` when absent.
    pub fn str_or(&self, key: &str, default: &str) -> String {
        self.str(key).unwrap_or_else(|| default.to_string())
    }

    /// Read the first present key out of a list of aliases.
    pub fn first_str(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.str(k))
    }

    /// Read a value as text, treating the empty string as absent.
    pub fn non_empty_str(&self, key: &str) -> Option<String> {
        self.str(key).filter(|s| !s.trim().is_empty())
    }

    /// Read a numeric value. Strings such as `"16"` or `"16px"` are accepted.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches("px").trim().parse().ok(),
            _ => None,
        }
    }

    /// Read a boolean value. Accepts `"true"`/`"false"` and non-zero numbers.
    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_f64().map(|n| n != 0.0),
            _ => None,
        }
    }

    /// Read an array value.
    pub fn array(&self, key: &str) -> Option<&Vec<Value>> {
        self.get(key)?.as_array()
    }

    /// Read an array of strings, skipping non-string entries.
    pub fn string_list(&self, key: &str) -> Option<Vec<String>> {
        self.array(key).map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
    }

    /// Whether the bag has no properties.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Props {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<'de> Deserialize<'de> for Props {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Older documents store `props: null` for blocks without settings.
        let map = Option::<Map<String, Value>>::deserialize(deserializer)?;
        Ok(Self(map.unwrap_or_default()))
    }
}

/// Format a number for CSS, dropping a redundant `.0`.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
