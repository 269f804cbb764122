use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

/// A scalar profile value, as produced by an ini/toml/json profile reader.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ProfileValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ProfileValue {
    /// Boolean view: `1`, `true`, `on` and `yes` are true, anything else is false.
    pub fn as_bool(&self) -> bool {
        match self {
            ProfileValue::Bool(b) => *b,
            ProfileValue::Int(i) => *i != 0,
            ProfileValue::Float(f) => *f != 0.0,
            ProfileValue::Str(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            ),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ProfileValue::Int(i) => Some(*i),
            ProfileValue::Bool(b) => Some(i64::from(*b)),
            ProfileValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            ProfileValue::Float(_) => None,
            ProfileValue::Str(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ProfileValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileValue::Bool(b) => write!(f, "{}", if *b { "1" } else { "0" }),
            ProfileValue::Int(i) => write!(f, "{}", i),
            ProfileValue::Float(v) => write!(f, "{}", v),
            ProfileValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ProfileValue {
    fn from(value: &str) -> Self {
        ProfileValue::Str(value.to_string())
    }
}

impl From<String> for ProfileValue {
    fn from(value: String) -> Self {
        ProfileValue::Str(value)
    }
}

impl From<i64> for ProfileValue {
    fn from(value: i64) -> Self {
        ProfileValue::Int(value)
    }
}

impl From<i32> for ProfileValue {
    fn from(value: i32) -> Self {
        ProfileValue::Int(i64::from(value))
    }
}

impl From<bool> for ProfileValue {
    fn from(value: bool) -> Self {
        ProfileValue::Bool(value)
    }
}

/// A raw connection profile: loosely typed key/value pairs, not validated
/// until normalization. Keys are case-insensitive and keep their order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "IndexMap<String, ProfileValue>")]
pub struct ConnectionProfile {
    values: IndexMap<String, ProfileValue>,
}

impl ConnectionProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<ProfileValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<ProfileValue>) {
        self.values
            .insert(key.trim().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ProfileValue> {
        self.values.get(&key.to_ascii_lowercase())
    }

    /// String value of a key, `None` when absent or blank.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|v| v.to_string().trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).map(ProfileValue::as_bool).unwrap_or(false)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProfileValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<IndexMap<String, ProfileValue>> for ConnectionProfile {
    fn from(map: IndexMap<String, ProfileValue>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: AsRef<str>, V: Into<ProfileValue>> FromIterator<(K, V)> for ConnectionProfile {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut profile = ConnectionProfile::new();
        for (key, value) in iter {
            profile.insert(key.as_ref(), value);
        }
        profile
    }
}
