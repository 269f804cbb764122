/// Represents a SQL value in a driver-agnostic way, both for bound parameters
/// and for fetched columns. Drivers are responsible for converting these to
/// their native types.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SqlValue {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    Bool(bool),
}

/// Type tag attached to a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamType {
    Null,
    Int,
    #[default]
    Str,
    Lob,
    Bool,
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of the value. Text is parsed, booleans map to 0/1.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(i) => Some(*i),
            SqlValue::Bool(b) => Some(i64::from(*b)),
            SqlValue::Float(f) => Some(*f as i64),
            SqlValue::Text(s) => s.trim().parse().ok(),
            SqlValue::Null | SqlValue::Blob(_) => None,
        }
    }

    /// The type tag a value gets when it is supplied without an explicit one.
    pub fn param_type(&self) -> ParamType {
        match self {
            SqlValue::Null => ParamType::Null,
            SqlValue::Int(_) => ParamType::Int,
            SqlValue::Bool(_) => ParamType::Bool,
            SqlValue::Blob(_) => ParamType::Lob,
            SqlValue::Float(_) | SqlValue::Text(_) => ParamType::Str,
        }
    }

    /// Converts the value to the representation demanded by a type tag.
    ///
    /// Conversions that cannot succeed (e.g. non-numeric text as `Int`) leave
    /// the value unchanged and let the driver decide.
    pub fn coerce(self, param_type: ParamType) -> SqlValue {
        match (param_type, self) {
            (_, SqlValue::Null) | (ParamType::Null, _) => SqlValue::Null,
            (ParamType::Int, SqlValue::Bool(b)) => SqlValue::Int(i64::from(b)),
            (ParamType::Int, SqlValue::Float(f)) => SqlValue::Int(f as i64),
            (ParamType::Int, SqlValue::Text(s)) => match s.trim().parse::<i64>() {
                Ok(i) => SqlValue::Int(i),
                Err(_) => SqlValue::Text(s),
            },
            (ParamType::Str, SqlValue::Int(i)) => SqlValue::Text(i.to_string()),
            (ParamType::Str, SqlValue::Float(f)) => SqlValue::Text(f.to_string()),
            (ParamType::Str, SqlValue::Bool(b)) => SqlValue::Text(if b { "1" } else { "0" }.into()),
            (ParamType::Str, SqlValue::Blob(bytes)) => {
                SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
            (ParamType::Lob, SqlValue::Text(s)) => SqlValue::Blob(s.into_bytes()),
            (ParamType::Bool, SqlValue::Int(i)) => SqlValue::Bool(i != 0),
            (ParamType::Bool, SqlValue::Text(s)) => SqlValue::Bool(matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            )),
            (_, value) => value,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(i64::from(value))
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Blob(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}
