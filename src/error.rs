use thiserror::Error;

/// Error type for dbaccess operations
#[derive(Debug, Error)]
pub enum DbError {
    /// The connection profile is missing a field or names an unknown driver.
    #[error("Invalid profile: {0}")]
    Configuration(String),

    /// The native connect call failed. The connection instance is unusable afterwards.
    #[error("Connection failed: {message}")]
    Connection { code: Option<i64>, message: String },

    /// A statement was rejected by the database. The connection stays usable.
    #[error("Query failed: {message} (query: {sql})")]
    Query {
        sql: String,
        code: Option<i64>,
        message: String,
    },

    /// The parameters supplied to a prepared statement do not match its placeholders.
    #[error("Parameter `{parameter}`: {message}")]
    Binding { parameter: String, message: String },

    /// An operation was called in the wrong lifecycle state or is unsupported.
    #[error("Invalid state: {0}")]
    State(String),
}

impl DbError {
    pub(crate) fn connection(message: impl Into<String>) -> Self {
        DbError::Connection {
            code: None,
            message: message.into(),
        }
    }

    pub(crate) fn query(sql: &str, message: impl Into<String>) -> Self {
        DbError::Query {
            sql: sql.to_string(),
            code: None,
            message: message.into(),
        }
    }

    /// Returns true when the error leaves the connection unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DbError::Connection { .. })
    }
}

/// Result type alias for dbaccess operations
pub type Result<T> = std::result::Result<T, DbError>;
