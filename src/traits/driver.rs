use std::fmt;

use crate::error::Result;
use crate::profile::NormalizedProfile;
use crate::traits::{Cursor, Statement};
use crate::types::SqlValue;

/// Connection attributes passed through to the driver untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attribute {
    ClientVersion,
    ServerVersion,
    ServerInfo,
    Autocommit,
    Timeout,
    DriverName,
    /// A driver-specific attribute.
    Custom(String),
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::ClientVersion => f.write_str("client_version"),
            Attribute::ServerVersion => f.write_str("server_version"),
            Attribute::ServerInfo => f.write_str("server_info"),
            Attribute::Autocommit => f.write_str("autocommit"),
            Attribute::Timeout => f.write_str("timeout"),
            Attribute::DriverName => f.write_str("driver_name"),
            Attribute::Custom(name) => f.write_str(name),
        }
    }
}

/// Trait for database driver implementations.
/// Drivers are responsible for:
/// - Opening and closing the native handle
/// - Running raw SQL, already rewritten to the driver's placeholder and
///   pagination syntax by the core
/// - Converting native values to and from [`SqlValue`]
///
/// A driver owns exactly one native handle and is used from one thread at a time.
pub trait DatabaseDriver: Send {
    /// Driver name (e.g., "sqlite")
    fn name(&self) -> &'static str;

    /// Open the native handle. On failure no handle may be left open.
    fn connect(&mut self, profile: &NormalizedProfile) -> Result<()>;

    /// Release the native handle. Called at most once after a successful connect.
    fn disconnect(&mut self) -> Result<()>;

    /// Run a statement returning rows.
    fn query(&mut self, sql: &str) -> Result<Box<dyn Cursor>>;

    /// Run a statement returning an affected row count.
    fn exec(&mut self, sql: &str) -> Result<u64>;

    /// Prepare a statement whose placeholders are already driver-native.
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>>;

    fn begin_transaction(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Notification that autocommit is switched on or off around a transaction.
    fn set_autocommit(&mut self, enabled: bool) -> Result<()>;

    /// Most recently generated identifier. `sequence` is set for drivers using sequences.
    fn last_insert_id(&mut self, sequence: Option<&str>) -> Result<String>;

    fn attribute(&self, attribute: &Attribute) -> Result<Option<SqlValue>>;

    fn set_attribute(&mut self, attribute: &Attribute, value: SqlValue) -> Result<()>;
}
