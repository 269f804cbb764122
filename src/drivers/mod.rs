mod buffered;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use self::buffered::BufferedCursor;
pub use self::in_memory_test::{InMemoryTestDriver, InMemoryTestResponseBuilder, RecordedQuery};
#[cfg(feature = "sqlite")]
pub use self::sqlite::SqliteDriver;

use crate::error::{DbError, Result};
use crate::profile::NormalizedProfile;
use crate::traits::DatabaseDriver;

/// Returns true if the native client library `extension` is compiled into this build.
pub fn is_compiled(extension: &str) -> bool {
    match extension {
        "sqlite3" | "pdo_sqlite" => cfg!(feature = "sqlite"),
        _ => false,
    }
}

/// Picks the compiled driver able to serve `profile`.
///
/// # Errors
/// [`DbError::Connection`] if the client library the profile needs is not part of this build.
pub fn open_driver(profile: &NormalizedProfile) -> Result<Box<dyn DatabaseDriver>> {
    match profile.driver {
        #[cfg(feature = "sqlite")]
        crate::profile::DriverKind::SqliteNative | crate::profile::DriverKind::SqlitePdo => {
            Ok(Box::new(SqliteDriver::new()))
        }
        _ => Err(DbError::connection(format!(
            "extension `{}` is not available for driver `{}`",
            profile.required_extension(),
            profile.driver
        ))),
    }
}
