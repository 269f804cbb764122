use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{DbError, Result};
use crate::profile::dsn::{self, DsnFields};
use crate::profile::{
    CompiledExtensions, ConnectionProfile, DbType, DriverInfo, DriverTable, ExtensionProbe,
    ProfileValue,
};

/// Charset used when the profile does not name one.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Keys with a meaning of their own. Everything else is a driver extra.
const CANONICAL_KEYS: &[&str] = &[
    "_name",
    "driver",
    "dsn",
    "host",
    "port",
    "user",
    "password",
    "database",
    "charset",
    "table_prefix",
    "persistent",
    "usepdo",
    "timeout",
    "force_encoding",
    "pdooptions",
    "dbtype",
    "phpext",
    "pdodriver",
    "pdoext",
];

/// The low-level access path chosen for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    MysqlNative,
    MysqlPdo,
    OracleNative,
    OraclePdo,
    SqlServerNative,
    SqliteNative,
    SqlitePdo,
    GenericPdo,
}

impl DriverKind {
    fn resolve(dbtype: &DbType, use_pdo: bool) -> Self {
        match (dbtype, use_pdo) {
            (DbType::Mysql, false) => DriverKind::MysqlNative,
            (DbType::Mysql, true) => DriverKind::MysqlPdo,
            (DbType::Oracle, false) => DriverKind::OracleNative,
            (DbType::Oracle, true) => DriverKind::OraclePdo,
            (DbType::SqlServer, false) => DriverKind::SqlServerNative,
            (DbType::Sqlite, false) => DriverKind::SqliteNative,
            (DbType::Sqlite, true) => DriverKind::SqlitePdo,
            _ => DriverKind::GenericPdo,
        }
    }

    pub fn is_pdo(&self) -> bool {
        matches!(
            self,
            DriverKind::MysqlPdo
                | DriverKind::OraclePdo
                | DriverKind::SqlitePdo
                | DriverKind::GenericPdo
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::MysqlNative => "mysql-native",
            DriverKind::MysqlPdo => "mysql-pdo",
            DriverKind::OracleNative => "oracle-native",
            DriverKind::OraclePdo => "oracle-pdo",
            DriverKind::SqlServerNative => "sqlserver-native",
            DriverKind::SqliteNative => "sqlite-native",
            DriverKind::SqlitePdo => "sqlite-pdo",
            DriverKind::GenericPdo => "generic-pdo",
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved connection profile.
///
/// Only [`ParameterNormalizer::normalize`] builds one, so the invariants hold:
/// `use_pdo` agrees with `driver`, a PDO profile always has a `dsn`, and
/// `table_prefix` is never missing.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct NormalizedProfile {
    /// Profile name, from the `_name` key.
    pub name: Option<String>,
    pub driver: DriverKind,
    /// The driver alias as the caller spelled it.
    pub driver_name: String,
    pub dbtype: DbType,
    pub native_extension: Option<String>,
    pub pdo_driver: String,
    pub pdo_extension: String,
    pub use_pdo: bool,
    pub dsn: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub charset: String,
    pub table_prefix: String,
    pub persistent: bool,
    pub force_encoding: bool,
    /// Driver-native timeout, in seconds.
    pub timeout: Option<u64>,
    /// Comma-joined names of the extra keys passed through to PDO.
    pub pdo_options: String,
    pub extras: IndexMap<String, ProfileValue>,
}

impl NormalizedProfile {
    /// The client library the chosen path needs.
    pub fn required_extension(&self) -> &str {
        match (&self.native_extension, self.use_pdo) {
            (Some(native), false) => native,
            _ => &self.pdo_extension,
        }
    }

    /// The part of the DSN after `scheme:`.
    pub fn dsn_body(&self) -> Option<&str> {
        self.dsn
            .as_deref()
            .and_then(|dsn| dsn::split_scheme(dsn).ok())
            .map(|(_, body)| body)
    }
}

/// Resolves raw profiles into [`NormalizedProfile`]s.
pub struct ParameterNormalizer {
    table: DriverTable,
    probe: Box<dyn ExtensionProbe>,
}

impl ParameterNormalizer {
    /// A normalizer using the built-in driver table and the compiled-in client libraries.
    pub fn new() -> Self {
        Self::with_table(DriverTable::builtin())
    }

    pub fn with_table(table: DriverTable) -> Self {
        Self {
            table,
            probe: Box::new(CompiledExtensions),
        }
    }

    /// Replaces the capability probe used by [`Self::is_extension_activated`].
    pub fn with_probe(mut self, probe: impl ExtensionProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn table(&self) -> &DriverTable {
        &self.table
    }

    /// Reports whether the client library of a profile can be loaded.
    /// A `false` here only surfaces as an error when connecting.
    pub fn is_extension_activated(&self, profile: &NormalizedProfile) -> bool {
        self.probe.is_loaded(profile.required_extension())
    }

    /// Resolves a raw profile.
    ///
    /// # Errors
    /// [`DbError::Configuration`] when `driver` is missing or unknown, when a
    /// DSN is malformed, or when a field the chosen path needs is absent.
    pub fn normalize(&self, raw: &ConnectionProfile) -> Result<NormalizedProfile> {
        let driver_name = raw
            .get_str("driver")
            .ok_or_else(|| DbError::Configuration("profile has no `driver`".to_string()))?;
        let explicit_dsn = raw.get_str("dsn");

        let (info, use_pdo) = if driver_name.eq_ignore_ascii_case("pdo") {
            let dsn = explicit_dsn.as_deref().ok_or_else(|| {
                DbError::Configuration("driver `pdo` requires a `dsn`".to_string())
            })?;
            let (scheme, _) = dsn::split_scheme(dsn)?;
            let info = self
                .table
                .by_scheme(scheme)
                .cloned()
                .unwrap_or_else(|| DriverInfo::generic(&scheme.to_ascii_lowercase()));
            (info, true)
        } else {
            let info = self.table.lookup(&driver_name).cloned().ok_or_else(|| {
                DbError::Configuration(format!("unknown driver `{}`", driver_name))
            })?;
            let use_pdo = info.implies_pdo || raw.get_bool("usepdo");
            if !use_pdo && info.native_extension.is_none() {
                return Err(DbError::Configuration(format!(
                    "driver `{}` has no native access path, set `usepdo`",
                    driver_name
                )));
            }
            (info, use_pdo)
        };

        let mut host = raw.get_str("host");
        let mut database = raw.get_str("database");
        let mut port = parse_port(raw)?;
        let timeout = parse_timeout(raw)?;
        let charset = raw
            .get_str("charset")
            .unwrap_or_else(|| DEFAULT_CHARSET.to_string());

        let dsn = if use_pdo {
            let dsn = match explicit_dsn {
                Some(dsn) => {
                    let (scheme, body) = dsn::split_scheme(&dsn)?;
                    if !scheme.eq_ignore_ascii_case(&info.pdo_driver) {
                        return Err(DbError::Configuration(format!(
                            "DSN scheme `{}` does not match driver `{}`",
                            scheme, driver_name
                        )));
                    }
                    if info.dbtype == DbType::Sqlite {
                        database = database.or_else(|| Some(body.trim().to_string()));
                    } else {
                        host = host.or_else(|| dsn::lookup(body, "host").map(str::to_string));
                        database =
                            database.or_else(|| dsn::lookup(body, "dbname").map(str::to_string));
                        if port.is_none() {
                            port = dsn::lookup(body, "port").and_then(|p| p.parse().ok());
                        }
                    }
                    dsn
                }
                None => dsn::synthesize(
                    &info.dbtype,
                    &info.pdo_driver,
                    &DsnFields {
                        host: host.as_deref(),
                        port,
                        database: database.as_deref(),
                        charset: raw.get_str("charset").as_deref(),
                    },
                )?,
            };
            Some(dsn)
        } else {
            if info.dbtype == DbType::Sqlite && database.is_none() {
                return Err(DbError::Configuration(format!(
                    "driver `{}` needs `database` in profile",
                    driver_name
                )));
            }
            None
        };

        let extras: IndexMap<String, ProfileValue> = raw
            .iter()
            .filter(|(key, _)| !CANONICAL_KEYS.contains(key))
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();
        let pdo_options = if use_pdo {
            extras.keys().map(String::as_str).collect::<Vec<_>>().join(",")
        } else {
            String::new()
        };

        let profile = NormalizedProfile {
            name: raw.get_str("_name"),
            driver: DriverKind::resolve(&info.dbtype, use_pdo),
            driver_name,
            dbtype: info.dbtype,
            native_extension: info.native_extension,
            pdo_driver: info.pdo_driver,
            pdo_extension: info.pdo_extension,
            use_pdo,
            dsn,
            host,
            port,
            user: raw.get_str("user"),
            password: raw.get_str("password"),
            database,
            charset,
            table_prefix: raw.get_str("table_prefix").unwrap_or_default(),
            persistent: raw.get_bool("persistent"),
            force_encoding: raw.get_bool("force_encoding"),
            timeout,
            pdo_options,
            extras,
        };

        debug!(
            driver = %profile.driver,
            dbtype = %profile.dbtype,
            use_pdo = profile.use_pdo,
            "Normalized connection profile"
        );
        Ok(profile)
    }
}

impl Default for ParameterNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParameterNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterNormalizer")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

fn parse_port(raw: &ConnectionProfile) -> Result<Option<u16>> {
    let Some(value) = raw.get_str("port") else {
        return Ok(None);
    };
    value
        .parse::<u16>()
        .map(Some)
        .map_err(|_| DbError::Configuration(format!("`port` must be an integer, got `{}`", value)))
}

fn parse_timeout(raw: &ConnectionProfile) -> Result<Option<u64>> {
    let Some(value) = raw.get_str("timeout") else {
        return Ok(None);
    };
    value.parse::<u64>().map(Some).map_err(|_| {
        DbError::Configuration(format!("`timeout` must be an integer, got `{}`", value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::StaticExtensions;

    fn profile(pairs: &[(&str, &str)]) -> ConnectionProfile {
        pairs.iter().copied().collect()
    }

    fn normalize(pairs: &[(&str, &str)]) -> Result<NormalizedProfile> {
        ParameterNormalizer::new().normalize(&profile(pairs))
    }

    fn expect_configuration_error(result: Result<NormalizedProfile>) -> String {
        match result {
            Err(DbError::Configuration(msg)) => msg,
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_native_mysqli_profile() {
        let p = normalize(&[("driver", "mysqli"), ("host", "localhost"), ("database", "x")])
            .unwrap();
        assert_eq!(p.dbtype, DbType::Mysql);
        assert_eq!(p.native_extension.as_deref(), Some("mysqli"));
        assert_eq!(p.driver_name, "mysqli");
        assert_eq!(p.driver, DriverKind::MysqlNative);
        assert!(!p.use_pdo);
        assert!(p.dsn.is_none());
        assert_eq!(p.table_prefix, "");
        assert_eq!(p.charset, DEFAULT_CHARSET);
    }

    #[test]
    fn test_pdo_with_dsn() {
        let p = normalize(&[("driver", "pdo"), ("dsn", "mysql:host=localhost;dbname=x")]).unwrap();
        assert_eq!(p.dbtype, DbType::Mysql);
        assert_eq!(p.native_extension.as_deref(), Some("mysqli"));
        assert_eq!(p.pdo_driver, "mysql");
        assert_eq!(p.pdo_extension, "pdo_mysql");
        assert!(p.use_pdo);
        assert_eq!(p.driver, DriverKind::MysqlPdo);
        assert_eq!(p.dsn.as_deref(), Some("mysql:host=localhost;dbname=x"));
        assert_eq!(p.host.as_deref(), Some("localhost"));
        assert_eq!(p.database.as_deref(), Some("x"));
    }

    #[test]
    fn test_missing_driver() {
        let msg = expect_configuration_error(normalize(&[("host", "localhost")]));
        assert!(msg.contains("driver"));
        expect_configuration_error(normalize(&[("driver", "   ")]));
    }

    #[test]
    fn test_unknown_driver() {
        let msg = expect_configuration_error(normalize(&[("driver", "informix")]));
        assert!(msg.contains("informix"));
    }

    #[test]
    fn test_usepdo_synthesizes_dsn() {
        let p = normalize(&[
            ("driver", "mysql"),
            ("usepdo", "on"),
            ("host", "db"),
            ("database", "app"),
            ("port", "3307"),
        ])
        .unwrap();
        assert!(p.use_pdo);
        assert_eq!(p.driver, DriverKind::MysqlPdo);
        assert_eq!(p.port, Some(3307));
        assert_eq!(p.dsn.as_deref(), Some("mysql:host=db;dbname=app;port=3307"));
    }

    #[test]
    fn test_usepdo_names_missing_field() {
        let msg = expect_configuration_error(normalize(&[
            ("driver", "mysqli"),
            ("usepdo", "1"),
            ("database", "x"),
        ]));
        assert!(msg.contains("`host`"), "{}", msg);
    }

    #[test]
    fn test_pdo_without_dsn() {
        expect_configuration_error(normalize(&[("driver", "pdo"), ("host", "x")]));
    }

    #[test]
    fn test_pdo_unknown_scheme_is_generic() {
        let p = normalize(&[("driver", "pdo"), ("dsn", "odbc:DSN=warehouse")]).unwrap();
        assert_eq!(p.driver, DriverKind::GenericPdo);
        assert_eq!(p.dbtype, DbType::Other("odbc".to_string()));
        assert_eq!(p.pdo_extension, "pdo_odbc");
        assert!(p.use_pdo);
    }

    #[test]
    fn test_pgsql_requires_pdo() {
        expect_configuration_error(normalize(&[("driver", "pgsql"), ("host", "h")]));
        let p = normalize(&[("driver", "pdo_pgsql"), ("host", "h"), ("database", "d")]).unwrap();
        assert_eq!(p.driver, DriverKind::GenericPdo);
        assert_eq!(p.dsn.as_deref(), Some("pgsql:host=h;dbname=d"));
    }

    #[test]
    fn test_dsn_scheme_must_match_driver() {
        expect_configuration_error(normalize(&[
            ("driver", "mysqli"),
            ("usepdo", "1"),
            ("dsn", "pgsql:host=h"),
        ]));
    }

    #[test]
    fn test_extra_keys_become_pdo_options() {
        let p = normalize(&[
            ("driver", "sqlite3"),
            ("usepdo", "1"),
            ("database", "/tmp/app.db"),
            ("busy_wait", "1"),
            ("journal", "wal"),
        ])
        .unwrap();
        assert_eq!(p.pdo_options, "busy_wait,journal");
        assert_eq!(p.extras.len(), 2);

        let native = normalize(&[("driver", "sqlite3"), ("database", "a.db"), ("journal", "wal")])
            .unwrap();
        assert_eq!(native.pdo_options, "");
        assert!(native.extras.contains_key("journal"));
    }

    #[test]
    fn test_numeric_fields_are_coerced() {
        let raw = ConnectionProfile::new()
            .with("driver", "sqlsrv")
            .with("host", "srv")
            .with("port", 1433)
            .with("timeout", "30");
        let p = ParameterNormalizer::new().normalize(&raw).unwrap();
        assert_eq!(p.port, Some(1433));
        assert_eq!(p.timeout, Some(30));

        expect_configuration_error(normalize(&[("driver", "mysqli"), ("port", "abc")]));
        expect_configuration_error(normalize(&[("driver", "mysqli"), ("port", "70000")]));
    }

    #[test]
    fn test_every_alias_has_a_canonical_driver() {
        let normalizer = ParameterNormalizer::new();
        for alias in normalizer.table().aliases() {
            let raw = profile(&[
                ("driver", alias),
                ("host", "h"),
                ("database", "d"),
                ("usepdo", "0"),
            ]);
            let pdo_only = normalizer.table().lookup(alias).unwrap().native_extension.is_none();
            match normalizer.normalize(&raw) {
                Ok(p) => {
                    assert_eq!(p.driver.is_pdo(), p.use_pdo, "alias {}", alias);
                    assert_eq!(p.use_pdo, p.dsn.is_some(), "alias {}", alias);
                }
                Err(_) => assert!(pdo_only, "alias {} should normalize", alias),
            }
        }
    }

    #[test]
    fn test_sqlsrv_pdo_is_generic() {
        let p = normalize(&[("driver", "pdo_sqlsrv"), ("host", "srv"), ("database", "db")])
            .unwrap();
        assert_eq!(p.driver, DriverKind::GenericPdo);
        assert_eq!(p.dbtype, DbType::SqlServer);
        assert_eq!(p.dsn.as_deref(), Some("sqlsrv:Server=srv;Database=db"));
    }

    #[test]
    fn test_extension_probe() {
        let normalizer = ParameterNormalizer::new().with_probe(StaticExtensions::new(["mysqli"]));
        let native = normalizer
            .normalize(&profile(&[("driver", "mysqli"), ("host", "h")]))
            .unwrap();
        assert!(normalizer.is_extension_activated(&native));

        let pdo = normalizer
            .normalize(&profile(&[("driver", "mysqli"), ("usepdo", "1"), ("host", "h")]))
            .unwrap();
        assert_eq!(pdo.required_extension(), "pdo_mysql");
        assert!(!normalizer.is_extension_activated(&pdo));
    }

    #[test]
    fn test_custom_driver_table() {
        let table = DriverTable::empty().with_alias(
            "legacy",
            DriverInfo::new(DbType::Sqlite, Some("sqlite3"), "sqlite", "pdo_sqlite"),
        );
        let normalizer = ParameterNormalizer::with_table(table);
        let p = normalizer
            .normalize(&profile(&[("driver", "legacy"), ("database", ":memory:")]))
            .unwrap();
        assert_eq!(p.driver, DriverKind::SqliteNative);
        expect_configuration_error(
            normalizer.normalize(&profile(&[("driver", "mysqli"), ("host", "h")])),
        );
    }
}
