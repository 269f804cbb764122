use std::collections::HashMap;
use std::fmt;

/// Database family a driver talks to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DbType {
    Mysql,
    Oracle,
    SqlServer,
    Sqlite,
    Pgsql,
    /// A PDO scheme the driver table does not know.
    Other(String),
}

impl DbType {
    pub fn as_str(&self) -> &str {
        match self {
            DbType::Mysql => "mysql",
            DbType::Oracle => "oci",
            DbType::SqlServer => "sqlsrv",
            DbType::Sqlite => "sqlite",
            DbType::Pgsql => "pgsql",
            DbType::Other(name) => name,
        }
    }

    /// Network databases need a host; file databases need a path.
    pub fn is_network(&self) -> bool {
        !matches!(self, DbType::Sqlite)
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical description of a driver alias:
/// `(dbtype, native extension, pdo driver, pdo extension)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverInfo {
    pub dbtype: DbType,
    /// Native client library, `None` when the database is only reachable through PDO.
    pub native_extension: Option<String>,
    pub pdo_driver: String,
    pub pdo_extension: String,
    /// The alias itself selects the PDO path (`pdo_mysql`, ...).
    pub implies_pdo: bool,
}

impl DriverInfo {
    pub fn new(
        dbtype: DbType,
        native_extension: Option<&str>,
        pdo_driver: &str,
        pdo_extension: &str,
    ) -> Self {
        Self {
            dbtype,
            native_extension: native_extension.map(str::to_string),
            pdo_driver: pdo_driver.to_string(),
            pdo_extension: pdo_extension.to_string(),
            implies_pdo: false,
        }
    }

    fn pdo_only(mut self) -> Self {
        self.implies_pdo = true;
        self
    }

    /// Entry for a PDO scheme that has no table row.
    pub(crate) fn generic(scheme: &str) -> Self {
        Self {
            dbtype: DbType::Other(scheme.to_string()),
            native_extension: None,
            pdo_driver: scheme.to_string(),
            pdo_extension: format!("pdo_{}", scheme),
            implies_pdo: true,
        }
    }
}

/// Immutable lookup table from accepted driver aliases to their canonical description.
#[derive(Debug, Clone)]
pub struct DriverTable {
    aliases: HashMap<String, DriverInfo>,
    schemes: HashMap<String, DriverInfo>,
}

impl DriverTable {
    /// A table accepting no alias at all.
    pub fn empty() -> Self {
        Self {
            aliases: HashMap::new(),
            schemes: HashMap::new(),
        }
    }

    /// The built-in aliases.
    pub fn builtin() -> Self {
        let mysql = DriverInfo::new(DbType::Mysql, Some("mysqli"), "mysql", "pdo_mysql");
        let oracle = DriverInfo::new(DbType::Oracle, Some("oci8"), "oci", "pdo_oci");
        let sqlsrv = DriverInfo::new(DbType::SqlServer, Some("sqlsrv"), "sqlsrv", "pdo_sqlsrv");
        let sqlite = DriverInfo::new(DbType::Sqlite, Some("sqlite3"), "sqlite", "pdo_sqlite");
        let pgsql = DriverInfo::new(DbType::Pgsql, None, "pgsql", "pdo_pgsql");

        Self::empty()
            .with_alias("mysqli", mysql.clone())
            .with_alias("mysql", mysql.clone())
            .with_alias("pdo_mysql", mysql.pdo_only())
            .with_alias("oci", oracle.clone())
            .with_alias("oci8", oracle.clone())
            .with_alias("oracle", oracle.clone())
            .with_alias("pdo_oci", oracle.pdo_only())
            .with_alias("sqlsrv", sqlsrv.clone())
            .with_alias("mssql", sqlsrv.clone())
            .with_alias("pdo_sqlsrv", sqlsrv.pdo_only())
            .with_alias("sqlite3", sqlite.clone())
            .with_alias("sqlite", sqlite.clone())
            .with_alias("pdo_sqlite", sqlite.pdo_only())
            .with_alias("pgsql", pgsql.clone())
            .with_alias("pdo_pgsql", pgsql.pdo_only())
    }

    /// Adds an alias. The first alias registered for a PDO driver also
    /// resolves DSNs using that scheme.
    pub fn with_alias(mut self, alias: &str, info: DriverInfo) -> Self {
        self.schemes
            .entry(info.pdo_driver.to_ascii_lowercase())
            .or_insert_with(|| info.clone());
        self.aliases.insert(alias.trim().to_ascii_lowercase(), info);
        self
    }

    /// Looks up a driver alias (case-insensitive).
    pub fn lookup(&self, alias: &str) -> Option<&DriverInfo> {
        self.aliases.get(&alias.trim().to_ascii_lowercase())
    }

    /// Looks up the driver serving a PDO DSN scheme (case-insensitive).
    pub fn by_scheme(&self, scheme: &str) -> Option<&DriverInfo> {
        self.schemes.get(&scheme.trim().to_ascii_lowercase())
    }

    /// All accepted aliases, sorted.
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<_> = self.aliases.keys().map(|s| s.as_str()).collect();
        aliases.sort_unstable();
        aliases
    }
}

impl Default for DriverTable {
    fn default() -> Self {
        Self::builtin()
    }
}
