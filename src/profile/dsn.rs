//! PDO-style DSN helpers: `scheme:key=value;key=value`.

use crate::error::{DbError, Result};
use crate::profile::DbType;

/// Splits a DSN into its scheme and body.
pub fn split_scheme(dsn: &str) -> Result<(&str, &str)> {
    let dsn = dsn.trim();
    if dsn.is_empty() {
        return Err(DbError::Configuration("invalid DSN: empty DSN".to_string()));
    }

    match dsn.find(':') {
        Some(colon) => {
            let scheme = dsn[..colon].trim();
            let valid = !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(DbError::Configuration(format!(
                    "invalid DSN `{}`: bad driver name",
                    dsn
                )));
            }
            Ok((scheme, &dsn[colon + 1..]))
        }
        None => Err(DbError::Configuration(format!(
            "invalid DSN `{}`: expected 'driver:connection_string'",
            dsn
        ))),
    }
}

/// Iterates over the `key=value` pairs of a DSN body.
pub fn pairs(body: &str) -> impl Iterator<Item = (&str, &str)> {
    body.split(';').filter_map(|part| {
        let mut it = part.splitn(2, '=');
        let key = it.next()?.trim();
        let value = it.next()?.trim();
        if key.is_empty() {
            None
        } else {
            Some((key, value))
        }
    })
}

/// Value of a DSN key (case-insensitive), if present.
pub fn lookup<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    pairs(body)
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// Discrete connection fields a DSN is synthesized from.
#[derive(Debug, Default, Clone, Copy)]
pub struct DsnFields<'a> {
    pub host: Option<&'a str>,
    pub port: Option<u16>,
    pub database: Option<&'a str>,
    pub charset: Option<&'a str>,
}

/// Builds a DSN from discrete fields, using the key order each PDO driver expects.
///
/// Fails when a field the driver cannot do without is missing.
pub fn synthesize(dbtype: &DbType, pdo_driver: &str, fields: &DsnFields<'_>) -> Result<String> {
    let missing = |field: &str| {
        DbError::Configuration(format!(
            "cannot build a `{}` DSN: missing `{}` in profile",
            pdo_driver, field
        ))
    };

    let dsn = match dbtype {
        DbType::Sqlite => {
            let database = fields.database.ok_or_else(|| missing("database"))?;
            format!("sqlite:{}", database)
        }
        DbType::Oracle => {
            let database = fields.database.ok_or_else(|| missing("database"))?;
            let mut dsn = match (fields.host, fields.port) {
                (Some(host), Some(port)) => format!("oci:dbname=//{}:{}/{}", host, port, database),
                (Some(host), None) => format!("oci:dbname=//{}/{}", host, database),
                (None, _) => format!("oci:dbname={}", database),
            };
            if let Some(charset) = fields.charset {
                dsn.push_str(&format!(";charset={}", charset));
            }
            dsn
        }
        DbType::SqlServer => {
            let host = fields.host.ok_or_else(|| missing("host"))?;
            let mut dsn = match fields.port {
                Some(port) => format!("sqlsrv:Server={},{}", host, port),
                None => format!("sqlsrv:Server={}", host),
            };
            if let Some(database) = fields.database {
                dsn.push_str(&format!(";Database={}", database));
            }
            dsn
        }
        DbType::Mysql | DbType::Pgsql | DbType::Other(_) => {
            let host = fields.host.ok_or_else(|| missing("host"))?;
            let mut dsn = format!("{}:host={}", pdo_driver, host);
            if let Some(database) = fields.database {
                dsn.push_str(&format!(";dbname={}", database));
            }
            if let Some(port) = fields.port {
                dsn.push_str(&format!(";port={}", port));
            }
            if let (DbType::Mysql, Some(charset)) = (dbtype, fields.charset) {
                dsn.push_str(&format!(";charset={}", mysql_charset(charset)));
            }
            dsn
        }
    };
    Ok(dsn)
}

/// MySQL spells `UTF-8` as `utf8mb4`.
fn mysql_charset(charset: &str) -> String {
    match charset.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => "utf8mb4".to_string(),
        other => other.to_string(),
    }
}
