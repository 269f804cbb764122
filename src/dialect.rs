//! Per-database SQL conventions the core needs to know about.

use crate::profile::{DbType, NormalizedProfile};

/// How `limit_query` expresses an offset/count window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// `LIMIT offset, count`
    LimitComma,
    /// `LIMIT count OFFSET offset`
    LimitOffset,
    /// Outer query filtering the `ROWNUM` pseudo column.
    RowNum,
    /// `OFFSET o ROWS FETCH NEXT c ROWS ONLY`, which needs an `ORDER BY`.
    OffsetFetch,
}

impl Pagination {
    /// Whether the syntax can ask for zero rows.
    pub fn expresses_zero_rows(&self) -> bool {
        matches!(self, Pagination::LimitComma | Pagination::LimitOffset)
    }
}

/// Placeholder syntax a driver accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?`
    Positional,
    /// A prefix followed by the parameter name: `:name`, `@name`.
    Named(char),
    /// A prefix followed by the 1-based occurrence number: `$1`.
    Numbered(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub pagination: Pagination,
    pub placeholders: PlaceholderStyle,
    /// A backslash escapes the next character inside string literals.
    pub backslash_escapes: bool,
    /// `[name]` is a quoted identifier.
    pub bracket_identifiers: bool,
    pub identifier_quotes: (char, char),
    /// `last_insert_id` needs a sequence name.
    pub sequences: bool,
}

impl Dialect {
    pub const MYSQL: Dialect = Dialect {
        pagination: Pagination::LimitComma,
        placeholders: PlaceholderStyle::Positional,
        backslash_escapes: true,
        bracket_identifiers: false,
        identifier_quotes: ('`', '`'),
        sequences: false,
    };

    pub const SQLITE: Dialect = Dialect {
        pagination: Pagination::LimitComma,
        placeholders: PlaceholderStyle::Positional,
        backslash_escapes: false,
        bracket_identifiers: false,
        identifier_quotes: ('"', '"'),
        sequences: false,
    };

    pub const ORACLE: Dialect = Dialect {
        pagination: Pagination::RowNum,
        placeholders: PlaceholderStyle::Named(':'),
        backslash_escapes: false,
        bracket_identifiers: false,
        identifier_quotes: ('"', '"'),
        sequences: true,
    };

    pub const SQLSERVER: Dialect = Dialect {
        pagination: Pagination::OffsetFetch,
        placeholders: PlaceholderStyle::Positional,
        backslash_escapes: false,
        bracket_identifiers: true,
        identifier_quotes: ('[', ']'),
        sequences: false,
    };

    pub const PGSQL: Dialect = Dialect {
        pagination: Pagination::LimitOffset,
        placeholders: PlaceholderStyle::Numbered('$'),
        backslash_escapes: false,
        bracket_identifiers: false,
        identifier_quotes: ('"', '"'),
        sequences: true,
    };

    pub const GENERIC: Dialect = Dialect {
        pagination: Pagination::LimitOffset,
        placeholders: PlaceholderStyle::Positional,
        backslash_escapes: false,
        bracket_identifiers: false,
        identifier_quotes: ('"', '"'),
        sequences: false,
    };

    pub fn for_db(dbtype: &DbType) -> Dialect {
        match dbtype {
            DbType::Mysql => Self::MYSQL,
            DbType::Sqlite => Self::SQLITE,
            DbType::Oracle => Self::ORACLE,
            DbType::SqlServer => Self::SQLSERVER,
            DbType::Pgsql => Self::PGSQL,
            DbType::Other(_) => Self::GENERIC,
        }
    }

    /// The dialect of a profile. PDO takes `?` for every database.
    pub fn for_profile(profile: &NormalizedProfile) -> Dialect {
        let dialect = Self::for_db(&profile.dbtype);
        if profile.use_pdo {
            dialect.with_placeholders(PlaceholderStyle::Positional)
        } else {
            dialect
        }
    }

    pub fn with_placeholders(mut self, placeholders: PlaceholderStyle) -> Dialect {
        self.placeholders = placeholders;
        self
    }

    /// Quotes a string as a SQL literal.
    pub fn quote_literal(&self, value: &str) -> String {
        let mut quoted = String::with_capacity(value.len() + 2);
        quoted.push('\'');
        for c in value.chars() {
            match c {
                '\'' => quoted.push_str("''"),
                '\\' if self.backslash_escapes => quoted.push_str("\\\\"),
                '\0' if self.backslash_escapes => quoted.push_str("\\0"),
                c => quoted.push(c),
            }
        }
        quoted.push('\'');
        quoted
    }

    /// Quotes a possibly dotted identifier (`schema.table`), part by part.
    pub fn enclose_name(&self, name: &str) -> String {
        let (open, close) = self.identifier_quotes;
        name.split('.')
            .map(|part| {
                let escaped = part.replace(close, &format!("{}{}", close, close));
                format!("{}{}{}", open, escaped, close)
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}
