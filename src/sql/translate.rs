use indexmap::IndexMap;

use crate::dialect::{Dialect, PlaceholderStyle};
use crate::error::{DbError, Result};
use crate::sql::scanner::{scan, ScanItem, ScanOptions};
use crate::traits::BoundArg;
use crate::types::{ParamType, SqlValue};

/// A query rewritten to driver-native placeholders, plus the name of the
/// parameter at every placeholder, in order. Names repeat when a named
/// parameter is used more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTemplate {
    sql: String,
    names: Vec<String>,
}

impl PreparedTemplate {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameter names, one per placeholder occurrence.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of placeholder occurrences.
    pub fn param_count(&self) -> usize {
        self.names.len()
    }

    /// Parameter names in first-occurrence order, without repeats.
    pub fn distinct_names(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for name in &self.names {
            if !seen.contains(&name.as_str()) {
                seen.push(name.as_str());
            }
        }
        seen
    }

    pub fn declares(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Builds the ordered argument list, one entry per placeholder occurrence.
    ///
    /// # Errors
    /// [`DbError::Binding`] naming the first declared parameter without a
    /// value, or the first supplied name the query does not declare.
    pub fn arguments(
        &self,
        values: &IndexMap<String, (SqlValue, ParamType)>,
    ) -> Result<Vec<BoundArg>> {
        let mut args = Vec::with_capacity(self.names.len());
        for name in &self.names {
            let (value, param_type) = values.get(name).ok_or_else(|| DbError::Binding {
                parameter: name.clone(),
                message: "no value bound".to_string(),
            })?;
            args.push(BoundArg {
                name: name.clone(),
                value: value.clone().coerce(*param_type),
                param_type: *param_type,
            });
        }

        if let Some(extra) = values.keys().find(|name| !self.declares(name)) {
            return Err(DbError::Binding {
                parameter: extra.clone(),
                message: "not a parameter of this statement".to_string(),
            });
        }
        Ok(args)
    }
}

/// Rewrites caller SQL into a driver's placeholder syntax.
///
/// Every bare `marker` becomes a positional parameter named `p1`, `p2`, ...
/// in encounter order; `:name` keeps its own name. Literals, quoted
/// identifiers and comments are left untouched.
#[derive(Debug, Clone, Copy)]
pub struct QueryTranslator {
    marker: char,
    target: PlaceholderStyle,
    options: ScanOptions,
}

impl QueryTranslator {
    pub const DEFAULT_MARKER: char = '?';

    pub fn new(target: PlaceholderStyle) -> Self {
        Self {
            marker: Self::DEFAULT_MARKER,
            target,
            options: ScanOptions::default(),
        }
    }

    pub fn for_dialect(dialect: &Dialect) -> Self {
        Self {
            marker: Self::DEFAULT_MARKER,
            target: dialect.placeholders,
            options: ScanOptions::from(dialect),
        }
    }

    pub fn with_marker(mut self, marker: char) -> Self {
        self.marker = marker;
        self
    }

    pub fn with_scan_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    /// # Errors
    /// [`DbError::Binding`] when a named placeholder reuses one of the names
    /// given to positional markers, which would merge two parameters into one.
    pub fn translate(&self, query: &str) -> Result<PreparedTemplate> {
        let items = scan(query, self.options);
        let mut sql = String::with_capacity(query.len() + 8);
        let mut names: Vec<String> = Vec::new();
        let mut explicit: Vec<String> = Vec::new();
        let mut positional = 0usize;

        let mut i = 0;
        while i < items.len() {
            let item = items[i];
            if item.code && item.ch == ':' && named_at(&items, i) {
                let end = (i + 1..items.len())
                    .find(|&j| !(items[j].code && is_name_char(items[j].ch)))
                    .unwrap_or(items.len());
                let name: String = items[i + 1..end].iter().map(|it| it.ch).collect();
                explicit.push(name.clone());
                names.push(name);
                self.write_placeholder(&mut sql, &names);
                i = end;
                continue;
            }

            if item.code && item.ch == self.marker {
                positional += 1;
                names.push(format!("p{}", positional));
                self.write_placeholder(&mut sql, &names);
            } else {
                sql.push(item.ch);
            }
            i += 1;
        }

        if let Some(clash) = (1..=positional)
            .map(|n| format!("p{}", n))
            .find(|name| explicit.contains(name))
        {
            return Err(DbError::Binding {
                parameter: clash,
                message: "named placeholder clashes with a positional one".to_string(),
            });
        }
        Ok(PreparedTemplate { sql, names })
    }

    fn write_placeholder(&self, sql: &mut String, names: &[String]) {
        let Some(name) = names.last() else {
            return;
        };
        match self.target {
            PlaceholderStyle::Positional => sql.push('?'),
            PlaceholderStyle::Named(prefix) => {
                sql.push(prefix);
                sql.push_str(name);
            }
            PlaceholderStyle::Numbered(prefix) => {
                sql.push(prefix);
                sql.push_str(&names.len().to_string());
            }
        }
    }
}

/// Rewrites `query` using `marker` as the positional placeholder.
pub fn translate(query: &str, marker: char, target: PlaceholderStyle) -> Result<PreparedTemplate> {
    QueryTranslator::new(target).with_marker(marker).translate(query)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `:name`, but not the second colon of a `::` cast.
fn named_at(items: &[ScanItem], i: usize) -> bool {
    let after_colon = i > 0 && items[i - 1].code && items[i - 1].ch == ':';
    let starts_name = items
        .get(i + 1)
        .is_some_and(|next| next.code && (next.ch.is_alphabetic() || next.ch == '_'));
    !after_colon && starts_name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(template: &PreparedTemplate) -> Vec<&str> {
        template.names().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_positional_markers() {
        let t = translate(
            "SELECT * FROM t WHERE a = ? AND b = ?",
            '?',
            PlaceholderStyle::Positional,
        )
        .unwrap();
        assert_eq!(t.sql(), "SELECT * FROM t WHERE a = ? AND b = ?");
        assert_eq!(names(&t), vec!["p1", "p2"]);
    }

    #[test]
    fn test_named_target() {
        let t = translate("UPDATE t SET a = ? WHERE id = ?", '?', PlaceholderStyle::Named(':'))
            .unwrap();
        assert_eq!(t.sql(), "UPDATE t SET a = :p1 WHERE id = :p2");

        let t = translate("SELECT ?", '?', PlaceholderStyle::Named('@')).unwrap();
        assert_eq!(t.sql(), "SELECT @p1");
    }

    #[test]
    fn test_numbered_target() {
        let t = translate("VALUES (?, ?, ?)", '?', PlaceholderStyle::Numbered('$')).unwrap();
        assert_eq!(t.sql(), "VALUES ($1, $2, $3)");
        assert_eq!(t.param_count(), 3);
    }

    #[test]
    fn test_markers_inside_literals_are_ignored() {
        let sql = "SELECT '?' AS q, \"a?\" FROM t WHERE c = 'why?'";
        let t = translate(sql, '?', PlaceholderStyle::Named(':')).unwrap();
        assert_eq!(t.sql(), sql);
        assert_eq!(t.param_count(), 0);

        let t = translate("SELECT 'x?' FROM t WHERE c = ?", '?', PlaceholderStyle::Positional)
            .unwrap();
        assert_eq!(names(&t), vec!["p1"]);
    }

    #[test]
    fn test_no_markers() {
        let t = translate("SELECT 1", '?', PlaceholderStyle::Named(':')).unwrap();
        assert_eq!(t.sql(), "SELECT 1");
        assert!(t.names().is_empty());
    }

    #[test]
    fn test_escaped_quote_in_mysql_literal() {
        let dialect = Dialect::MYSQL.with_placeholders(PlaceholderStyle::Named(':'));
        let t = QueryTranslator::for_dialect(&dialect)
            .translate(r"SELECT * FROM t WHERE a = 'it\'s ?' AND b = ?").unwrap();
        assert_eq!(names(&t), vec!["p1"]);
        assert_eq!(t.sql(), r"SELECT * FROM t WHERE a = 'it\'s ?' AND b = :p1");
    }

    #[test]
    fn test_named_parameters_repeat() {
        let t = translate(
            "SELECT * FROM t WHERE a = :id OR b = :id OR c = :other",
            '?',
            PlaceholderStyle::Positional,
        )
        .unwrap();
        assert_eq!(t.sql(), "SELECT * FROM t WHERE a = ? OR b = ? OR c = ?");
        assert_eq!(names(&t), vec!["id", "id", "other"]);
        assert_eq!(t.distinct_names(), vec!["id", "other"]);
    }

    #[test]
    fn test_casts_are_not_parameters() {
        let t = translate("SELECT x::int FROM t", '?', PlaceholderStyle::Positional).unwrap();
        assert_eq!(t.sql(), "SELECT x::int FROM t");
        assert_eq!(t.param_count(), 0);
    }

    #[test]
    fn test_comments_are_skipped() {
        let t = translate(
            "SELECT a -- why?\nFROM t /* ? */ WHERE a = ?",
            '?',
            PlaceholderStyle::Positional,
        )
        .unwrap();
        assert_eq!(names(&t), vec!["p1"]);
    }

    #[test]
    fn test_custom_marker() {
        let t = translate("SELECT * FROM t WHERE a = % AND b = '%'", '%', PlaceholderStyle::Named(':'))
            .unwrap();
        assert_eq!(t.sql(), "SELECT * FROM t WHERE a = :p1 AND b = '%'");
    }

    #[test]
    fn test_named_placeholder_clashing_with_positional() {
        match translate("a = ? AND b = :p1", '?', PlaceholderStyle::Positional) {
            Err(DbError::Binding { parameter, .. }) => assert_eq!(parameter, "p1"),
            other => panic!("Expected Binding error, got {:?}", other),
        }
        // Names past the positional range do not collide.
        let t = translate("a = ? AND b = :p2", '?', PlaceholderStyle::Positional).unwrap();
        assert_eq!(names(&t), vec!["p1", "p2"]);
    }

    #[test]
    fn test_arguments_follow_occurrences() {
        let t = translate("a = :id OR b = :id OR c = ?", '?', PlaceholderStyle::Positional)
            .unwrap();
        let mut values = IndexMap::new();
        values.insert("p1".to_string(), (SqlValue::from("7"), ParamType::Int));
        values.insert("id".to_string(), (SqlValue::from("x"), ParamType::Str));

        let args = t.arguments(&values).unwrap();
        let got: Vec<(&str, &SqlValue)> = args.iter().map(|a| (a.name.as_str(), &a.value)).collect();
        assert_eq!(
            got,
            vec![
                ("id", &SqlValue::from("x")),
                ("id", &SqlValue::from("x")),
                ("p1", &SqlValue::Int(7)),
            ]
        );
    }

    #[test]
    fn test_arguments_report_missing_parameter() {
        let t = translate("a = ? AND b = ?", '?', PlaceholderStyle::Positional).unwrap();
        let mut values = IndexMap::new();
        values.insert("p1".to_string(), (SqlValue::Int(1), ParamType::Int));
        match t.arguments(&values) {
            Err(DbError::Binding { parameter, .. }) => assert_eq!(parameter, "p2"),
            other => panic!("Expected Binding error, got {:?}", other),
        }
    }

    #[test]
    fn test_arguments_report_unknown_parameter() {
        let t = translate("a = ?", '?', PlaceholderStyle::Positional).unwrap();
        let mut values = IndexMap::new();
        values.insert("p1".to_string(), (SqlValue::Int(1), ParamType::Int));
        values.insert("nope".to_string(), (SqlValue::Int(2), ParamType::Int));
        match t.arguments(&values) {
            Err(DbError::Binding { parameter, .. }) => assert_eq!(parameter, "nope"),
            other => panic!("Expected Binding error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_template_accepts_empty_arguments() {
        let t = translate("SELECT 1", '?', PlaceholderStyle::Positional).unwrap();
        assert!(t.arguments(&IndexMap::new()).unwrap().is_empty());
    }
}
