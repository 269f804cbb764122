//! Offset/count windows for databases with and without `LIMIT`.

use crate::dialect::{Dialect, Pagination};
use crate::error::{DbError, Result};
use crate::sql::scanner::{
    find_keyword, match_keyword, offset_of, scan, skip_whitespace, split_top_level, trimmed_end,
    ScanItem, ScanOptions,
};

/// Outcome of a pagination rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Paginated {
    Sql(String),
    /// The window is empty and the dialect cannot say so; nothing must be run.
    Empty,
}

/// Rewrites `sql` so that it returns `count` rows starting after `offset` rows.
///
/// # Errors
/// [`DbError::Query`] when an `OFFSET ... FETCH` rewrite is asked for a
/// statement that is not a `SELECT`.
pub fn paginate(sql: &str, offset: u64, count: u64, dialect: &Dialect) -> Result<Paginated> {
    let sql = strip_terminator(sql, ScanOptions::from(dialect));
    if count == 0 && !dialect.pagination.expresses_zero_rows() {
        return Ok(Paginated::Empty);
    }

    let rewritten = match dialect.pagination {
        Pagination::LimitComma => format!("{} LIMIT {}, {}", sql, offset, count),
        Pagination::LimitOffset => format!("{} LIMIT {} OFFSET {}", sql, count, offset),
        Pagination::RowNum => rownum_window(sql, offset, count),
        Pagination::OffsetFetch => offset_fetch(sql, offset, count, ScanOptions::from(dialect))?,
    };
    Ok(Paginated::Sql(rewritten))
}

/// Drops trailing comments and terminators, which would otherwise swallow
/// the appended clause.
fn strip_terminator(sql: &str, options: ScanOptions) -> &str {
    sql[..trimmed_end(sql, options)].trim_start()
}

/// Ranks the rows of the untouched query, so a `DISTINCT` or `ORDER BY` in
/// it applies before the window. The bounds saturate, so `u64::MAX` reads as
/// "no upper limit".
fn rownum_window(sql: &str, offset: u64, count: u64) -> String {
    format!(
        "SELECT * FROM (SELECT page_inner.*, ROWNUM AS page_rnum FROM ({}) page_inner \
         WHERE ROWNUM <= {}) WHERE page_rnum >= {}",
        sql,
        offset.saturating_add(count),
        offset.saturating_add(1)
    )
}

fn offset_fetch(sql: &str, offset: u64, count: u64, options: ScanOptions) -> Result<String> {
    let without_top = strip_top(sql, options)?;
    let items = scan(&without_top, options);

    let mut rewritten = without_top.clone();
    if find_keyword(&items, &["ORDER", "BY"], 0).is_none() {
        let key = first_column_key(&without_top, &items)?;
        rewritten.push_str(" ORDER BY ");
        rewritten.push_str(&key);
    }
    rewritten.push_str(&format!(
        " OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
        offset, count
    ));
    Ok(rewritten)
}

/// Item index just past `SELECT [DISTINCT|ALL]`, plus whether `DISTINCT` was seen.
fn projection_start(sql: &str, items: &[ScanItem]) -> Result<(usize, bool)> {
    let start = skip_whitespace(items, 0);
    let after_select = match_keyword(items, &["SELECT"], start).ok_or_else(|| {
        DbError::query(sql, "OFFSET/FETCH pagination needs a SELECT statement")
    })?;

    let pos = skip_whitespace(items, after_select);
    if let Some(end) = match_keyword(items, &["DISTINCT"], pos) {
        return Ok((skip_whitespace(items, end), true));
    }
    if let Some(end) = match_keyword(items, &["ALL"], pos) {
        return Ok((skip_whitespace(items, end), false));
    }
    Ok((pos, false))
}

/// Removes a leading `TOP n` / `TOP (n)` [`PERCENT`] [`WITH TIES`] clause.
fn strip_top(sql: &str, options: ScanOptions) -> Result<String> {
    let items = scan(sql, options);
    let (pos, _) = projection_start(sql, &items)?;
    let Some(after_top) = match_keyword(&items, &["TOP"], pos) else {
        return Ok(sql.to_string());
    };

    let mut end = skip_whitespace(&items, after_top);
    match items.get(end) {
        Some(item) if item.code && item.ch == '(' => {
            let depth = item.depth;
            end = (end + 1..items.len())
                .find(|&j| items[j].code && items[j].ch == ')' && items[j].depth == depth)
                .map(|j| j + 1)
                .unwrap_or(items.len());
        }
        _ => {
            while items.get(end).is_some_and(|it| it.code && it.ch.is_ascii_digit()) {
                end += 1;
            }
        }
    }
    for words in [&["PERCENT"][..], &["WITH", "TIES"][..]] {
        let next = skip_whitespace(&items, end);
        if let Some(after) = match_keyword(&items, words, next) {
            end = after;
        }
    }
    let end = skip_whitespace(&items, end);

    let mut stripped = String::with_capacity(sql.len());
    stripped.push_str(&sql[..offset_of(sql, &items, pos)]);
    stripped.push_str(&sql[offset_of(sql, &items, end)..]);
    Ok(stripped)
}

/// Sort key synthesized from the first selected column, `DISTINCT` and
/// `AS alias` stripped. A `*` projection has no usable key.
fn first_column_key(sql: &str, items: &[ScanItem]) -> Result<String> {
    let (start, _) = projection_start(sql, items)?;
    let end = find_keyword(items, &["FROM"], start).unwrap_or(items.len());
    let (col_start, col_end) = split_top_level(items, start, end)
        .into_iter()
        .next()
        .unwrap_or((start, end));

    let expr_end = find_keyword(items, &["AS"], col_start)
        .filter(|&as_idx| as_idx < col_end)
        .unwrap_or(col_end);
    let key = sql[offset_of(sql, items, col_start)..offset_of(sql, items, expr_end)].trim();

    if key.is_empty() || key.ends_with('*') {
        Ok("(SELECT NULL)".to_string())
    } else {
        Ok(key.to_string())
    }
}
