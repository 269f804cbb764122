//! Lexical scan of a SQL string: which characters are code, and at which
//! parenthesis depth. Literals, quoted identifiers and comments are opaque.

use crate::dialect::Dialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanOptions {
    /// A backslash escapes the next character inside string literals.
    pub backslash_escapes: bool,
    /// `[...]` delimits an identifier.
    pub bracket_identifiers: bool,
}

impl From<&Dialect> for ScanOptions {
    fn from(dialect: &Dialect) -> Self {
        Self {
            backslash_escapes: dialect.backslash_escapes,
            bracket_identifiers: dialect.bracket_identifiers,
        }
    }
}

/// One scanned character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanItem {
    /// Byte offset in the scanned string.
    pub offset: usize,
    pub ch: char,
    /// Parenthesis depth. Both parentheses of a pair report the outer depth.
    pub depth: usize,
    /// False inside literals, quoted identifiers and comments (delimiters included).
    pub code: bool,
    pub comment: bool,
}

enum State {
    Code,
    Quoted { close: char, escapable: bool },
    LineComment,
    BlockComment,
}

/// Scans `sql` into one item per character.
pub fn scan(sql: &str, options: ScanOptions) -> Vec<ScanItem> {
    let mut items = Vec::with_capacity(sql.len());
    let mut chars = sql.char_indices().peekable();
    let mut state = State::Code;
    let mut depth = 0usize;

    while let Some((offset, ch)) = chars.next() {
        let next = chars.peek().map(|&(_, c)| c);
        let in_comment = matches!(state, State::LineComment | State::BlockComment);
        let mut push = |offset: usize, ch: char, depth: usize, code: bool| {
            items.push(ScanItem {
                offset,
                ch,
                depth,
                code,
                comment: in_comment,
            })
        };

        match state {
            State::Code => match ch {
                '\'' | '"' => {
                    push(offset, ch, depth, false);
                    state = State::Quoted {
                        close: ch,
                        escapable: options.backslash_escapes,
                    };
                }
                '`' => {
                    push(offset, ch, depth, false);
                    state = State::Quoted {
                        close: '`',
                        escapable: false,
                    };
                }
                '[' if options.bracket_identifiers => {
                    push(offset, ch, depth, false);
                    state = State::Quoted {
                        close: ']',
                        escapable: false,
                    };
                }
                '-' if next == Some('-') => {
                    push(offset, ch, depth, false);
                    state = State::LineComment;
                    mark_comment(&mut items, 1);
                }
                '/' if next == Some('*') => {
                    push(offset, ch, depth, false);
                    if let Some((o, c)) = chars.next() {
                        push(o, c, depth, false);
                    }
                    state = State::BlockComment;
                    mark_comment(&mut items, 2);
                }
                '(' => {
                    push(offset, ch, depth, true);
                    depth += 1;
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    push(offset, ch, depth, true);
                }
                _ => push(offset, ch, depth, true),
            },
            State::Quoted { close, escapable } => {
                push(offset, ch, depth, false);
                if escapable && ch == '\\' {
                    if let Some((o, c)) = chars.next() {
                        push(o, c, depth, false);
                    }
                } else if ch == close {
                    if next == Some(close) {
                        // doubled delimiter stays inside the literal
                        if let Some((o, c)) = chars.next() {
                            push(o, c, depth, false);
                        }
                    } else {
                        state = State::Code;
                    }
                }
            }
            State::LineComment => {
                push(offset, ch, depth, false);
                if ch == '\n' {
                    state = State::Code;
                }
            }
            State::BlockComment => {
                push(offset, ch, depth, false);
                if ch == '*' && next == Some('/') {
                    if let Some((o, c)) = chars.next() {
                        push(o, c, depth, false);
                    }
                    state = State::Code;
                }
            }
        }
    }

    items
}

fn mark_comment(items: &mut [ScanItem], opener_len: usize) {
    let start = items.len().saturating_sub(opener_len);
    for item in &mut items[start..] {
        item.comment = true;
    }
}

/// Byte length of `sql` once trailing whitespace, comments and statement
/// terminators are dropped.
pub fn trimmed_end(sql: &str, options: ScanOptions) -> usize {
    let items = scan(sql, options);
    items
        .iter()
        .rev()
        .find(|it| !(it.comment || (it.code && (it.ch.is_whitespace() || it.ch == ';'))))
        .map(|it| it.offset + it.ch.len_utf8())
        .unwrap_or(0)
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '#'
}

/// Index of the first top-level occurrence of `words` (a keyword sequence
/// such as `["ORDER", "BY"]`) at or after item `from`. Words are matched
/// case-insensitively on word boundaries, separated by any whitespace.
pub fn find_keyword(items: &[ScanItem], words: &[&str], from: usize) -> Option<usize> {
    (from..items.len()).find(|&start| match_keyword(items, words, start).is_some())
}

/// If `words` start at item `start`, returns the item index just past them.
pub fn match_keyword(items: &[ScanItem], words: &[&str], start: usize) -> Option<usize> {
    let first = items.get(start)?;
    if !first.code || first.depth != 0 {
        return None;
    }
    if start > 0 && items[start - 1].code && is_ident_char(items[start - 1].ch) {
        return None;
    }

    let mut pos = start;
    for (n, word) in words.iter().enumerate() {
        if n > 0 {
            let ws_start = pos;
            while items.get(pos).is_some_and(|it| it.code && it.ch.is_whitespace()) {
                pos += 1;
            }
            if pos == ws_start {
                return None;
            }
        }
        for expected in word.chars() {
            let item = items.get(pos)?;
            if !item.code || item.depth != 0 || !item.ch.eq_ignore_ascii_case(&expected) {
                return None;
            }
            pos += 1;
        }
    }

    match items.get(pos) {
        Some(next) if next.code && is_ident_char(next.ch) => None,
        _ => Some(pos),
    }
}

/// Index of the next item that is not code whitespace.
pub fn skip_whitespace(items: &[ScanItem], mut pos: usize) -> usize {
    while items.get(pos).is_some_and(|it| it.code && it.ch.is_whitespace()) {
        pos += 1;
    }
    pos
}

/// Splits items `[start, end)` on top-level (relative depth 0) commas.
/// Returns item index ranges.
pub fn split_top_level(items: &[ScanItem], start: usize, end: usize) -> Vec<(usize, usize)> {
    let base = items.get(start).map(|it| it.depth).unwrap_or(0);
    let mut parts = Vec::new();
    let mut part_start = start;
    for (idx, item) in items.iter().enumerate().take(end).skip(start) {
        if item.code && item.depth == base && item.ch == ',' {
            parts.push((part_start, idx));
            part_start = idx + 1;
        }
    }
    parts.push((part_start, end));
    parts
}

/// Byte offset of item `idx`, or the string length past the end.
pub fn offset_of(sql: &str, items: &[ScanItem], idx: usize) -> usize {
    items.get(idx).map(|it| it.offset).unwrap_or(sql.len())
}
