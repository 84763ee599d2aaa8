use std::borrow::Cow;

use thiserror::Error;

use crate::types::RowValues;

mod scanner;

use scanner::{
    State, is_block_comment_end, is_block_comment_start, is_line_comment_start, matches_tag,
    scan_digits, try_start_dollar_quote,
};

/// Target placeholder style for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style numbered placeholders like `$1`.
    Postgres,
    /// MySQL-style positional placeholders: a bare `?` per bound value.
    MySql,
}

/// A numbered placeholder pointed past the end of the parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("placeholder ${index} has no matching parameter ({available} supplied)")]
pub struct PlaceholderError {
    pub index: usize,
    pub available: usize,
}

/// Statement text and parameters after placeholder translation.
#[derive(Debug, Clone, PartialEq)]
pub struct Translated<'a> {
    pub sql: Cow<'a, str>,
    pub params: Cow<'a, [RowValues]>,
}

/// Translate numbered placeholders into the target style.
///
/// `Postgres` rewrites `?N` into `$N` and leaves parameters alone. `MySql` rewrites both
/// `$N` and `?N` into a bare `?` and re-binds the parameters in occurrence order, so
/// `a = $2 OR b = $1 OR c = $2` binds `[p2, p1, p2]`.
///
/// Placeholders inside quoted strings, backtick identifiers, comments, and dollar-quoted
/// blocks are skipped by a lightweight state machine. For `MySql`, a backslash inside a
/// quoted string escapes the next character. Borrowed `Cow`s come back when nothing
/// changes.
///
/// # Errors
/// Returns [`PlaceholderError`] when a placeholder index is zero or exceeds `params.len()`
/// while re-binding for `MySql`.
pub fn translate_placeholders<'a>(
    sql: &'a str,
    params: &'a [RowValues],
    target: PlaceholderStyle,
) -> Result<Translated<'a>, PlaceholderError> {
    let mut out: Option<String> = None;
    let mut order: Vec<usize> = Vec::new();
    let mut state = State::Normal;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        let mut replaced = false;
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => state = State::BacktickQuoted,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => state = State::BlockComment(1),
                b'$' => {
                    if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                        if let Some(ref mut buf) = out {
                            buf.push_str(&sql[idx..=advance]);
                        }
                        state = State::DollarQuoted(tag);
                        idx = advance + 1;
                        continue;
                    } else if matches!(target, PlaceholderStyle::MySql)
                        && let Some((digits_end, digits)) = scan_digits(bytes, idx + 1)
                    {
                        let buf = out.get_or_insert_with(|| sql[..idx].to_string());
                        buf.push('?');
                        order.push(parse_index(digits, params.len())?);
                        idx = digits_end - 1;
                        replaced = true;
                    }
                }
                b'?' => {
                    if let Some((digits_end, digits)) = scan_digits(bytes, idx + 1) {
                        let buf = out.get_or_insert_with(|| sql[..idx].to_string());
                        match target {
                            PlaceholderStyle::Postgres => {
                                buf.push('$');
                                buf.push_str(digits);
                            }
                            PlaceholderStyle::MySql => {
                                buf.push('?');
                                order.push(parse_index(digits, params.len())?);
                            }
                        }
                        idx = digits_end - 1;
                        replaced = true;
                    }
                }
                _ => {}
            },
            State::SingleQuoted | State::DoubleQuoted
                if b == b'\\' && matches!(target, PlaceholderStyle::MySql) =>
            {
                // MySQL strings take backslash escapes; the escaped byte is copied below
                if let Some(ref mut buf) = out {
                    buf.push('\\');
                }
                idx += 1;
            }
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        if let Some(ref mut buf) = out {
                            buf.push('\'');
                        }
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        if let Some(ref mut buf) = out {
                            buf.push('"');
                        }
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::BacktickQuoted => {
                if b == b'`' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                } else if is_block_comment_end(bytes, idx) {
                    if depth == 1 {
                        state = State::Normal;
                    } else {
                        state = State::BlockComment(depth - 1);
                    }
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    let close_end = idx + tag.len() + 1;
                    if let Some(ref mut buf) = out {
                        buf.push_str(&sql[idx..=close_end]);
                    }
                    state = State::Normal;
                    idx = close_end + 1;
                    continue;
                }
            }
        }

        if let Some(ref mut buf) = out
            && !replaced
        {
            push_char_at(buf, sql, idx);
        }

        idx += 1;
    }

    let sql = match out {
        Some(buf) => Cow::Owned(buf),
        None => Cow::Borrowed(sql),
    };

    let params = if order.is_empty() || is_identity(&order, params.len()) {
        Cow::Borrowed(params)
    } else {
        Cow::Owned(order.iter().map(|&i| params[i - 1].clone()).collect())
    };

    Ok(Translated { sql, params })
}

fn parse_index(digits: &str, available: usize) -> Result<usize, PlaceholderError> {
    let index = digits.parse::<usize>().unwrap_or(0);
    if index == 0 || index > available {
        return Err(PlaceholderError { index, available });
    }
    Ok(index)
}

fn is_identity(order: &[usize], available: usize) -> bool {
    order.len() == available && order.iter().enumerate().all(|(i, &p)| p == i + 1)
}

/// Copy the UTF-8 character starting at `idx`, skipping continuation bytes.
fn push_char_at(buf: &mut String, sql: &str, idx: usize) {
    if sql.is_char_boundary(idx)
        && let Some(ch) = sql[idx..].chars().next()
    {
        buf.push(ch);
    }
}
