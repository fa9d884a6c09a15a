//! `console.log` statement removal.
//!
//! A small lexer walks the source so that calls inside string literals,
//! template literals and comments are left alone. Only calls in statement
//! position are touched: after `;`, `{`, `}` or at the start of the file
//! the call is deleted, after `if (...)` / `else` it becomes an empty `;`.
//! Calls used as expressions (`() => console.log(x)`) are kept. Regex
//! literals are not recognised.

use tracing::info;

use crate::error::Result;
use super::SourceWalker;

const CALL: &str = "console.log";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Context {
    Remove,
    ReplaceWithEmpty,
    Keep,
}

/// Remove `console.log(...)` statements; returns the new source and the number of calls removed
pub fn strip_console_logs(src: &str) -> (String, usize) {
    let bytes = src.as_bytes();
    let mut out = String::with_capacity(src.len());
    let mut removed = 0;
    let mut i = 0;

    while i < bytes.len() {
        let skip_to = match bytes[i] {
            b'\'' | b'"' => Some(skip_string(bytes, i)),
            b'`' => Some(skip_template(bytes, i)),
            b'/' if bytes.get(i + 1) == Some(&b'/') => Some(line_end(bytes, i)),
            b'/' if bytes.get(i + 1) == Some(&b'*') => Some(skip_block_comment(bytes, i)),
            _ => None,
        };
        if let Some(end) = skip_to {
            out.push_str(&src[i..end]);
            i = end;
            continue;
        }

        if src[i..].starts_with(CALL) && !preceded_by_identifier(bytes, i) {
            if let Some(end) = removable_call_end(bytes, i) {
                match statement_context(&out) {
                    Context::Remove => {
                        removed += 1;
                        i = end;
                        let line_start = out.rfind('\n').map_or(0, |p| p + 1);
                        let next_newline = src[i..].find('\n').map_or(src.len(), |p| i + p);
                        if out[line_start..].trim().is_empty() && src[i..next_newline].trim().is_empty() {
                            out.truncate(line_start);
                            i = (next_newline + 1).min(src.len());
                        }
                        continue;
                    }
                    Context::ReplaceWithEmpty => {
                        removed += 1;
                        out.push(';');
                        i = end;
                        continue;
                    }
                    Context::Keep => {}
                }
            }
        }

        // copy one whole character
        let ch_len = src[i..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&src[i..i + ch_len]);
        i += ch_len;
    }

    (out, removed)
}

/// Strip every file of the walker; returns `(relative path, removed)` for changed files
pub fn strip_files(walker: &SourceWalker, dry_run: bool) -> Result<Vec<(String, usize)>> {
    let mut changed = Vec::new();

    for (file, content) in walker.read_all() {
        let (stripped, removed) = strip_console_logs(&content);
        if removed == 0 {
            continue;
        }
        if !dry_run {
            std::fs::write(&file.path, stripped)?;
        }
        info!("{}: removed {} console.log calls", file.relative, removed);
        changed.push((file.relative, removed));
    }

    Ok(changed)
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn preceded_by_identifier(bytes: &[u8], i: usize) -> bool {
    i > 0 && (is_identifier_byte(bytes[i - 1]) || bytes[i - 1] == b'.')
}

fn statement_context(out: &str) -> Context {
    let before = out.trim_end();
    match before.chars().last() {
        None | Some(';') | Some('{') | Some('}') => Context::Remove,
        Some(')') => Context::ReplaceWithEmpty,
        Some(_) if before.ends_with("else") => {
            let head = &before.as_bytes()[..before.len() - 4];
            if head.last().is_some_and(|b| is_identifier_byte(*b)) {
                Context::Keep
            } else {
                Context::ReplaceWithEmpty
            }
        }
        Some(_) => Context::Keep,
    }
}

/// End of a `console.log(...)` statement starting at `start`, including a trailing `;`.
///
/// `None` when the call is unterminated or followed by more expression.
fn removable_call_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + CALL.len();
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    if bytes.get(i) != Some(&b'(') {
        return None;
    }

    let mut i = skip_balanced(bytes, i + 1, b'(', b')')?;
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }

    match bytes.get(i) {
        Some(b';') => Some(i + 1),
        None | Some(b'\n') | Some(b'\r') | Some(b'}') => Some(i),
        Some(b'/') if matches!(bytes.get(i + 1), Some(b'/') | Some(b'*')) => Some(i),
        Some(_) => None,
    }
}

/// Index after the `close` matching an already consumed `open`
fn skip_balanced(bytes: &[u8], mut i: usize, open: u8, close: u8) -> Option<usize> {
    let mut depth = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => i = skip_string(bytes, i),
            b'`' => i = skip_template(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = line_end(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            b if b == open => {
                depth += 1;
                i += 1;
            }
            b if b == close => {
                if depth == 0 {
                    return Some(i + 1);
                }
                depth -= 1;
                i += 1;
            }
            _ => i += 1,
        }
    }

    None
}

/// Quoted strings end at the closing quote or, unterminated, at the end of the line
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_template(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return i + 1,
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                match skip_balanced(bytes, i + 2, b'{', b'}') {
                    Some(end) => i = end,
                    None => return bytes.len(),
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

fn line_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|b| *b == b'\n')
        .map_or(bytes.len(), |p| start + p)
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |p| start + 2 + p + 2)
}
