//! Statement splitting for Part 21 text.
//!
//! Splits the document into `;`-terminated statements, honoring string
//! literals and `/* */` comments, and keeps the records found between
//! `DATA;` and `ENDSEC;`. Records are returned as spans into the original
//! text; nothing is copied or rewritten here.

use facemark_core::{ParseError, Span};

/// One `#id = ...;` record as it appears in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// From the leading `#` through the terminating `;`.
    pub span: Span,
    /// Offsets of the `\n` layout breaks inside the record. Newlines that
    /// belong to a string literal's value are not layout and are not listed.
    pub line_breaks: Vec<usize>,
}

impl RawRecord {
    /// Whether the record has a continuation line: a layout break followed
    /// by a line that begins with a space or tab.
    pub fn is_continued(&self, text: &str) -> bool {
        self.line_breaks
            .iter()
            .any(|&at| matches!(text.as_bytes().get(at + 1), Some(b' ' | b'\t')))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Str,
    Comment,
}

/// Split every DATA section of `text` into records.
pub fn split_records(text: &str) -> Result<Vec<RawRecord>, ParseError> {
    let bytes = text.as_bytes();
    let mut records = Vec::new();
    let mut state = State::Code;
    let mut in_data = false;
    let mut seen_data = false;
    let mut stmt_start: Option<usize> = None;
    let mut line_breaks = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match state {
            State::Str => {
                if b == b'\'' {
                    // '' is an escaped quote and keeps the literal open
                    if bytes.get(i + 1) == Some(&b'\'') {
                        i += 1;
                    } else {
                        state = State::Code;
                    }
                }
            }
            State::Comment => {
                if b == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    state = State::Code;
                    i += 1;
                } else if b == b'\n' && stmt_start.is_some() {
                    line_breaks.push(i);
                }
            }
            State::Code => match b {
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    state = State::Comment;
                    i += 1;
                }
                b'\n' => {
                    if stmt_start.is_some() {
                        line_breaks.push(i);
                    }
                }
                b';' => {
                    let start = stmt_start.unwrap_or(i);
                    let span = Span::new(start, i + 1);
                    let keyword = statement_keyword(&text[start..i]);
                    if in_data {
                        if keyword == "ENDSEC" {
                            in_data = false;
                        } else if text[start..].starts_with('#') {
                            records.push(RawRecord {
                                span,
                                line_breaks: std::mem::take(&mut line_breaks),
                            });
                        } else {
                            return Err(ParseError::UnexpectedToken {
                                offset: start,
                                expected: "entity instance '#id = ...;'".into(),
                                found: snippet(&text[start..=i]),
                            });
                        }
                    } else if keyword == "DATA" {
                        in_data = true;
                        seen_data = true;
                    }
                    stmt_start = None;
                    line_breaks.clear();
                }
                b'\'' => {
                    stmt_start.get_or_insert(i);
                    state = State::Str;
                }
                b if b.is_ascii_whitespace() => {}
                _ => {
                    stmt_start.get_or_insert(i);
                }
            },
        }
        i += 1;
    }

    if let Some(start) = stmt_start {
        if in_data {
            return Err(ParseError::UnterminatedRecord { offset: start });
        }
    }
    if !seen_data {
        return Err(ParseError::MissingDataSection);
    }
    Ok(records)
}

/// The leading keyword of a statement (`DATA`, `ENDSEC`, `FILE_NAME`, ...).
fn statement_keyword(stmt: &str) -> &str {
    let end = stmt
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(stmt.len());
    &stmt[..end]
}

/// A short excerpt for error messages.
pub(crate) fn snippet(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    match line.char_indices().nth(40) {
        Some((idx, _)) => format!("{}...", &line[..idx]),
        None => line.to_string(),
    }
}
