// src/parse/man_scan.rs

use std::str::FromStr;

use super::{FeedUpdate, ParseError, UpdateParser};


/// Scans the raw text for the two integer fields without building a document.
///
/// Only keys of the top-level object count; nested objects, arrays and string
/// contents are stepped over.
pub struct ManualScanParser;

impl UpdateParser for ManualScanParser {
    fn parse(&self, raw: &str) -> Result<FeedUpdate, ParseError> {
        let fields = scan_top_level(raw)?;

        Ok(FeedUpdate {
            msg_id: parse_field::<u64>(fields.u, "u")?,
            server_ts_ms: parse_field::<i64>(fields.t, "T")?,
        })
    }
}

#[derive(Debug, Default)]
struct TopLevelFields<'a> {
    u: Option<&'a str>,
    t: Option<&'a str>,
}

fn parse_field<N>(literal: Option<&str>, field: &'static str) -> Result<N, ParseError>
where
    N: FromStr,
    N::Err: std::fmt::Display,
{
    let literal = literal.ok_or(ParseError::MissingField(field))?;

    let digits = literal.strip_prefix('-').unwrap_or(literal);
    if digits.len() > 1 && digits.starts_with('0') {
        return Err(ParseError::InvalidField {
            field,
            reason: "leading zero".to_string(),
        });
    }

    literal.parse().map_err(|e: N::Err| ParseError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

/// Walks one JSON object and collects the value literals of its `u` and `T`
/// keys. The text must be a single object: `{` first, `}` last, balanced
/// brackets in between.
fn scan_top_level(raw: &str) -> Result<TopLevelFields<'_>, ParseError> {
    let text = raw.trim();
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'{') || bytes.last() != Some(&b'}') {
        return Err(ParseError::NotAnObject);
    }

    let mut fields = TopLevelFields::default();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let start = i + 1;
                let end = closing_quote(bytes, start).ok_or(ParseError::NotAnObject)?;
                i = end + 1;

                if depth == 1 {
                    if let Some(value) = text[i..].trim_start().strip_prefix(':') {
                        let (field, slot) = match &text[start..end] {
                            "u" => ("u", &mut fields.u),
                            "T" => ("T", &mut fields.t),
                            _ => continue,
                        };
                        if slot.is_some() {
                            return Err(ParseError::InvalidField {
                                field,
                                reason: "duplicate field".to_string(),
                            });
                        }
                        *slot = Some(number_literal(value.trim_start()));
                    }
                }
                continue;
            }
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1).ok_or(ParseError::NotAnObject)?;
                if depth == 0 && i != bytes.len() - 1 {
                    return Err(ParseError::NotAnObject);
                }
            }
            _ => {}
        }
        i += 1;
    }

    if depth != 0 {
        return Err(ParseError::NotAnObject);
    }
    Ok(fields)
}

/// Index of the quote closing a string whose contents start at `from`.
fn closing_quote(bytes: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// The integer literal at the start of `value`, or an empty slice when the
/// value is not an integer.
fn number_literal(value: &str) -> &str {
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
        .map_or(value.len(), |(i, _)| i);

    let tail = value[end..].trim_start();
    if tail.starts_with(',') || tail.starts_with('}') {
        &value[..end]
    } else {
        ""
    }
}
