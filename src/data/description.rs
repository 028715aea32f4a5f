use std::collections::HashSet;
use std::fmt;
use std::str::Chars;

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};

use crate::error::{Result, UnmixError};

// ---------------------------------------------------------------------------
// Signature description grammar
// ---------------------------------------------------------------------------
//
//   table  := '{' [ entry (',' entry)* [','] ] '}'
//   entry  := string ':' '[' [ number (',' number)* [','] ] ']'
//   string := "double quoted" | 'single quoted'
//   number := JSON number
//
// The text is treated purely as data. Single-quoted strings are rewritten to
// JSON strings and trailing commas dropped, then `serde_json` does the rest.

/// Parse a signature description into `(name, values)` pairs in source order.
///
/// Duplicate names are rejected.
pub fn parse_entries(description: &str) -> Result<Vec<(String, Vec<f64>)>> {
    let json = normalize(description)?;
    let entries: OrderedEntries =
        serde_json::from_str(&json).map_err(|e| UnmixError::parse(e.to_string()))?;
    Ok(entries.0)
}

/// Rewrite the accepted literal syntax into strict JSON.
fn normalize(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                out.push('"');
                copy_double_quoted(&mut chars, &mut out)?;
            }
            '\'' => {
                out.push('"');
                copy_single_quoted(&mut chars, &mut out)?;
            }
            '}' | ']' => {
                strip_trailing_comma(&mut out);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}

fn copy_double_quoted(chars: &mut Chars<'_>, out: &mut String) -> Result<()> {
    while let Some(c) = chars.next() {
        out.push(c);
        match c {
            '\\' => match chars.next() {
                Some(esc) => out.push(esc),
                None => break,
            },
            '"' => return Ok(()),
            _ => {}
        }
    }
    Err(UnmixError::parse("unterminated string literal"))
}

fn copy_single_quoted(chars: &mut Chars<'_>, out: &mut String) -> Result<()> {
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push('\''),
                Some(esc) => {
                    out.push('\\');
                    out.push(esc);
                }
                None => break,
            },
            '"' => out.push_str("\\\""),
            '\'' => {
                out.push('"');
                return Ok(());
            }
            _ => out.push(c),
        }
    }
    Err(UnmixError::parse("unterminated string literal"))
}

fn strip_trailing_comma(out: &mut String) {
    let trimmed = out.trim_end().len();
    if out[..trimmed].ends_with(',') {
        out.truncate(trimmed - 1);
    }
}

// ---------------------------------------------------------------------------
// Order-preserving deserialization
// ---------------------------------------------------------------------------

struct OrderedEntries(Vec<(String, Vec<f64>)>);

impl<'de> Deserialize<'de> for OrderedEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(EntriesVisitor)
    }
}

struct EntriesVisitor;

impl<'de> Visitor<'de> for EntriesVisitor {
    type Value = OrderedEntries;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping of endmember names to lists of band values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(4));

        while let Some(name) = map.next_key::<String>()? {
            if !seen.insert(name.clone()) {
                return Err(de::Error::custom(format!("duplicate endmember '{name}'")));
            }
            let values: Vec<f64> = map.next_value()?;
            entries.push((name, values));
        }
        Ok(OrderedEntries(entries))
    }
}
