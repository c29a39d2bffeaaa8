//! Snapshot file format
//!
//! ```text
//! [STRINGS]
//! key=value
//! [HASHES]
//! key.field=value
//! [LISTS]
//! key[0]=value
//! [SETS]
//! key.member=1
//! ```
//!
//! Lines split on the first unescaped `=`. Hash and set lines split key from
//! field/member on the first unescaped `.`. Unknown or malformed lines are
//! skipped.
//!
//! Keys, fields and members escape backslash, `.`, `=`, `[` and `]` with a backslash;
//! values escape only the backslash. Line breaks are written as `\n` and `\r`
//! everywhere, so plain names and values appear verbatim.

use crate::store::Snapshot;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::debug;

const STRINGS: &str = "[STRINGS]";
const HASHES: &str = "[HASHES]";
const LISTS: &str = "[LISTS]";
const SETS: &str = "[SETS]";

const NAME_SPECIALS: &[char] = &['\\', '.', '=', '[', ']'];
const VALUE_SPECIALS: &[char] = &['\\'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Strings,
    Hashes,
    Lists,
    Sets,
}

/// Render a snapshot, sections in fixed order and keys sorted
pub fn render(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "{}", STRINGS);
    for (key, value) in &snapshot.strings {
        let _ = writeln!(out, "{}={}", name(key), text(value));
    }

    let _ = writeln!(out, "{}", HASHES);
    for (key, fields) in &snapshot.hashes {
        for (field, value) in fields {
            let _ = writeln!(out, "{}.{}={}", name(key), name(field), text(value));
        }
    }

    let _ = writeln!(out, "{}", LISTS);
    for (key, values) in &snapshot.lists {
        for (index, value) in values.iter().enumerate() {
            let _ = writeln!(out, "{}[{}]={}", name(key), index, text(value));
        }
    }

    let _ = writeln!(out, "{}", SETS);
    for (key, members) in &snapshot.sets {
        for member in members {
            let _ = writeln!(out, "{}.{}=1", name(key), name(member));
        }
    }

    out
}

/// Result of parsing a snapshot file
#[derive(Debug, Default)]
pub struct Parsed {
    pub snapshot: Snapshot,
    pub skipped: usize,
}

/// Parse a snapshot file
pub fn parse(text: &str) -> Parsed {
    let mut parsed = Parsed::default();
    let mut lists: BTreeMap<String, BTreeMap<usize, String>> = BTreeMap::new();
    let mut section = None;

    for (number, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        match line.trim() {
            STRINGS => section = Some(Section::Strings),
            HASHES => section = Some(Section::Hashes),
            LISTS => section = Some(Section::Lists),
            SETS => section = Some(Section::Sets),
            _ => {
                let applied = section.map_or(false, |section| {
                    apply_line(section, line, &mut parsed.snapshot, &mut lists)
                });
                if !applied {
                    debug!("Skipping malformed snapshot line {}: {}", number + 1, line);
                    parsed.skipped += 1;
                }
            }
        }
    }

    parsed.snapshot.lists = lists
        .into_iter()
        .map(|(key, elements)| (key, elements.into_values().collect()))
        .collect();

    parsed
}

fn apply_line(
    section: Section,
    line: &str,
    snapshot: &mut Snapshot,
    lists: &mut BTreeMap<String, BTreeMap<usize, String>>,
) -> bool {
    let Some((lhs, value)) = split_unescaped(line, '=') else {
        return false;
    };
    let Some(value) = unescape(value) else {
        return false;
    };

    match section {
        Section::Strings => {
            let Some(key) = unescape_key(lhs) else {
                return false;
            };
            snapshot.strings.insert(key, value);
        }
        Section::Hashes => {
            let Some((key, field)) = split_unescaped(lhs, '.') else {
                return false;
            };
            let (Some(key), Some(field)) = (unescape_key(key), unescape(field)) else {
                return false;
            };
            snapshot.hashes.entry(key).or_default().insert(field, value);
        }
        Section::Lists => {
            let Some((key, index)) = parse_list_key(lhs) else {
                return false;
            };
            lists.entry(key).or_default().insert(index, value);
        }
        Section::Sets => {
            let Some((key, member)) = split_unescaped(lhs, '.') else {
                return false;
            };
            let (Some(key), Some(member)) = (unescape_key(key), unescape(member)) else {
                return false;
            };
            snapshot.sets.entry(key).or_default().insert(member);
        }
    }

    true
}

/// `key[index]` -> (key, index)
fn parse_list_key(lhs: &str) -> Option<(String, usize)> {
    let inner = lhs.strip_suffix(']')?;
    let open = inner.rfind('[')?;
    let index = inner[open + 1..].parse().ok()?;
    Some((unescape_key(&inner[..open])?, index))
}

fn name(raw: &str) -> Cow<'_, str> {
    escape(raw, NAME_SPECIALS)
}

fn text(raw: &str) -> Cow<'_, str> {
    escape(raw, VALUE_SPECIALS)
}

fn escape<'a>(raw: &'a str, specials: &[char]) -> Cow<'a, str> {
    let needs_escape = |c: char| c == '\n' || c == '\r' || specials.contains(&c);
    if !raw.contains(needs_escape) {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if specials.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Undo [`escape`]; a dangling backslash is malformed
fn unescape(raw: &str) -> Option<String> {
    if !raw.contains('\\') {
        return Some(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            other => out.push(other),
        }
    }
    Some(out)
}

fn unescape_key(raw: &str) -> Option<String> {
    unescape(raw).filter(|key| !key.is_empty())
}

/// Split on the first `separator` not preceded by an escaping backslash
fn split_unescaped(line: &str, separator: char) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            return Some((&line[..i], &line[i + c.len_utf8()..]));
        }
    }
    None
}
