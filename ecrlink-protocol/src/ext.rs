//! Extension-data markup.
//!
//! Terminals tack optional key/value pairs onto requests and responses as a
//! flat markup fragment, e.g. `<TipRequest>1</TipRequest><Table>12</Table>`.
//! Parsing is lenient: a fragment that does not scan cleanly yields an
//! [`ExtView`] with no entries while the raw text stays available untouched.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Parsed view over an extension-data fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtView {
    raw: String,
    entries: Vec<(String, String)>,
}

impl ExtView {
    /// Scans `raw` into key/value entries. Never fails; malformed markup
    /// produces a view with zero entries.
    pub fn parse(raw: &str) -> Self {
        let entries = scan(raw).unwrap_or_default();
        ExtView {
            raw: raw.to_string(),
            entries,
        }
    }

    /// The fragment exactly as it arrived.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// First value for `key`. Keys are case-sensitive.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `key`, in document order.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
}

/// Renders key/value pairs as a markup fragment with escaped text content.
pub fn render(entries: &[(&str, &str)]) -> String {
    let mut out = String::new();
    for (key, value) in entries {
        out.push('<');
        out.push_str(key);
        out.push('>');
        out.push_str(&escape(*value));
        out.push_str("</");
        out.push_str(key);
        out.push('>');
    }
    out
}

/// One-pass scan. `None` on any structural defect: mismatched or unclosed
/// tags, bad escapes, stray markup.
fn scan(raw: &str) -> Option<Vec<(String, String)>> {
    if raw.is_empty() {
        return Some(Vec::new());
    }
    let mut reader = Reader::from_str(raw);
    let mut stack: Vec<(String, String)> = Vec::new();
    let mut entries = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                stack.push((name, String::new()));
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().ok()?;
                if let Some((_, buf)) = stack.last_mut() {
                    buf.push_str(&text);
                }
            }
            Ok(Event::End(e)) => {
                let (name, text) = stack.pop()?;
                if name.as_bytes() != e.name().as_ref() {
                    return None;
                }
                entries.push((name, text));
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                entries.push((name, String::new()));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return None,
        }
    }
    if !stack.is_empty() {
        return None;
    }
    Some(entries)
}
