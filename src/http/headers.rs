use std::collections::HashMap;

use crate::http::error::HttpError;

pub(crate) const CRLF: &[u8] = b"\r\n";

/// Punctuation allowed in a field-name besides lowercase letters and digits.
const FIELD_NAME_PUNCT: &[u8] = b"!#$%&'*+-.^_`|~";

/// Header fields keyed by lowercase field-name.
///
/// Names are lowercased on every insert and every lookup, so `Host`, `host`
/// and `hOsT` all address the same entry. Repeated fields parsed off the
/// wire are folded into one comma-separated value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a field value by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(&name.to_ascii_lowercase())
    }

    /// Inserts or replaces a field. Used when building responses, where the
    /// duplicate-value policy of [`Headers::parse`] does not apply.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.fields
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Adds a field, folding it into any existing value with `", "`.
    ///
    /// Unlike [`Headers::parse`] a repeated identical value is kept, as
    /// response heads legitimately repeat fields such as `Set-Cookie`.
    pub fn append(&mut self, name: impl AsRef<str>, value: &str) {
        self.merge(name.as_ref().to_ascii_lowercase(), value, false);
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields.remove(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parses one field-line from the front of `data`.
    ///
    /// Returns `(consumed, done)`:
    ///
    /// - `(2, true)` when `data` starts with the bare CRLF that ends the
    ///   header section,
    /// - `(0, false)` when no complete line is buffered yet,
    /// - `(line length + 2, false)` after storing one field.
    ///
    /// The consumed count covers the whole line as sent, including any
    /// whitespace around the name and value, so it can exceed
    /// `name.len() + value.len() + 4`. Counting only the trimmed parts would
    /// leave stray bytes at the front of the next window.
    ///
    /// Field values are not required to be UTF-8; `obs-text` bytes are kept
    /// as U+FFFD. Any grammar violation is a
    /// [`HttpError::MalformedHeaderLine`] and leaves the map untouched.
    pub fn parse(&mut self, data: &[u8]) -> Result<(usize, bool), HttpError> {
        self.parse_field_line(data, true)
    }

    /// Same as [`Headers::parse`], except that a repeated identical value is
    /// merged like any other. Used for upstream response heads.
    pub fn parse_lenient(&mut self, data: &[u8]) -> Result<(usize, bool), HttpError> {
        self.parse_field_line(data, false)
    }

    fn parse_field_line(
        &mut self,
        data: &[u8],
        reject_duplicates: bool,
    ) -> Result<(usize, bool), HttpError> {
        if data.starts_with(CRLF) {
            return Ok((2, true));
        }

        let Some(line_end) = find_crlf(data) else {
            return Ok((0, false));
        };
        let line = &data[..line_end];

        let colon = line
            .iter()
            .position(|&b| b == b':')
            .ok_or_else(|| HttpError::header_line("missing colon", line))?;
        let (raw_name, raw_value) = (&line[..colon], &line[colon + 1..]);

        if raw_name.last().is_some_and(|&b| is_ows(b)) {
            return Err(HttpError::header_line("space before colon", line));
        }

        let name = trim_ows(raw_name);
        let value = trim_ows(raw_value);
        if name.is_empty() || value.is_empty() {
            return Err(HttpError::header_line(
                "empty field-name or field-value",
                line,
            ));
        }

        let name: String = name
            .iter()
            .map(|&b| char::from(b.to_ascii_lowercase()))
            .collect();
        if !name.bytes().all(is_field_name_byte) {
            return Err(HttpError::header_line(
                "illegal character in field-name",
                line,
            ));
        }

        let value = String::from_utf8_lossy(value);
        if !self.merge(name, &value, reject_duplicates) {
            return Err(HttpError::header_line("duplicate field-value", line));
        }

        Ok((line_end + CRLF.len(), false))
    }

    /// Inserts or folds `value` under an already lowercased `name`. Returns
    /// false, leaving the map untouched, on a rejected duplicate.
    fn merge(&mut self, name: String, value: &str, reject_duplicates: bool) -> bool {
        match self.fields.get_mut(&name) {
            Some(existing) if reject_duplicates && existing.as_str() == value => false,
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(value);
                true
            }
            None => {
                self.fields.insert(name, value.to_string());
                true
            }
        }
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.set(k, v);
        }
        headers
    }
}

/// Offset of the first `\r\n` in `buf`.
pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

fn is_ows(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn trim_ows(mut s: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = s {
        if !is_ows(*first) {
            break;
        }
        s = rest;
    }
    while let [rest @ .., last] = s {
        if !is_ows(*last) {
            break;
        }
        s = rest;
    }
    s
}

fn is_field_name_byte(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit() || FIELD_NAME_PUNCT.contains(&b)
}
