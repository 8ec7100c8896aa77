//! Normalization of the header shapes a tracer may hand to the request hook.

use axum::http::HeaderMap;

/// Canonical header list: lower-cased names, insertion order, repeats kept.
pub type HeaderList = Vec<(String, String)>;

/// The header carriers seen at hook time.
#[derive(Debug, Clone)]
pub enum RawHeaders {
    /// Name → one or more values.
    Object(Vec<(String, Vec<String>)>),
    /// `name: value` lines, CRLF or LF separated.
    Text(String),
    /// Flat alternating list: `[name, value, name, value, ...]`.
    Pairs(Vec<String>),
    /// An `http::HeaderMap`.
    Http(HeaderMap),
}

impl RawHeaders {
    /// Flatten any carrier into one ordered list.
    ///
    /// Entries with an empty or whitespace-containing name are dropped, as is a
    /// dangling name at the end of a `Pairs` list.
    pub fn normalize(&self) -> HeaderList {
        match self {
            RawHeaders::Object(entries) => entries
                .iter()
                .filter_map(|(name, values)| canonical_name(name).map(|name| (name, values)))
                .flat_map(|(name, values)| {
                    values
                        .iter()
                        .map(move |value| (name.clone(), value.trim().to_string()))
                })
                .collect(),
            RawHeaders::Text(text) => text
                .lines()
                .filter_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    Some((canonical_name(name)?, value.trim().to_string()))
                })
                .collect(),
            RawHeaders::Pairs(flat) => flat
                .chunks_exact(2)
                .filter_map(|pair| Some((canonical_name(&pair[0])?, pair[1].trim().to_string())))
                .collect(),
            RawHeaders::Http(map) => map
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.trim().to_string()))
                })
                .collect(),
        }
    }

    /// First value for `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<String> {
        find(&self.normalize(), name).map(str::to_string)
    }
}

/// First value for `name` in a normalized list (case-insensitive).
pub fn find<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Copy an `http::HeaderMap` into the canonical list.
pub fn header_list(map: &HeaderMap) -> HeaderList {
    RawHeaders::Http(map.clone()).normalize()
}

fn canonical_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return None;
    }
    Some(name.to_ascii_lowercase())
}

impl From<HeaderMap> for RawHeaders {
    fn from(map: HeaderMap) -> Self {
        RawHeaders::Http(map)
    }
}

impl From<&HeaderMap> for RawHeaders {
    fn from(map: &HeaderMap) -> Self {
        RawHeaders::Http(map.clone())
    }
}

impl From<&str> for RawHeaders {
    fn from(text: &str) -> Self {
        RawHeaders::Text(text.to_string())
    }
}
