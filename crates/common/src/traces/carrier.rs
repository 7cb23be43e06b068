use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use tracing::warn;

/// Flat header map used to move trace context across a network hop.
///
/// Keys are case-insensitive (stored lowercased, as HTTP header names).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Carrier {
    fields: HashMap<String, String>,
}

impl Carrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields
            .insert(key.into().to_ascii_lowercase(), value.into());
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a carrier from inbound HTTP headers.
    ///
    /// Repeated headers are joined with `,` (how `tracestate` may legally be
    /// split across lines). Values that are not visible ASCII are skipped.
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        let mut carrier = Carrier::new();
        for name in headers.keys() {
            let values: Vec<&str> = headers
                .get_all(name)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .collect();
            if !values.is_empty() {
                carrier.set(name.as_str(), values.join(","));
            }
        }
        carrier
    }

    /// Render the carrier as outbound HTTP headers
    pub fn to_header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(self.fields.len());
        for (key, value) in &self.fields {
            match (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!(header = %key, "skipping carrier field that is not a valid http header"),
            }
        }
        headers
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Carrier {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut carrier = Carrier::new();
        carrier.extend(iter);
        carrier
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Carrier {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}
