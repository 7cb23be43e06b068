use crate::errors::TraceStateError;
use std::collections::VecDeque;
use std::str::FromStr;

const MAX_MEMBERS: usize = 32;
const MAX_KEY_LEN: usize = 256;
const MAX_VALUE_LEN: usize = 256;

/// Vendor-specific trace data carried in the W3C `tracestate` header.
///
/// Entries keep their order. Mutations return a new value; the receiver is
/// never changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TraceState(Option<VecDeque<(String, String)>>);

impl TraceState {
    pub const NONE: TraceState = TraceState(None);

    /// `key = simple-key / multi-tenant-key`, lowercase letters, digits and `_-*/`,
    /// with at most one `@` separating tenant and vendor.
    fn valid_key(key: &str) -> bool {
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return false;
        }

        let allowed_special = |b: u8| b == b'_' || b == b'-' || b == b'*' || b == b'/';
        let mut vendor_start = None;
        for (i, &b) in key.as_bytes().iter().enumerate() {
            if !(b.is_ascii_lowercase() || b.is_ascii_digit() || allowed_special(b) || b == b'@') {
                return false;
            }

            if i == 0 && !(b.is_ascii_lowercase() || b.is_ascii_digit()) {
                return false;
            } else if b == b'@' {
                // vendor part is 1..=14 chars
                if vendor_start.is_some() || i + 15 < key.len() || i + 1 == key.len() {
                    return false;
                }
                vendor_start = Some(i);
            } else if let Some(start) = vendor_start {
                if i == start + 1 && !(b.is_ascii_lowercase() || b.is_ascii_digit()) {
                    return false;
                }
            }
        }

        true
    }

    /// Printable ASCII except `,` and `=`, not ending in a space
    fn valid_value(value: &str) -> bool {
        if value.is_empty() || value.len() > MAX_VALUE_LEN || value.ends_with(' ') {
            return false;
        }

        value
            .bytes()
            .all(|b| (0x20..=0x7e).contains(&b) && b != b',' && b != b'=')
    }

    pub fn from_key_value<T, K, V>(entries: T) -> Result<Self, TraceStateError>
    where
        T: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let ordered: VecDeque<(String, String)> = entries
            .into_iter()
            .map(|(key, value)| {
                let (key, value) = (key.into(), value.into());
                if !Self::valid_key(&key) {
                    return Err(TraceStateError::Key(key));
                }
                if !Self::valid_value(&value) {
                    return Err(TraceStateError::Value(value));
                }
                Ok((key, value))
            })
            .collect::<Result<_, _>>()?;

        if ordered.len() > MAX_MEMBERS {
            return Err(TraceStateError::TooManyMembers(ordered.len()));
        }

        if ordered.is_empty() {
            Ok(TraceState(None))
        } else {
            Ok(TraceState(Some(ordered)))
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.as_ref().and_then(|entries| {
            entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        })
    }

    /// Insert or update `key`, moving it to the front as W3C requires for
    /// the entry owned by the caller.
    pub fn insert<K, V>(&self, key: K, value: V) -> Result<TraceState, TraceStateError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let (key, value) = (key.into(), value.into());
        if !Self::valid_key(&key) {
            return Err(TraceStateError::Key(key));
        }
        if !Self::valid_value(&value) {
            return Err(TraceStateError::Value(value));
        }

        let mut trace_state = self.without(&key);
        let entries = trace_state.0.get_or_insert_with(VecDeque::new);
        entries.push_front((key, value));
        // the oldest (rightmost) entries go first when the list is full
        entries.truncate(MAX_MEMBERS);

        Ok(trace_state)
    }

    pub fn delete(&self, key: &str) -> Result<TraceState, TraceStateError> {
        if !Self::valid_key(key) {
            return Err(TraceStateError::Key(key.to_string()));
        }
        Ok(self.without(key))
    }

    fn without(&self, key: &str) -> TraceState {
        let mut owned = self.clone();
        if let Some(entries) = owned.0.as_mut() {
            entries.retain(|(k, _)| k != key);
            if entries.is_empty() {
                owned.0 = None;
            }
        }
        owned
    }

    pub fn len(&self) -> usize {
        self.0.as_ref().map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render as a `tracestate` header value
    pub fn header(&self) -> String {
        self.0
            .as_ref()
            .map(|entries| {
                entries
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default()
    }
}

impl FromStr for TraceState {
    type Err = TraceStateError;

    /// Parse a `tracestate` header. Optional whitespace around members and
    /// empty members are allowed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = Vec::new();
        for member in s.split(',').map(str::trim).filter(|m| !m.is_empty()) {
            match member.split_once('=') {
                Some((key, value)) => entries.push((key.to_string(), value.to_string())),
                None => return Err(TraceStateError::List(member.to_string())),
            }
        }
        TraceState::from_key_value(entries)
    }
}
