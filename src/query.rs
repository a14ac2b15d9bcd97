//! Query-string state store.
//!
//! The query string is the single source of truth for filters, the selected
//! detail record and create-form visibility. [`QueryStore`] owns the current
//! location plus a navigation history, and every write merges a
//! [`QueryPatch`] into the existing parameters, so one controller never
//! erases keys held by another. A write that changes nothing is a no-op: no
//! history entry, no notification.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::debug;

/// Decoded query parameters, keyed and ordered by name.
pub type QueryParams = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Parse `?a=1&b=two%20words` (leading `?` optional). Keys with empty values
/// are dropped, since absence is the only way to express "unset".
pub fn parse_query(raw: &str) -> QueryParams {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    let mut params = QueryParams::new();
    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        let value = decode_component(value);
        if !key.is_empty() && !value.is_empty() {
            params.insert(key, value);
        }
    }
    params
}

/// Encode parameters as `?k=v&...`, or an empty string when there are none.
pub fn encode_query(params: &QueryParams) -> String {
    if params.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    format!("?{}", pairs.join("&"))
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A page path plus its query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: QueryParams,
}

impl Location {
    pub fn new(path: impl Into<String>, query: QueryParams) -> Self {
        Self {
            path: path.into(),
            query,
        }
    }

    /// Parse `/runs?schedule_id=X&run_id=Y`. A bare `?query` keeps an empty path.
    pub fn parse(raw: &str) -> Self {
        let (path, query) = match raw.split_once('?') {
            Some((path, query)) => (path, query),
            None => (raw, ""),
        };
        Self::new(path, parse_query(query))
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.path, encode_query(&self.query))
    }
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// A partial update: keys to set and keys to remove. Keys not mentioned are
/// left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPatch {
    changes: BTreeMap<String, Option<String>>,
}

impl QueryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`. An empty value removes the key instead.
    pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        let value = if value.is_empty() { None } else { Some(value) };
        self.changes.insert(key.to_string(), value);
        self
    }

    /// Set `key` when `value` is present, remove it otherwise.
    pub fn set_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self.remove(key),
        }
    }

    pub fn remove(mut self, key: &str) -> Self {
        self.changes.insert(key.to_string(), None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Apply onto `params`, returning the merged result.
    pub fn apply(&self, params: &QueryParams) -> QueryParams {
        let mut merged = params.clone();
        for (key, value) in &self.changes {
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged
    }
}

// ---------------------------------------------------------------------------
// QueryStore
// ---------------------------------------------------------------------------

/// How a write lands in the navigation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// New history entry; back returns to the previous one.
    Push,
    /// Overwrite the current entry. Used for filter edits so back/forward stay
    /// reserved for page-level navigation.
    Replace,
}

struct History {
    entries: Vec<Location>,
    cursor: usize,
}

/// Shared query-string state with merge-not-replace writes.
pub struct QueryStore {
    history: Mutex<History>,
    tx: watch::Sender<Location>,
}

impl QueryStore {
    pub fn new(initial: Location) -> Self {
        let (tx, _rx) = watch::channel(initial.clone());
        Self {
            history: Mutex::new(History {
                entries: vec![initial],
                cursor: 0,
            }),
            tx,
        }
    }

    /// Start from a deep link such as `/runs?schedule_id=X&run_id=Y`.
    pub fn from_url(url: &str) -> Self {
        Self::new(Location::parse(url))
    }

    fn lock(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn location(&self) -> Location {
        self.tx.borrow().clone()
    }

    pub fn params(&self) -> QueryParams {
        self.tx.borrow().query.clone()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.tx.borrow().query.get(key).cloned()
    }

    /// Receive every effective location change.
    pub fn subscribe(&self) -> watch::Receiver<Location> {
        self.tx.subscribe()
    }

    /// Merge `patch` into the current parameters. Returns false, and records
    /// nothing, when the merged parameters equal the current ones.
    pub fn set_state(&self, patch: &QueryPatch, navigation: Navigation) -> bool {
        let mut history = self.lock();
        let current = &history.entries[history.cursor];
        let merged = patch.apply(&current.query);
        if merged == current.query {
            return false;
        }
        let next = Location::new(current.path.clone(), merged);
        self.commit(&mut history, next, navigation);
        true
    }

    /// Page-level navigation: always a new history entry.
    pub fn navigate(&self, to: Location) -> bool {
        let mut history = self.lock();
        if history.entries[history.cursor] == to {
            return false;
        }
        self.commit(&mut history, to, Navigation::Push);
        true
    }

    fn commit(&self, history: &mut History, next: Location, navigation: Navigation) {
        debug!(location = %next, ?navigation, "query state updated");
        match navigation {
            Navigation::Push => {
                let keep = history.cursor + 1;
                history.entries.truncate(keep);
                history.entries.push(next.clone());
                history.cursor = keep;
            }
            Navigation::Replace => {
                let cursor = history.cursor;
                history.entries[cursor] = next.clone();
            }
        }
        self.tx.send_replace(next);
    }

    pub fn back(&self) -> bool {
        let mut history = self.lock();
        if history.cursor == 0 {
            return false;
        }
        history.cursor -= 1;
        let location = history.entries[history.cursor].clone();
        self.notify(location);
        true
    }

    pub fn forward(&self) -> bool {
        let mut history = self.lock();
        if history.cursor + 1 >= history.entries.len() {
            return false;
        }
        history.cursor += 1;
        let location = history.entries[history.cursor].clone();
        self.notify(location);
        true
    }

    fn notify(&self, location: Location) {
        self.tx.send_if_modified(|current| {
            if *current == location {
                false
            } else {
                *current = location;
                true
            }
        });
    }

    pub fn history_len(&self) -> usize {
        self.lock().entries.len()
    }
}
