//! Explicit query cache with prefix invalidation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Never cached: authentication state is always fetched fresh.
const CURRENT_USER: &str = "/api/user";

/// Cached GET responses keyed by path plus query string.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, serde_json::Value>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_cacheable(key: &str) -> bool {
        !matches_prefix(key, CURRENT_USER)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries().get(key).cloned()?;
        serde_json::from_value(value).ok()
    }

    /// Store a response. Keys that must not be cached are ignored.
    pub fn insert<T: Serialize>(&self, key: &str, value: &T) {
        if !Self::is_cacheable(key) {
            return;
        }
        if let Ok(value) = serde_json::to_value(value) {
            self.entries().insert(key.to_string(), value);
        }
    }

    /// Drop every entry whose path is `prefix` or lies under it.
    /// `/api/users` covers `/api/users?role=admin` and
    /// `/api/users/stats` but not `/api/user`.
    pub fn invalidate(&self, prefix: &str) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !matches_prefix(key, prefix));
        let removed = before - entries.len();
        debug!(prefix, removed, "query cache invalidated");
        removed
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn matches_prefix(key: &str, prefix: &str) -> bool {
    match key.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
        None => false,
    }
}
