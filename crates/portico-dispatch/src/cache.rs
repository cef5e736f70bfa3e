//! Response cache: a keyed store of serialized responses with TTL.
//!
//! The store outlives individual requests by design. The trait only asks
//! for atomic per-key get/set; cross-request races are last-writer-wins. A
//! corrupt or expired entry is indistinguishable from a miss and heals
//! itself the next time the method runs and repopulates the key.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::action::ActionRequest;
use crate::response::{Body, Response};

/// A persistent keyed string store with atomic get/set.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
}

/// In-memory store. Suitable for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        if let Ok(mut map) = self.inner.lock() {
            map.insert(key.to_string(), value);
        }
    }
}

/// JSON-file-backed store: the whole map is loaded at open and written
/// through on every set. A missing or corrupt file starts empty.
pub struct FileStore {
    path: PathBuf,
    inner: Mutex<HashMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let map = match File::open(&path) {
            Ok(file) => match serde_json::from_reader(BufReader::new(file)) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "corrupt cache file, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            inner: Mutex::new(map),
        }
    }

    fn persist(&self, map: &HashMap<String, String>) {
        let result = File::create(&self.path)
            .map_err(|e| e.to_string())
            .and_then(|file| {
                serde_json::to_writer(BufWriter::new(file), map).map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist cache file");
        }
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        if let Ok(mut map) = self.inner.lock() {
            map.insert(key.to_string(), value);
            self.persist(&map);
        }
    }
}

/// The serialized form of a response: status, body, headers. Hijack state
/// is not part of it; a replayed response always auto-sends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    status: u16,
    content_type: Option<String>,
    headers: Vec<(String, String)>,
    body: Body,
}

impl CachedResponse {
    pub(crate) fn from_response(response: &Response) -> Self {
        Self {
            status: response.status_code(),
            content_type: response.content_type().map(str::to_string),
            headers: response.headers().to_vec(),
            body: response.body().clone(),
        }
    }

    pub(crate) fn into_response(self) -> Response {
        Response::from_parts(self.status, self.body, self.content_type, self.headers)
    }
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    expires_at: u64,
    response: CachedResponse,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// TTL-aware view over a [`CacheStore`].
#[derive(Clone)]
pub struct ResponseCache {
    store: std::sync::Arc<dyn CacheStore>,
}

impl ResponseCache {
    pub fn new(store: std::sync::Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Looks up a live entry. Expired and undeserializable entries are
    /// misses; the latter logs, since it means a foreign writer or a
    /// format change.
    pub(crate) fn fetch(&self, key: &str) -> Option<CachedResponse> {
        let raw = self.store.get(key)?;
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key, error = %e, "undeserializable cache entry, treating as miss");
                return None;
            }
        };
        if entry.expires_at <= now_secs() {
            return None;
        }
        Some(entry.response)
    }

    /// Serializes `response` under `key` with the given TTL.
    pub(crate) fn store(&self, key: &str, response: &Response, ttl_secs: u64) {
        let entry = CacheEntry {
            expires_at: now_secs().saturating_add(ttl_secs),
            response: CachedResponse::from_response(response),
        };
        match serde_json::to_string(&entry) {
            Ok(raw) => self.store.set(key, raw),
            Err(e) => tracing::warn!(key, error = %e, "failed to serialize cache entry"),
        }
    }
}

/// Composes a cache key from the handler identity and the request's
/// vary-by argument values, in declared order.
///
/// Default key is `identity:method`; an explicit override replaces that
/// base. Each vary-by argument appends `:value` (missing arguments append
/// an empty value so the shape stays stable).
pub(crate) fn compose_key(
    identity: &str,
    method: &str,
    key_override: Option<&str>,
    vary_by: &[String],
    action: &ActionRequest,
) -> String {
    let mut key = match key_override {
        Some(explicit) => explicit.to_string(),
        None => format!("{identity}:{method}"),
    };
    for name in vary_by {
        key.push(':');
        match action.arg(name) {
            Some(serde_json::Value::String(s)) => key.push_str(s),
            Some(other) => key.push_str(&other.to_string()),
            None => {}
        }
    }
    key
}
