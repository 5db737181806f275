//! Local store - the on-device key-value persistence layer.
//!
//! Values are JSON-serialized strings under namespaced keys (see [`crate::keys`]).
//! Malformed stored JSON is treated as absent: readers always get their
//! default back instead of a parse error, so a corrupted entry can never
//! wedge the storefront.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Backing storage for the local store.
///
/// Implementations only deal in raw strings; JSON (de)serialization happens
/// in [`LocalStore`]. The engine ships [`MemoryBackend`]; a host application
/// can plug in whatever the platform offers for durable storage.
pub trait StorageBackend: Send + Sync {
    /// Read the raw string stored under `key`, if any.
    fn load(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn store(&self, key: &str, value: String);

    /// Remove the value stored under `key`.
    fn remove(&self, key: &str);
}

/// In-memory storage backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.lock().expect("storage lock").get(key).cloned()
    }

    fn store(&self, key: &str, value: String) {
        self.entries
            .lock()
            .expect("storage lock")
            .insert(key.to_owned(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.lock().expect("storage lock").remove(key);
    }
}

/// Typed view over a [`StorageBackend`].
///
/// Reads fall back to `T::default()` when the key is absent or holds
/// malformed JSON. Writes that fail to serialize are dropped; none of the
/// stored types can actually fail serialization.
pub struct LocalStore {
    backend: Box<dyn StorageBackend>,
}

impl LocalStore {
    /// Create a store over the given backend.
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Create a store over an in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Read and deserialize the value under `key`, or the type's default.
    pub fn get<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        self.get_opt(key).unwrap_or_default()
    }

    /// Read and deserialize the value under `key`.
    ///
    /// Returns `None` for both "absent" and "malformed".
    pub fn get_opt<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let raw = self.backend.load(key)?;
        serde_json::from_str(&raw).ok()
    }

    /// Serialize and store `value` under `key`.
    pub fn set<T>(&self, key: &str, value: &T)
    where
        T: Serialize + ?Sized,
    {
        if let Ok(raw) = serde_json::to_string(value) {
            self.backend.store(key, raw);
        }
    }

    /// Remove the value under `key`.
    pub fn remove(&self, key: &str) {
        self.backend.remove(key);
    }

    /// Whether any value (even malformed) is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.backend.load(key).is_some()
    }

    /// Raw string access, for flags stored outside the JSON convention.
    pub fn load_raw(&self, key: &str) -> Option<String> {
        self.backend.load(key)
    }

    /// Raw string write.
    pub fn store_raw(&self, key: &str, value: &str) {
        self.backend.store(key, value.to_owned());
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").finish_non_exhaustive()
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn get_absent_returns_default() {
        let store = LocalStore::in_memory();
        let value: Vec<String> = store.get("missing");
        assert!(value.is_empty());

        let map: BTreeMap<String, u32> = store.get("missing");
        assert!(map.is_empty());
    }

    #[test]
    fn set_then_get_roundtrip() {
        let store = LocalStore::in_memory();
        store.set("numbers", &vec![1u32, 2, 3]);
        let value: Vec<u32> = store.get("numbers");
        assert_eq!(value, vec![1, 2, 3]);
    }

    #[test]
    fn malformed_json_treated_as_absent() {
        let store = LocalStore::in_memory();
        store.store_raw("broken", "{not json");

        let value: Vec<u32> = store.get("broken");
        assert!(value.is_empty());
        assert_eq!(store.get_opt::<Vec<u32>>("broken"), None);

        // The raw entry is still there; only typed reads fall back.
        assert!(store.contains("broken"));
    }

    #[test]
    fn wrong_shape_treated_as_absent() {
        let store = LocalStore::in_memory();
        store.set("value", &json!({"a": 1}));
        let as_list: Vec<u32> = store.get("value");
        assert!(as_list.is_empty());
    }

    #[test]
    fn remove_clears_entry() {
        let store = LocalStore::in_memory();
        store.set("flag", &true);
        assert!(store.contains("flag"));
        store.remove("flag");
        assert!(!store.contains("flag"));
        assert!(!store.get::<bool>("flag"));
    }

    #[test]
    fn last_writer_wins() {
        let store = LocalStore::in_memory();
        store.set("value", &1u32);
        store.set("value", &2u32);
        assert_eq!(store.get::<u32>("value"), 2);
    }
}
