//! Session-scoped key/value storage.
//!
//! State that should live for one browsing session (the cross-lens memory
//! trail) goes through [`SessionStore`]:
//! - Web: `window.sessionStorage`
//! - Desktop and tests: [`MemoryStorage`], an in-process map that lives as long
//!   as the application does, which matches session semantics there.
//!
//! [`load`] and [`save`] add JSON (de)serialization on top of the raw store.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{de::DeserializeOwned, Serialize};

/// Minimal string store, shaped after the Web Storage API.
pub trait SessionStore {
    fn get_item(&self, key: &str) -> Option<String>;
    /// Returns `true` if the value was stored.
    fn set_item(&self, key: &str, value: &str) -> bool;
    fn remove_item(&self, key: &str);
}

/// Save a value as JSON.
///
/// Returns `true` if the operation succeeded.
pub fn save<T: Serialize>(store: &dyn SessionStore, key: &str, value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(json) => store.set_item(key, &json),
        Err(e) => {
            crate::log_warn!("storage: failed to serialize '{}': {}", key, e);
            false
        }
    }
}

/// Load a JSON value.
///
/// Returns `None` if the key doesn't exist or deserialization fails.
pub fn load<T: DeserializeOwned>(store: &dyn SessionStore, key: &str) -> Option<T> {
    let json = store.get_item(key)?;
    match serde_json::from_str(&json) {
        Ok(value) => Some(value),
        Err(e) => {
            crate::log_warn!("storage: discarding unreadable '{}': {}", key, e);
            None
        }
    }
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl SessionStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> bool {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        true
    }

    fn remove_item(&self, key: &str) {
        self.items.borrow_mut().remove(key);
    }
}

// =========================================
// Web (WASM) implementation
// =========================================

/// `window.sessionStorage`. Every call degrades to a no-op when storage is
/// unavailable (private mode, sandboxed iframes).
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserSessionStorage;

#[cfg(target_arch = "wasm32")]
impl BrowserSessionStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.session_storage().ok()?
    }
}

#[cfg(target_arch = "wasm32")]
impl SessionStore for BrowserSessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok()?
    }

    fn set_item(&self, key: &str, value: &str) -> bool {
        match Self::storage() {
            Some(storage) => storage.set_item(key, value).is_ok(),
            None => false,
        }
    }

    fn remove_item(&self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }
}

/// The session store for the current platform.
#[cfg(target_arch = "wasm32")]
pub fn platform_store() -> Rc<dyn SessionStore> {
    Rc::new(BrowserSessionStorage)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn platform_store() -> Rc<dyn SessionStore> {
    Rc::new(MemoryStorage::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        lens: String,
        count: u32,
    }

    #[test]
    fn json_helpers_round_trip() {
        let store = MemoryStorage::new();
        let prefs = Prefs {
            lens: "finance".into(),
            count: 2,
        };
        assert!(save(&store, "prefs", &prefs));
        assert_eq!(load::<Prefs>(&store, "prefs"), Some(prefs));
    }

    #[test]
    fn unreadable_values_load_as_none() {
        let store = MemoryStorage::new();
        store.set_item("prefs", "{broken");
        assert_eq!(load::<Prefs>(&store, "prefs"), None);
        assert_eq!(load::<Prefs>(&store, "missing"), None);
    }

    #[test]
    fn clones_share_items() {
        let store = MemoryStorage::new();
        let other = store.clone();
        other.set_item("k", "v");
        other.set_item("k", "w");
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_item("k").as_deref(), Some("w"));
        store.remove_item("k");
        assert!(other.is_empty());
    }
}
