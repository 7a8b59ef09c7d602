use std::cell::RefCell;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{Bounds, Error};

/// Store key for the outer bounds of the last live window.
pub const WINDOW_BOUNDS_KEY: &str = "windowBounds";
/// Store key for the last confirmed chat URL.
pub const LAST_CHAT_URL_KEY: &str = "lastChatUrl";

/// Minimal key-value persistence used by the overlay.
///
/// Writes are expected to reach disk before `set` returns.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Result<Option<Value>, Error>;
    fn set(&self, key: &str, value: Value) -> Result<(), Error>;
}

/// Values that survive a restart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSettings {
    pub window_bounds: Option<Bounds>,
    pub last_chat_url: Option<String>,
}

/// Typed, best-effort access to a [`SettingsStore`].
///
/// Reads never fail: a broken or malformed entry is reported and treated as
/// missing. Writes report failures to the caller, which logs them.
pub struct Settings<S> {
    store: S,
}

impl<S: SettingsStore> Settings<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn load(&self) -> PersistedSettings {
        PersistedSettings {
            window_bounds: self.window_bounds(),
            last_chat_url: self.last_chat_url(),
        }
    }

    pub fn window_bounds(&self) -> Option<Bounds> {
        self.read::<Bounds>(WINDOW_BOUNDS_KEY)
            .filter(|bounds| bounds.is_usable())
    }

    pub fn last_chat_url(&self) -> Option<String> {
        self.read::<String>(LAST_CHAT_URL_KEY)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
    }

    pub fn save_bounds(&self, bounds: Bounds) -> Result<(), Error> {
        self.store
            .set(WINDOW_BOUNDS_KEY, serde_json::to_value(bounds)?)
    }

    pub fn save_url(&self, url: &str) -> Result<(), Error> {
        self.store.set(LAST_CHAT_URL_KEY, Value::from(url))
    }

    fn read<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        let value = match self.store.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read '{}' from settings store: {}", key, e);
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Ignoring malformed '{}' in settings store: {}", key, e);
                None
            }
        }
    }
}

/// Process-local store, used when the on-disk store cannot be opened.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        self.values.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }
}

impl<S: SettingsStore + ?Sized> SettingsStore for &S {
    fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        (**self).set(key, value)
    }
}

impl<S: SettingsStore + ?Sized> SettingsStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        (**self).set(key, value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct BrokenStore;

    impl SettingsStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<Value>, Error> {
            Err(Error::Store("disk unplugged".into()))
        }

        fn set(&self, _key: &str, _value: Value) -> Result<(), Error> {
            Err(Error::Store("disk unplugged".into()))
        }
    }

    #[test]
    fn bounds_round_trip_through_store() {
        let settings = Settings::new(MemoryStore::new());
        let bounds = Bounds::new(-1280, 42, 420, 777);

        settings.save_bounds(bounds).unwrap();

        assert_eq!(settings.window_bounds(), Some(bounds));
        assert_eq!(
            settings.store().get(WINDOW_BOUNDS_KEY).unwrap(),
            Some(json!({ "x": -1280, "y": 42, "width": 420, "height": 777 }))
        );
    }

    #[test]
    fn read_failure_means_no_value() {
        let settings = Settings::new(BrokenStore);
        assert_eq!(settings.load(), PersistedSettings::default());
        assert!(settings.save_url("https://example.com").is_err());
    }

    #[test]
    fn malformed_values_are_ignored() {
        let store = MemoryStore::new();
        store.set(WINDOW_BOUNDS_KEY, json!({ "width": "wide" })).unwrap();
        store.set(LAST_CHAT_URL_KEY, json!(17)).unwrap();

        assert_eq!(Settings::new(&store).load(), PersistedSettings::default());
    }

    #[test]
    fn zero_sized_bounds_are_ignored() {
        let store = MemoryStore::new();
        store
            .set(WINDOW_BOUNDS_KEY, json!({ "x": 0, "y": 0, "width": 0, "height": 0 }))
            .unwrap();

        assert_eq!(Settings::new(&store).window_bounds(), None);
    }

    #[test]
    fn blank_url_is_treated_as_missing() {
        let settings = Settings::new(MemoryStore::new());
        settings.save_url("   ").unwrap();
        assert_eq!(settings.last_chat_url(), None);

        settings.save_url("https://example.com/chat").unwrap();
        assert_eq!(
            settings.last_chat_url().as_deref(),
            Some("https://example.com/chat")
        );
    }
}
