use std::sync::Arc;

use chatlay_core::{Error, MemoryStore, SettingsStore};
use serde_json::Value;
use tauri::{AppHandle, Runtime};
use tauri_plugin_store::{Store, StoreExt};
use tracing::warn;

pub type DynStore = Box<dyn SettingsStore + Send>;

/// [`SettingsStore`] over a `tauri-plugin-store` JSON file in the app data
/// directory. Every write is flushed to disk.
pub struct TauriStore<R: Runtime> {
    store: Arc<Store<R>>,
}

impl<R: Runtime> SettingsStore for TauriStore<R> {
    fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.store.get(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        self.store.set(key, value);
        self.store
            .save()
            .map_err(|e| Error::Store(format!("Failed to save settings: {}", e)))
    }
}

/// Open the settings file, falling back to an in-memory store so a broken
/// file never keeps the overlay from starting.
pub fn open<R: Runtime>(app: &AppHandle<R>, file: &str) -> DynStore {
    match app.store(file) {
        Ok(store) => Box::new(TauriStore { store }),
        Err(e) => {
            warn!("Settings store {} unavailable, nothing will persist: {}", file, e);
            Box::new(MemoryStore::new())
        }
    }
}
