//! Browser `localStorage` backend

use web_sys::Storage;

use super::KeyValueStore;
use crate::error::{GameError, Result};

/// `window.localStorage`, if the page is allowed to use it
pub struct LocalStorage {
    storage: Option<Storage>,
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStorage {
    pub fn new() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();
        if storage.is_none() {
            log::warn!("LocalStorage unavailable - progress will not be kept");
        }
        Self { storage }
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.as_ref()?.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let Some(storage) = &self.storage else {
            return Err(GameError::Storage("localStorage unavailable".into()));
        };
        storage
            .set_item(key, value)
            .map_err(|e| GameError::Storage(GameError::js_reason(&e)))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };
        storage
            .remove_item(key)
            .map_err(|e| GameError::Storage(GameError::js_reason(&e)))
    }
}
