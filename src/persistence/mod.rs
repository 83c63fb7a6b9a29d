//! Local key-value persistence
//!
//! The game keeps everything that outlives a session in a flat string store:
//! `localStorage` in the browser, a `HashMap` everywhere else.
//!
//! Reads never fail from the caller's point of view. A store that cannot be
//! read behaves like an empty one.

#[cfg(target_arch = "wasm32")]
mod local;

#[cfg(target_arch = "wasm32")]
pub use local::LocalStorage;

use std::collections::HashMap;

use crate::error::Result;

/// Store keys the game itself owns. Claimed flags live under the target
/// ids, so no target may be named after one of these.
pub mod keys {
    /// Running total
    pub const SCORE: &str = "score";
    /// One-shot flag: the last catch was a repeat
    pub const REPEATED: &str = "repeated";
    /// Registered player's email
    pub const IDENTITY: &str = "email";
    /// Serialized player settings
    pub const SETTINGS: &str = "coin_hunt_settings";

    pub const RESERVED: [&str; 4] = [SCORE, REPEATED, IDENTITY, SETTINGS];

    pub fn is_reserved(key: &str) -> bool {
        RESERVED.contains(&key)
    }
}

/// Process-wide string store that survives reloads
pub trait KeyValueStore {
    /// Value for `key`, or `None` when absent or unreadable
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Read and deserialize a JSON value, falling back to `None` on any failure
    fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T>
    where
        Self: Sized,
    {
        let json = self.get(key)?;
        match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Ignoring unreadable value under `{}`: {}", key, e);
                None
            }
        }
    }

    fn set_json<T: serde::Serialize>(&mut self, key: &str, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        let json = serde_json::to_string(value)?;
        self.set(key, &json)
    }
}

/// In-memory store for native runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
