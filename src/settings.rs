//! Player preferences
//!
//! Persisted separately from the score in the key-value store.

use serde::{Deserialize, Serialize};

use crate::persistence::{KeyValueStore, keys};

/// Player settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,
    /// Mute when the page loses focus
    pub mute_on_blur: bool,

    // === Accessibility ===
    /// Reduced motion (no idle coin spin)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            mute_on_blur: true,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Effective playback gain
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            (self.master_volume * self.sfx_volume).clamp(0.0, 1.0)
        }
    }

    /// Whether the idle coin should spin
    pub fn ambient_spin(&self) -> bool {
        !self.reduced_motion
    }

    pub fn load(store: &impl KeyValueStore) -> Self {
        match store.get_json(keys::SETTINGS) {
            Some(settings) => {
                log::info!("Loaded settings");
                settings
            }
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut impl KeyValueStore) {
        match store.set_json(keys::SETTINGS, self) {
            Ok(()) => log::info!("Settings saved"),
            Err(e) => log::warn!("Settings not saved: {}", e),
        }
    }
}
