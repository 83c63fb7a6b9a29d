//! Game configuration
//!
//! Everything here is static for a deployment. Values come from
//! `Default` unless a JSON document overrides them field by field.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::persistence::keys;
use crate::targets::{TrackableTarget, default_targets};

/// Durations and delays of the catch sequence, in seconds.
///
/// Delays are measured from the moment the owning step is entered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatchTimings {
    /// Rotation back to face the camera
    pub align_duration: f32,
    /// Wait after the tap before the coin is pulled back
    pub retract_delay: f32,
    pub retract_duration: f32,
    /// Offset into the retraction at which the spin and throw sound begin
    pub spin_lead_in: f32,
    pub spin_duration: f32,
    pub return_duration: f32,
    pub reveal_delay: f32,
    pub reveal_duration: f32,
    /// Delay of the reward text growth, from the onset of the reveal
    pub reward_delay: f32,
    pub reward_duration: f32,
    /// How long the success sound keeps playing after the reward is shown
    pub success_stop_grace: f32,
}

impl Default for CatchTimings {
    fn default() -> Self {
        Self {
            align_duration: 0.5,
            retract_delay: 0.5,
            retract_duration: 1.0,
            spin_lead_in: 0.1,
            spin_duration: 2.0,
            return_duration: 1.0,
            reveal_delay: 0.5,
            reveal_duration: 1.0,
            reward_delay: 0.5,
            reward_duration: 2.0,
            success_stop_grace: 0.5,
        }
    }
}

impl CatchTimings {
    /// Time from tap to the start of the Completed step
    pub fn time_to_complete(&self) -> f32 {
        self.retract_delay
            + self.retract_duration
            + self.return_duration
            + self.reveal_delay
            + self.reward_delay
            + self.reward_duration
    }
}

/// What happens to a running catch sequence when the coin leaves the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LostTargetPolicy {
    /// Keep animating off-screen and complete normally
    #[default]
    RunHeadless,
    /// Freeze the sequence clock until the target is detected again
    Pause,
    /// Drop the sequence and return to Idle (the score stays committed)
    Abort,
}

/// Tracking engine mode selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TrackingMode {
    #[default]
    Image,
    Surface,
    Spatial,
}

impl TrackingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingMode::Image => "Image",
            TrackingMode::Surface => "Surface",
            TrackingMode::Spatial => "Spatial",
        }
    }
}

/// Credentials and mode passed to the tracking engine on init
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub token: String,
    pub mode: TrackingMode,
}

/// Asset locations, relative to the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub coin_model: String,
    pub env_map: String,
    pub success_sound: String,
    pub throw_sound: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            coin_model: "assets/coin.glb".into(),
            env_map: "assets/christmas_photo_studio_04_1k.jpg".into(),
            success_sound: "assets/success-sound-effect.mp3".into(),
            throw_sound: "assets/coin-thrown-sound.mp3".into(),
        }
    }
}

/// Complete deployment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub tracking: TrackingConfig,
    pub assets: AssetPaths,
    pub timings: CatchTimings,
    pub lost_target_policy: LostTargetPolicy,
    pub targets: Vec<TrackableTarget>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tracking: TrackingConfig::default(),
            assets: AssetPaths::default(),
            timings: CatchTimings::default(),
            lost_target_policy: LostTargetPolicy::default(),
            targets: default_targets(),
        }
    }
}

impl GameConfig {
    /// Parse a (possibly partial) JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Target ids double as claimed-flag keys and must not shadow the
    /// game's own entries
    pub fn validate(&self) -> Result<()> {
        match self.targets.iter().find(|t| keys::is_reserved(&t.id)) {
            Some(target) => Err(GameError::ReservedTargetId(target.id.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_to_complete() {
        let t = CatchTimings::default();
        assert!((t.time_to_complete() - 5.5).abs() < 1e-6);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = GameConfig::from_json(
            r#"{
                "tracking": { "token": "abc" },
                "timings": { "spin_duration": 3.0 },
                "lost_target_policy": "Pause"
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.tracking.token, "abc");
        assert_eq!(cfg.tracking.mode, TrackingMode::Image);
        assert_eq!(cfg.timings.spin_duration, 3.0);
        assert_eq!(cfg.timings.align_duration, 0.5);
        assert_eq!(cfg.lost_target_policy, LostTargetPolicy::Pause);
        assert_eq!(cfg.targets.len(), 3);
    }

    #[test]
    fn test_reserved_target_id_rejected() {
        let result = GameConfig::from_json(
            r##"{ "targets": [
                { "id": "silver-coin", "color": "#c0c0c0", "color_name": "silver", "points": 50 },
                { "id": "score", "color": "#000000", "color_name": "black", "points": 1 }
            ] }"##,
        );
        assert!(matches!(result, Err(GameError::ReservedTargetId(id)) if id == "score"));
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bad_json_is_config_error() {
        assert!(GameConfig::from_json("{ \"timings\": 7 }").is_err());
    }
}
