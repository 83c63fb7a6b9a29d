//! Coin Hunt - An AR "catch the coin" game
//!
//! Core modules:
//! - `tracking`: Tracking session lifecycle and tap routing
//! - `catch`: The catch sequence state machine
//! - `ledger`: Persistent score and claimed coins
//! - `audio`: Decode-aware cue scheduling
//! - `render_loop`: Per-frame pose/animation/draw driver
//! - `game`: Composition of all of the above for one page session
//!
//! The tracking engine, the 3D render host and page navigation live outside
//! the crate and are reached through traits.

pub mod audio;
pub mod camera;
pub mod catch;
pub mod config;
pub mod error;
pub mod game;
pub mod ledger;
pub mod navigation;
pub mod persistence;
pub mod render_loop;
pub mod scene;
pub mod settings;
pub mod targets;
pub mod tracking;
pub mod tween;

pub use config::{CatchTimings, GameConfig, LostTargetPolicy};
pub use error::{GameError, Result};
pub use game::Game;
pub use ledger::ScoreLedger;
pub use settings::Settings;
pub use targets::TrackableTarget;

/// Scene and timing constants
pub mod consts {
    use glam::Vec3;
    use std::f32::consts::PI;

    /// Coin lies flat on the marker
    pub const COIN_REST_ROTATION_X: f32 = -0.5 * PI;
    pub const COIN_REST_SCALE: f32 = 0.4;
    /// Bounding sphere radius of the coin model at scale 1
    pub const COIN_HIT_RADIUS: f32 = 1.0;

    /// Reward text starts invisible and grows to full size
    pub const REWARD_HIDDEN_SCALE: f32 = 0.00001;
    pub const REWARD_FULL_SCALE: f32 = 0.0025;
    /// Tilted toward the viewer
    pub const REWARD_ROTATION_X: f32 = -0.65 * PI;
    /// Height above the marker
    pub const REWARD_OFFSET_Y: f32 = 0.5;
    pub const REWARD_COLOR: Vec3 = Vec3::new(1.0, 0.84, 0.0);

    /// Coin pulls back from the marker before the throw
    pub const RETRACT_OFFSET_Z: f32 = -1.0;
    /// Total spin; ends on the rest orientation modulo a full turn
    pub const SPIN_ROTATION_X: f32 = 7.5 * PI;
    /// Idle coin spin (rad/s)
    pub const AMBIENT_SPIN_RATE: f32 = 1.0;

    /// Largest frame delta fed to animations (s)
    pub const MAX_FRAME_DT: f32 = 0.1;
    pub const NOMINAL_FRAME_DT: f32 = 1.0 / 60.0;

    pub const CAMERA_NEAR: f32 = 0.1;
    pub const CAMERA_FAR: f32 = 1000.0;
}
