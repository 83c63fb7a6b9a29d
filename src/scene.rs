//! Scene model
//!
//! The Rust side owns the transforms and visibility of the two animated
//! nodes. The render host mirrors this state each frame and never writes
//! back.

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::consts::*;
use crate::error::GameError;
use crate::targets::TrackableTarget;

/// Position, Euler rotation (XYZ, radians) and scale of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Model matrix
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }

    /// Resting pose of a freshly loaded coin
    pub fn coin_rest() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::new(COIN_REST_ROTATION_X, 0.0, 0.0),
            scale: Vec3::splat(COIN_REST_SCALE),
        }
    }

    /// Reward text before it grows: in place but effectively invisible
    pub fn reward_hidden() -> Self {
        Self {
            position: Vec3::new(0.0, REWARD_OFFSET_Y, 0.0),
            rotation: Vec3::new(REWARD_ROTATION_X, 0.0, 0.0),
            scale: Vec3::splat(REWARD_HIDDEN_SCALE),
        }
    }
}

/// The two nodes the game animates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Coin,
    RewardText,
}

/// Assets the scene depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    CoinModel,
    EnvironmentMap,
    RewardText,
}

/// Completion of an asynchronous asset load
#[derive(Debug)]
pub enum AssetEvent {
    Loaded(AssetKind),
    Failed(AssetKind, GameError),
}

/// A loaded node
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub transform: Transform,
    /// Material color (RGB, 0-1)
    pub color: Vec3,
}

/// Scene background
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    /// Live camera feed from the tracking engine
    CameraFeed,
}

/// Visible scene state for one session
#[derive(Debug, Clone)]
pub struct Scene {
    coin: Option<SceneNode>,
    reward_text: Option<SceneNode>,
    coin_in_scene: bool,
    reward_in_scene: bool,
    pub background: Option<Background>,
    pub env_map_ready: bool,
    /// Text drawn on the reward node
    pub reward_label: String,
    coin_color: Vec3,
}

impl Scene {
    pub fn new(target: &TrackableTarget) -> Self {
        Self {
            coin: None,
            reward_text: None,
            coin_in_scene: false,
            reward_in_scene: false,
            background: None,
            env_map_ready: false,
            reward_label: target.reward_label(),
            coin_color: target.color_rgb(),
        }
    }

    /// Apply an asset completion. Failures leave the node missing.
    pub fn on_asset(&mut self, event: AssetEvent) {
        match event {
            AssetEvent::Loaded(AssetKind::CoinModel) => {
                self.coin = Some(SceneNode {
                    transform: Transform::coin_rest(),
                    color: self.coin_color,
                });
                log::info!("Coin model ready");
            }
            AssetEvent::Loaded(AssetKind::RewardText) => {
                self.reward_text = Some(SceneNode {
                    transform: Transform::reward_hidden(),
                    color: REWARD_COLOR,
                });
            }
            AssetEvent::Loaded(AssetKind::EnvironmentMap) => {
                self.env_map_ready = true;
            }
            AssetEvent::Failed(kind, err) => {
                log::error!("{:?} unavailable, continuing without it: {}", kind, err);
            }
        }
    }

    pub fn add(&mut self, kind: NodeKind) {
        match kind {
            NodeKind::Coin => self.coin_in_scene = true,
            NodeKind::RewardText => self.reward_in_scene = true,
        }
    }

    pub fn remove(&mut self, kind: NodeKind) {
        match kind {
            NodeKind::Coin => self.coin_in_scene = false,
            NodeKind::RewardText => self.reward_in_scene = false,
        }
    }

    /// Node is loaded and currently part of the scene
    pub fn contains(&self, kind: NodeKind) -> bool {
        match kind {
            NodeKind::Coin => self.coin_in_scene && self.coin.is_some(),
            NodeKind::RewardText => self.reward_in_scene && self.reward_text.is_some(),
        }
    }

    pub fn node(&self, kind: NodeKind) -> Option<&SceneNode> {
        match kind {
            NodeKind::Coin => self.coin.as_ref(),
            NodeKind::RewardText => self.reward_text.as_ref(),
        }
    }

    /// Transform of a loaded node; missing nodes yield `None` and are skipped
    pub fn transform_mut(&mut self, kind: NodeKind) -> Option<&mut Transform> {
        match kind {
            NodeKind::Coin => self.coin.as_mut().map(|n| &mut n.transform),
            NodeKind::RewardText => self.reward_text.as_mut().map(|n| &mut n.transform),
        }
    }

    pub fn transform(&self, kind: NodeKind) -> Option<Transform> {
        self.node(kind).map(|n| n.transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::default_targets;

    #[test]
    fn test_nodes_missing_until_loaded() {
        let mut scene = Scene::new(&default_targets()[0]);
        scene.add(NodeKind::Coin);
        assert!(!scene.contains(NodeKind::Coin));
        assert!(scene.transform_mut(NodeKind::Coin).is_none());

        scene.on_asset(AssetEvent::Loaded(AssetKind::CoinModel));
        assert!(scene.contains(NodeKind::Coin));
        assert_eq!(scene.transform(NodeKind::Coin), Some(Transform::coin_rest()));
    }

    #[test]
    fn test_failed_asset_is_tolerated() {
        let mut scene = Scene::new(&default_targets()[2]);
        scene.on_asset(AssetEvent::Failed(
            AssetKind::RewardText,
            GameError::asset("font", "missing"),
        ));
        scene.add(NodeKind::RewardText);
        assert!(!scene.contains(NodeKind::RewardText));
        assert_eq!(scene.reward_label, "+500");
    }

    #[test]
    fn test_transform_matrix_translation() {
        let t = Transform {
            position: Vec3::new(0.0, 0.0, -1.0),
            ..Default::default()
        };
        let p = t.matrix().transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
    }
}
