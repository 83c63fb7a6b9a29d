//! Trackable coin targets
//!
//! Each printed marker the tracking engine knows about maps to one coin with
//! a color and a point value.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// A coin the player can hunt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackableTarget {
    /// Marker identifier reported by the tracking engine
    pub id: String,
    /// Material color as `#rrggbb`
    pub color: String,
    /// Human-readable color for the result view
    pub color_name: String,
    /// Points awarded the first time this coin is caught
    pub points: u64,
}

impl TrackableTarget {
    pub fn new(id: &str, color: &str, color_name: &str, points: u64) -> Self {
        Self {
            id: id.to_string(),
            color: color.to_string(),
            color_name: color_name.to_string(),
            points,
        }
    }

    /// Material color as linear-ish RGB in [0, 1]. Malformed colors render white.
    pub fn color_rgb(&self) -> Vec3 {
        parse_hex_color(&self.color).unwrap_or_else(|| {
            log::warn!("Bad color `{}` for target {}", self.color, self.id);
            Vec3::ONE
        })
    }

    /// Text shown on the reward node, e.g. `+150`
    pub fn reward_label(&self) -> String {
        format!("+{}", self.points)
    }
}

/// The three coins of the reference deployment
pub fn default_targets() -> Vec<TrackableTarget> {
    vec![
        TrackableTarget::new("blue-coin", "#2594f8", "blue", 150),
        TrackableTarget::new("red-coin", "#e7335f", "red", 250),
        TrackableTarget::new("gold-coin", "#faa300", "gold", 500),
    ]
}

/// Look up a target by id
pub fn find<'a>(targets: &'a [TrackableTarget], id: &str) -> Result<&'a TrackableTarget> {
    targets
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| GameError::UnknownTarget(id.to_string()))
}

fn parse_hex_color(s: &str) -> Option<Vec3> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| {
        u8::from_str_radix(hex.get(i..i + 2)?, 16)
            .ok()
            .map(|v| v as f32 / 255.0)
    };
    Some(Vec3::new(channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_known_and_unknown() {
        let targets = default_targets();
        assert_eq!(find(&targets, "gold-coin").unwrap().points, 500);
        assert!(matches!(
            find(&targets, "silver-coin"),
            Err(GameError::UnknownTarget(_))
        ));
    }

    #[test]
    fn test_color_rgb() {
        let t = TrackableTarget::new("x", "#ff0080", "pink", 1);
        let c = t.color_rgb();
        assert!((c.x - 1.0).abs() < 1e-6);
        assert!(c.y.abs() < 1e-6);
        assert!((c.z - 128.0 / 255.0).abs() < 1e-6);

        let bad = TrackableTarget::new("x", "blue", "blue", 1);
        assert_eq!(bad.color_rgb(), Vec3::ONE);
    }

    #[test]
    fn test_reward_label() {
        assert_eq!(default_targets()[1].reward_label(), "+250");
    }
}
