//! Timed Vec3 interpolation
//!
//! A tween animates some axes of one node property from wherever the
//! property is when the tween begins (after its delay) to a target. Time is
//! whatever clock the owner advances; tweens keep no clock of their own.

use glam::{BVec3, Vec3};

use crate::scene::{NodeKind, Scene, Transform};

/// Easing curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ease {
    Linear,
    /// Quadratic ease-out, quick start with a soft landing
    #[default]
    QuadOut,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}

/// Which transform channel a tween drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Position,
    Rotation,
    Scale,
}

impl Property {
    fn get(self, t: &Transform) -> Vec3 {
        match self {
            Property::Position => t.position,
            Property::Rotation => t.rotation,
            Property::Scale => t.scale,
        }
    }

    fn set(self, t: &mut Transform, value: Vec3) {
        match self {
            Property::Position => t.position = value,
            Property::Rotation => t.rotation = value,
            Property::Scale => t.scale = value,
        }
    }
}

/// One property animation on one node
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    pub node: NodeKind,
    pub property: Property,
    target: Vec3,
    /// Axes the tween drives; the rest are left alone
    axes: BVec3,
    /// Clock time at which motion begins
    start: f32,
    duration: f32,
    ease: Ease,
    /// Captured at onset
    from: Option<Vec3>,
}

impl Tween {
    /// Tween every axis of `property` to `target`
    pub fn to(node: NodeKind, property: Property, target: Vec3) -> Self {
        Self {
            node,
            property,
            target,
            axes: BVec3::TRUE,
            start: 0.0,
            duration: 0.0,
            ease: Ease::default(),
            from: None,
        }
    }

    /// Tween only the X axis of `property` to `x`
    pub fn to_x(node: NodeKind, property: Property, x: f32) -> Self {
        Self {
            target: Vec3::new(x, 0.0, 0.0),
            axes: BVec3::new(true, false, false),
            ..Self::to(node, property, Vec3::ZERO)
        }
    }

    /// Tween only the Z axis of `property` to `z`
    pub fn to_z(node: NodeKind, property: Property, z: f32) -> Self {
        Self {
            target: Vec3::new(0.0, 0.0, z),
            axes: BVec3::new(false, false, true),
            ..Self::to(node, property, Vec3::ZERO)
        }
    }

    /// Schedule: motion begins at `start` and lasts `duration`
    pub fn timed(mut self, start: f32, duration: f32) -> Self {
        self.start = start;
        self.duration = duration.max(0.0);
        self
    }

    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn end_time(&self) -> f32 {
        self.start + self.duration
    }

    pub fn is_finished(&self, now: f32) -> bool {
        now >= self.end_time()
    }

    /// Write this tween's value at `now` into the scene.
    /// Does nothing before onset or when the node is not loaded.
    pub fn apply(&mut self, scene: &mut Scene, now: f32) {
        if now < self.start {
            return;
        }
        let Some(transform) = scene.transform_mut(self.node) else {
            return;
        };
        let current = self.property.get(transform);
        let from = *self.from.get_or_insert(current);
        let to = Vec3::select(self.axes, self.target, from);

        let t = if self.duration <= 0.0 {
            1.0
        } else {
            (now - self.start) / self.duration
        };
        let value = from.lerp(to, self.ease.apply(t));
        self.property.set(transform, value);
    }
}
