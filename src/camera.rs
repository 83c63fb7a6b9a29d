//! AR camera and hit-testing
//!
//! The tracking engine hands us the camera's world transform every frame
//! and its intrinsics on resize. The camera never derives either itself.

use glam::{Mat4, Vec2, Vec3};

use crate::consts::*;

/// Camera world transform as delivered by the tracking engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose(pub Mat4);

impl CameraPose {
    /// From 16 floats in column-major order
    pub fn from_cols_array(values: &[f32; 16]) -> Self {
        Self(Mat4::from_cols_array(values))
    }

    /// From an engine-supplied slice; anything but 16 values is rejected
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        let array: &[f32; 16] = values.try_into().ok()?;
        Some(Self::from_cols_array(array))
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

/// Intrinsics reported by the tracking engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParameters {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect: f32,
}

impl Default for CameraParameters {
    fn default() -> Self {
        Self {
            fov: 60.0,
            aspect: 1.0,
        }
    }
}

/// Perspective camera driven entirely by the tracking engine
#[derive(Debug, Clone)]
pub struct Camera {
    /// Latest pose received, possibly not yet applied
    pose: CameraPose,
    /// Pose in effect for rendering
    world: Mat4,
    world_dirty: bool,
    params: CameraParameters,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraParameters::default())
    }
}

impl Camera {
    pub fn new(params: CameraParameters) -> Self {
        Self {
            pose: CameraPose::default(),
            world: Mat4::IDENTITY,
            world_dirty: false,
            params,
        }
    }

    /// Overwrite the pose wholesale and mark it for the next render
    pub fn set_pose(&mut self, pose: CameraPose) {
        self.pose = pose;
        self.world_dirty = true;
    }

    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    /// Promote a pending pose to the world matrix. Returns true if one was pending.
    pub fn apply_pending_pose(&mut self) -> bool {
        if !self.world_dirty {
            return false;
        }
        self.world = self.pose.0;
        self.world_dirty = false;
        true
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    pub fn is_world_dirty(&self) -> bool {
        self.world_dirty
    }

    pub fn params(&self) -> CameraParameters {
        self.params
    }

    pub fn set_params(&mut self, params: CameraParameters) {
        self.params = params;
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(
            self.params.fov.to_radians(),
            self.params.aspect,
            CAMERA_NEAR,
            CAMERA_FAR,
        )
    }

    /// View matrix for the most recent pose
    pub fn view_matrix(&self) -> Mat4 {
        self.pose.0.inverse()
    }

    /// World-space ray through a point in normalized device coordinates.
    /// Uses the latest pose, applied or not.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let world = self.pose.0;
        let inv_proj = self.projection_matrix().inverse();
        let near = world.transform_point3(inv_proj.project_point3(ndc.extend(-1.0)));
        let far = world.transform_point3(inv_proj.project_point3(ndc.extend(1.0)));
        Ray {
            origin: world.transform_point3(Vec3::ZERO),
            direction: (far - near).normalize_or_zero(),
        }
    }
}

/// Client-space rectangle of the render surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Convert a client-space point to normalized device coordinates (y up)
pub fn ndc_from_client(x: f32, y: f32, rect: &SurfaceRect) -> Vec2 {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return Vec2::ZERO;
    }
    Vec2::new(
        ((x - rect.left) / rect.width) * 2.0 - 1.0,
        -((y - rect.top) / rect.height) * 2.0 + 1.0,
    )
}

/// Half-line in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction (zero for degenerate rays)
    pub direction: Vec3,
}

impl Ray {
    /// True if the ray passes through the sphere in front of its origin
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        if self.direction == Vec3::ZERO {
            return false;
        }
        let to_center = center - self.origin;
        if to_center.length_squared() <= radius * radius {
            return true;
        }
        let along = to_center.dot(self.direction);
        if along < 0.0 {
            return false;
        }
        let closest_sq = to_center.length_squared() - along * along;
        closest_sq <= radius * radius
    }
}
