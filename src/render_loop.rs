//! Per-frame render driver
//!
//! Runs from the first frame after the session starts until the page goes
//! away, with or without a target in view: the camera feed and UI still need
//! drawing when nothing is tracked.

use std::f32::consts::TAU;

use crate::camera::Camera;
use crate::consts::*;
use crate::error::Result;
use crate::scene::{NodeKind, Scene};
use crate::tracking::RenderSurface;

/// The render host (three.js in the browser)
pub trait SceneRenderer {
    /// Draw `scene` as seen from `camera`
    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<()>;
    /// Match the drawing buffer to the engine's surface
    fn resize(&mut self, _surface: RenderSurface) {}
}

/// Renderer that draws nothing, for native runs and tests
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub frames: u64,
    /// World matrix the camera had at each render
    pub last_camera_world: Option<glam::Mat4>,
}

impl SceneRenderer for NullRenderer {
    fn render(&mut self, _scene: &Scene, camera: &Camera) -> Result<()> {
        self.frames += 1;
        self.last_camera_world = Some(camera.world_matrix());
        Ok(())
    }
}

pub struct RenderLoopDriver {
    last_time: f64,
    /// Ring of recent frame timestamps (ms)
    frame_times: [f64; 60],
    frame_index: usize,
    fps: u32,
    frames: u64,
}

impl Default for RenderLoopDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoopDriver {
    pub fn new() -> Self {
        Self {
            last_time: 0.0,
            frame_times: [0.0; 60],
            frame_index: 0,
            fps: 0,
            frames: 0,
        }
    }

    /// Start a frame at `time` (ms). Returns the clamped delta in seconds.
    pub fn begin_frame(&mut self, time: f64) -> f32 {
        let dt = if self.last_time > 0.0 {
            (((time - self.last_time) / 1000.0) as f32).clamp(0.0, MAX_FRAME_DT)
        } else {
            NOMINAL_FRAME_DT
        };
        self.last_time = time;

        // Track frame times for FPS
        self.frame_times[self.frame_index] = time;
        self.frame_index = (self.frame_index + 1) % self.frame_times.len();

        // Oldest entry is the one about to be overwritten
        let oldest_time = self.frame_times[self.frame_index];
        if oldest_time > 0.0 {
            let elapsed = time - oldest_time;
            if elapsed > 0.0 {
                self.fps = ((self.frame_times.len() as f64 - 1.0) * 1000.0 / elapsed).round() as u32;
            }
        }

        dt
    }

    /// Apply the latest pose, idle-spin the coin if allowed, and draw.
    /// Render failures are logged; the loop carries on.
    pub fn render_frame(
        &mut self,
        dt: f32,
        scene: &mut Scene,
        camera: &mut Camera,
        renderer: &mut dyn SceneRenderer,
        ambient_spin: bool,
    ) {
        camera.apply_pending_pose();

        if ambient_spin {
            if let Some(coin) = scene.transform_mut(NodeKind::Coin) {
                coin.rotation.y = (coin.rotation.y + dt * AMBIENT_SPIN_RATE).rem_euclid(TAU);
            }
        }

        if let Err(e) = renderer.render(scene, camera) {
            log::warn!("Render error: {}", e);
        }
        self.frames += 1;
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraPose;
    use crate::error::GameError;
    use crate::scene::{AssetEvent, AssetKind};
    use crate::targets::default_targets;
    use glam::{Mat4, Vec3};

    struct FailingRenderer;

    impl SceneRenderer for FailingRenderer {
        fn render(&mut self, _scene: &Scene, _camera: &Camera) -> Result<()> {
            Err(GameError::Render("context lost".into()))
        }
    }

    fn loaded_scene() -> Scene {
        let mut scene = Scene::new(&default_targets()[0]);
        scene.on_asset(AssetEvent::Loaded(AssetKind::CoinModel));
        scene
    }

    #[test]
    fn test_dt_clamped_and_fps() {
        let mut driver = RenderLoopDriver::new();
        assert_eq!(driver.begin_frame(1000.0), NOMINAL_FRAME_DT);
        assert_eq!(driver.begin_frame(6000.0), MAX_FRAME_DT);

        let mut t = 6000.0;
        for _ in 0..120 {
            t += 1000.0 / 60.0;
            driver.begin_frame(t);
        }
        assert_eq!(driver.fps(), 60);
    }

    #[test]
    fn test_pose_visible_to_next_render() {
        let mut driver = RenderLoopDriver::new();
        let mut scene = loaded_scene();
        let mut camera = Camera::default();
        let mut renderer = NullRenderer::default();

        let pose = Mat4::from_translation(Vec3::new(0.0, 1.0, 4.0));
        camera.set_pose(CameraPose(pose));
        driver.render_frame(0.016, &mut scene, &mut camera, &mut renderer, true);
        assert_eq!(renderer.last_camera_world, Some(pose));
    }

    #[test]
    fn test_ambient_spin_only_when_allowed() {
        let mut driver = RenderLoopDriver::new();
        let mut scene = loaded_scene();
        let mut camera = Camera::default();
        let mut renderer = NullRenderer::default();

        driver.render_frame(0.5, &mut scene, &mut camera, &mut renderer, false);
        assert_eq!(scene.transform(NodeKind::Coin).unwrap().rotation.y, 0.0);

        driver.render_frame(0.5, &mut scene, &mut camera, &mut renderer, true);
        let y = scene.transform(NodeKind::Coin).unwrap().rotation.y;
        assert!((y - 0.5 * AMBIENT_SPIN_RATE).abs() < 1e-6);
    }

    #[test]
    fn test_render_error_does_not_stop_loop() {
        let mut driver = RenderLoopDriver::new();
        let mut scene = loaded_scene();
        let mut camera = Camera::default();
        driver.render_frame(0.016, &mut scene, &mut camera, &mut FailingRenderer, true);
        driver.render_frame(0.016, &mut scene, &mut camera, &mut FailingRenderer, true);
        assert_eq!(driver.frames(), 2);
    }
}
