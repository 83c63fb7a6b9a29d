//! Tracking session lifecycle
//!
//! Translates the tracking engine's four event kinds into scene visibility
//! and camera updates, and owns the input port that lets taps through only
//! while a target is in view.
//!
//! Starting a session is asynchronous on the engine side. The platform glue
//! calls [`TrackingSessionController::request_start`], awaits the engine,
//! then reports back with `session_started` or `session_failed`.

use glam::Vec2;

use crate::camera::{Camera, CameraParameters, CameraPose};
use crate::consts::COIN_HIT_RADIUS;
use crate::error::GameError;
use crate::scene::{Background, NodeKind, Scene};

/// Events delivered by the tracking engine
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingEvent {
    Detected(String),
    Lost(String),
    Pose(CameraPose),
    Resize,
}

/// Queries the controller makes back into the engine
pub trait TrackingEngine {
    fn camera_parameters(&self) -> CameraParameters;
    /// Current pixel size of the engine-provided render surface
    fn surface_size(&self) -> RenderSurface;
}

/// Render surface handed out by the engine on init
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderSurface {
    pub width: u32,
    pub height: u32,
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Waiting for the player to start
    PrePlay,
    /// Engine init in flight
    Loading,
    Active,
}

/// What an event changed, for components that react to tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingChange {
    Ignored,
    Detected,
    Lost,
    PoseUpdated,
    Resized,
}

pub struct TrackingSessionController {
    status: SessionStatus,
    detected: Option<String>,
    hit_test_enabled: bool,
    surface: Option<RenderSurface>,
}

impl Default for TrackingSessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingSessionController {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::PrePlay,
            detected: None,
            hit_test_enabled: false,
            surface: None,
        }
    }

    /// Enter Loading. Returns false if a session is already starting or running.
    pub fn request_start(&mut self) -> bool {
        if self.status != SessionStatus::PrePlay {
            log::warn!("Tracking start ignored, session is {:?}", self.status);
            return false;
        }
        self.status = SessionStatus::Loading;
        log::info!("Starting tracking session...");
        true
    }

    /// Engine init resolved with its render surface
    pub fn session_started(
        &mut self,
        surface: RenderSurface,
        engine: &dyn TrackingEngine,
        camera: &mut Camera,
    ) {
        if self.status != SessionStatus::Loading {
            log::warn!("Unexpected session start while {:?}", self.status);
        }
        camera.set_params(engine.camera_parameters());
        self.surface = Some(surface);
        self.status = SessionStatus::Active;
        log::info!("Tracking session active ({}x{})", surface.width, surface.height);
    }

    /// Engine init rejected. The game drops back to pre-play; no retry.
    pub fn session_failed(&mut self, err: &GameError) {
        log::error!("{}", err);
        self.status = SessionStatus::PrePlay;
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == SessionStatus::Loading
    }

    /// Id of the target currently in view
    pub fn detected(&self) -> Option<&str> {
        self.detected.as_deref()
    }

    pub fn hit_test_enabled(&self) -> bool {
        self.hit_test_enabled
    }

    pub fn surface(&self) -> Option<RenderSurface> {
        self.surface
    }

    /// Apply one engine event. Never blocks; pose updates are synchronous.
    pub fn handle_event(
        &mut self,
        event: TrackingEvent,
        engine: &dyn TrackingEngine,
        scene: &mut Scene,
        camera: &mut Camera,
    ) -> TrackingChange {
        if self.status != SessionStatus::Active {
            log::debug!("Dropping {:?} outside an active session", event);
            return TrackingChange::Ignored;
        }

        match event {
            TrackingEvent::Detected(id) => {
                if self.detected.as_deref() == Some(id.as_str()) {
                    return TrackingChange::Ignored;
                }
                log::info!("Detected image: {}", id);
                scene.add(NodeKind::Coin);
                scene.background = Some(Background::CameraFeed);
                self.hit_test_enabled = true;
                self.detected = Some(id);
                TrackingChange::Detected
            }
            TrackingEvent::Lost(id) => {
                log::info!("Lost image: {}", id);
                scene.remove(NodeKind::Coin);
                scene.remove(NodeKind::RewardText);
                scene.background = None;
                self.hit_test_enabled = false;
                self.detected = None;
                TrackingChange::Lost
            }
            TrackingEvent::Pose(pose) => {
                camera.set_pose(pose);
                TrackingChange::PoseUpdated
            }
            TrackingEvent::Resize => {
                camera.set_params(engine.camera_parameters());
                self.surface = Some(engine.surface_size());
                TrackingChange::Resized
            }
        }
    }

    /// Input port: a tap reaches hit-testing only while a target is tracked
    pub fn route_tap(&self, ndc: Vec2) -> Option<Vec2> {
        (self.status == SessionStatus::Active && self.hit_test_enabled).then_some(ndc)
    }
}

/// Ray-cast a tap against the coin's bounding sphere
pub fn hit_test(camera: &Camera, scene: &Scene, ndc: Vec2) -> bool {
    if !scene.contains(NodeKind::Coin) {
        return false;
    }
    let Some(coin) = scene.transform(NodeKind::Coin) else {
        return false;
    };
    let radius = COIN_HIT_RADIUS * coin.scale.max_element();
    camera.ray_from_ndc(ndc).intersects_sphere(coin.position, radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{AssetEvent, AssetKind};
    use crate::targets::default_targets;
    use glam::{Mat4, Vec3};

    struct FakeEngine {
        params: CameraParameters,
    }

    impl TrackingEngine for FakeEngine {
        fn camera_parameters(&self) -> CameraParameters {
            self.params
        }

        fn surface_size(&self) -> RenderSurface {
            RenderSurface {
                width: 720,
                height: 1280,
            }
        }
    }

    fn engine() -> FakeEngine {
        FakeEngine {
            params: CameraParameters {
                fov: 50.0,
                aspect: 0.5625,
            },
        }
    }

    fn active() -> (TrackingSessionController, Scene, Camera) {
        let mut ctl = TrackingSessionController::new();
        let mut camera = Camera::default();
        let mut scene = Scene::new(&default_targets()[0]);
        scene.on_asset(AssetEvent::Loaded(AssetKind::CoinModel));
        assert!(ctl.request_start());
        ctl.session_started(RenderSurface::default(), &engine(), &mut camera);
        (ctl, scene, camera)
    }

    #[test]
    fn test_start_failure_returns_to_preplay() {
        let mut ctl = TrackingSessionController::new();
        assert!(ctl.request_start());
        assert!(ctl.is_loading());
        assert!(!ctl.request_start());

        ctl.session_failed(&GameError::TrackingInit("camera denied".into()));
        assert_eq!(ctl.status(), SessionStatus::PrePlay);
        assert!(!ctl.is_loading());
        assert!(ctl.request_start());
    }

    #[test]
    fn test_events_before_start_are_ignored() {
        let mut ctl = TrackingSessionController::new();
        let mut scene = Scene::new(&default_targets()[0]);
        let mut camera = Camera::default();
        let change = ctl.handle_event(
            TrackingEvent::Detected("blue-coin".into()),
            &engine(),
            &mut scene,
            &mut camera,
        );
        assert_eq!(change, TrackingChange::Ignored);
        assert!(scene.background.is_none());
    }

    #[test]
    fn test_detect_lost_toggles_scene_and_input() {
        let (mut ctl, mut scene, mut camera) = active();
        let e = engine();

        let change = ctl.handle_event(TrackingEvent::Detected("blue-coin".into()), &e, &mut scene, &mut camera);
        assert_eq!(change, TrackingChange::Detected);
        assert!(scene.contains(NodeKind::Coin));
        assert_eq!(scene.background, Some(Background::CameraFeed));
        assert!(ctl.route_tap(Vec2::ZERO).is_some());

        // Idempotent
        let again = ctl.handle_event(TrackingEvent::Detected("blue-coin".into()), &e, &mut scene, &mut camera);
        assert_eq!(again, TrackingChange::Ignored);

        ctl.handle_event(TrackingEvent::Lost("blue-coin".into()), &e, &mut scene, &mut camera);
        assert!(!scene.contains(NodeKind::Coin));
        assert!(scene.background.is_none());
        assert!(ctl.route_tap(Vec2::ZERO).is_none());
    }

    #[test]
    fn test_resize_keeps_pose() {
        let (mut ctl, mut scene, mut camera) = active();
        let pose = CameraPose(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        ctl.handle_event(TrackingEvent::Pose(pose), &engine(), &mut scene, &mut camera);

        let resized = FakeEngine {
            params: CameraParameters { fov: 40.0, aspect: 1.7 },
        };
        let change = ctl.handle_event(TrackingEvent::Resize, &resized, &mut scene, &mut camera);
        assert_eq!(change, TrackingChange::Resized);
        assert_eq!(camera.params().fov, 40.0);
        assert_eq!(camera.pose(), pose);
        assert_eq!(ctl.surface().unwrap().width, 720);
    }

    #[test]
    fn test_hit_test_center_tap() {
        let (mut ctl, mut scene, mut camera) = active();
        let e = engine();
        ctl.handle_event(TrackingEvent::Detected("blue-coin".into()), &e, &mut scene, &mut camera);
        let pose = CameraPose(Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0)));
        ctl.handle_event(TrackingEvent::Pose(pose), &e, &mut scene, &mut camera);

        assert!(hit_test(&camera, &scene, Vec2::ZERO));
        assert!(!hit_test(&camera, &scene, Vec2::new(0.95, -0.95)));

        scene.remove(NodeKind::Coin);
        assert!(!hit_test(&camera, &scene, Vec2::ZERO));
    }
}
