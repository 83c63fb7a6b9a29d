//! Game composition
//!
//! Owns one instance of every component for a single page session and
//! routes external callbacks (tracking events, taps, asset and sound
//! completions, animation frames) to them. All of it runs on the page's
//! event thread.

use glam::Vec2;

use crate::audio::{AudioBackend, AudioCueScheduler, Cue};
use crate::camera::Camera;
use crate::catch::{CatchOutcome, CatchSequencer, SequencePhase, Stage};
use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::ledger::ScoreLedger;
use crate::navigation::Navigator;
use crate::persistence::{KeyValueStore, keys};
use crate::render_loop::{RenderLoopDriver, SceneRenderer};
use crate::scene::{AssetEvent, Scene};
use crate::settings::Settings;
use crate::targets::{self, TrackableTarget};
use crate::tracking::{
    RenderSurface, TrackingChange, TrackingEngine, TrackingEvent, TrackingSessionController,
    hit_test,
};

pub struct Game<S: KeyValueStore, A: AudioBackend> {
    config: GameConfig,
    target: TrackableTarget,
    settings: Settings,
    ledger: ScoreLedger<S>,
    audio: AudioCueScheduler<A>,
    tracking: TrackingSessionController,
    scene: Scene,
    camera: Camera,
    sequencer: CatchSequencer,
    driver: RenderLoopDriver,
    resize_pending: bool,
    focused: bool,
}

impl<S: KeyValueStore, A: AudioBackend> Game<S, A> {
    /// Set up a session hunting `target_id`
    pub fn new(config: GameConfig, target_id: &str, store: S, audio: A) -> Result<Self> {
        config.validate()?;
        let target = targets::find(&config.targets, target_id)?.clone();
        let settings = Settings::load(&store);
        let mut audio = AudioCueScheduler::new(audio);
        audio.set_volume(settings.effective_volume());

        log::info!("Hunting {} ({} points)", target.id, target.points);

        Ok(Self {
            scene: Scene::new(&target),
            camera: Camera::default(),
            sequencer: CatchSequencer::new(config.timings, config.lost_target_policy),
            tracking: TrackingSessionController::new(),
            driver: RenderLoopDriver::new(),
            ledger: ScoreLedger::new(store),
            resize_pending: false,
            focused: true,
            config,
            target,
            settings,
            audio,
        })
    }

    /// Entry precondition: a registered player. Redirects to registration
    /// and returns false otherwise.
    pub fn check_identity(&self, navigator: &mut dyn Navigator) -> bool {
        if self.ledger.store().get(keys::IDENTITY).is_some() {
            return true;
        }
        log::info!("No registered player, redirecting to registration");
        navigator.show_registration(&self.target.id);
        false
    }

    // === Tracking session ===

    pub fn request_start(&mut self) -> bool {
        self.tracking.request_start()
    }

    pub fn session_started(&mut self, surface: RenderSurface, engine: &dyn TrackingEngine) {
        self.tracking
            .session_started(surface, engine, &mut self.camera);
        self.resize_pending = true;
    }

    pub fn session_failed(&mut self, err: &GameError) {
        self.tracking.session_failed(err);
    }

    pub fn on_tracking_event(
        &mut self,
        event: TrackingEvent,
        engine: &dyn TrackingEngine,
        navigator: &mut dyn Navigator,
    ) -> TrackingChange {
        let change = self
            .tracking
            .handle_event(event, engine, &mut self.scene, &mut self.camera);

        let mut stage = Stage {
            scene: &mut self.scene,
            audio: &mut self.audio,
            navigator,
        };
        match change {
            TrackingChange::Detected => self.sequencer.on_target_detected(&mut stage),
            TrackingChange::Lost => self.sequencer.on_target_lost(&mut stage),
            TrackingChange::Resized => self.resize_pending = true,
            TrackingChange::PoseUpdated | TrackingChange::Ignored => {}
        }
        change
    }

    // === Assets ===

    pub fn on_asset(&mut self, event: AssetEvent) {
        self.scene.on_asset(event);
    }

    pub fn on_sound_decoded(&mut self, cue: Cue, buffer: A::Buffer) {
        self.audio.on_decoded(cue, buffer);
    }

    pub fn on_sound_failed(&mut self, cue: Cue, err: &GameError) {
        self.audio.on_decode_failed(cue, err);
    }

    // === Input ===

    /// A tap at `ndc`. Starts a catch if it lands on the coin while tracked
    /// and idle; returns the committed outcome in that case.
    pub fn on_tap(&mut self, ndc: Vec2, navigator: &mut dyn Navigator) -> Option<CatchOutcome> {
        let ndc = self.tracking.route_tap(ndc)?;
        if !hit_test(&self.camera, &self.scene, ndc) {
            return None;
        }
        let mut stage = Stage {
            scene: &mut self.scene,
            audio: &mut self.audio,
            navigator,
        };
        self.sequencer
            .trigger(&self.target, &mut self.ledger, &mut stage)
            .cloned()
    }

    /// Page focus changed. Applies to cues already sounding.
    pub fn on_focus_changed(&mut self, focused: bool) {
        self.focused = focused;
        self.apply_volume();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.settings.muted = muted;
        self.apply_volume();
        self.settings.save(self.ledger.store_mut());
    }

    /// Stop the idle coin spin (or allow it again)
    pub fn set_reduced_motion(&mut self, reduced: bool) {
        self.settings.reduced_motion = reduced;
        self.settings.save(self.ledger.store_mut());
    }

    fn apply_volume(&mut self) {
        let volume = if !self.focused && self.settings.mute_on_blur {
            0.0
        } else {
            self.settings.effective_volume()
        };
        self.audio.set_volume(volume);
    }

    // === Frame ===

    /// One animation frame at `time` (ms)
    pub fn frame(
        &mut self,
        time: f64,
        renderer: &mut dyn SceneRenderer,
        navigator: &mut dyn Navigator,
    ) {
        let dt = self.driver.begin_frame(time);
        self.audio.tick(dt as f64);

        let mut stage = Stage {
            scene: &mut self.scene,
            audio: &mut self.audio,
            navigator,
        };
        self.sequencer.advance(dt, &mut stage);

        if self.resize_pending {
            if let Some(surface) = self.tracking.surface() {
                renderer.resize(surface);
            }
            self.resize_pending = false;
        }

        let ambient = self.sequencer.is_idle() && self.settings.ambient_spin();
        self.driver
            .render_frame(dt, &mut self.scene, &mut self.camera, renderer, ambient);
    }

    // === Accessors ===

    pub fn score(&self) -> u64 {
        self.ledger.score()
    }

    pub fn is_claimed(&self, target_id: &str) -> bool {
        self.ledger.is_claimed(target_id)
    }

    /// Read and clear the "repeated" flag left by the last catch
    pub fn take_repeated(&mut self) -> bool {
        self.ledger.take_repeated()
    }

    pub fn phase(&self) -> SequencePhase {
        self.sequencer.phase()
    }

    pub fn sequencer(&self) -> &CatchSequencer {
        &self.sequencer
    }

    pub fn tracking(&self) -> &TrackingSessionController {
        &self.tracking
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn target(&self) -> &TrackableTarget {
        &self.target
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn audio(&self) -> &AudioCueScheduler<A> {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioCueScheduler<A> {
        &mut self.audio
    }

    pub fn fps(&self) -> u32 {
        self.driver.fps()
    }

    /// Hand the store back, e.g. to start another session on it
    pub fn into_store(self) -> S {
        self.ledger.into_store()
    }
}
