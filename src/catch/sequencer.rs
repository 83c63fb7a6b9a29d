//! Catch sequencer
//!
//! A linear state machine. Each step's entry action spawns the tweens and
//! sound commands for that step and schedules when the next step begins.
//! Tweens outlive the step that started them, which is how the spin keeps
//! turning while the coin is already on its way back.

use glam::Vec3;

use super::state::{CatchOutcome, SequencePhase};
use crate::audio::{AudioBackend, AudioCueScheduler, Cue};
use crate::config::{CatchTimings, LostTargetPolicy};
use crate::consts::*;
use crate::ledger::ScoreLedger;
use crate::navigation::Navigator;
use crate::persistence::KeyValueStore;
use crate::scene::{NodeKind, Scene, Transform};
use crate::targets::TrackableTarget;
use crate::tween::{Property, Tween};

/// Collaborators a step may touch
pub struct Stage<'a, B: AudioBackend> {
    pub scene: &'a mut Scene,
    pub audio: &'a mut AudioCueScheduler<B>,
    pub navigator: &'a mut dyn Navigator,
}

pub struct CatchSequencer {
    timings: CatchTimings,
    policy: LostTargetPolicy,
    phase: SequencePhase,
    /// Seconds since the accepted tap, frozen while paused
    clock: f32,
    /// Clock time at which the next step is entered
    next_at: f32,
    retract_started: f32,
    /// Clock time at which the success cue begins
    reward_onset: f32,
    tweens: Vec<Tween>,
    outcome: Option<CatchOutcome>,
    paused: bool,
    /// Accepted triggers so far; only ever grows
    started: u64,
}

impl CatchSequencer {
    pub fn new(timings: CatchTimings, policy: LostTargetPolicy) -> Self {
        Self {
            timings,
            policy,
            phase: SequencePhase::Idle,
            clock: 0.0,
            next_at: 0.0,
            retract_started: 0.0,
            reward_onset: 0.0,
            tweens: Vec::new(),
            outcome: None,
            paused: false,
            started: 0,
        }
    }

    pub fn phase(&self) -> SequencePhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase.is_idle()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Outcome of the sequence in flight (or the last one, until the next tap)
    pub fn outcome(&self) -> Option<&CatchOutcome> {
        self.outcome.as_ref()
    }

    pub fn sequences_started(&self) -> u64 {
        self.started
    }

    pub fn timings(&self) -> &CatchTimings {
        &self.timings
    }

    /// Accept a coin hit. Ignored unless Idle.
    ///
    /// The score is committed here, synchronously, before the first step runs.
    pub fn trigger<S: KeyValueStore, B: AudioBackend>(
        &mut self,
        target: &TrackableTarget,
        ledger: &mut ScoreLedger<S>,
        stage: &mut Stage<'_, B>,
    ) -> Option<&CatchOutcome> {
        if !self.is_idle() {
            log::debug!("Tap ignored, catch already {:?}", self.phase);
            return None;
        }

        self.outcome = Some(match ledger.add_points(&target.id, target.points) {
            Ok(added) => CatchOutcome {
                target_id: target.id.clone(),
                awarded: if added.already_claimed { 0 } else { target.points },
                total: added.total,
                repeated: added.already_claimed,
            },
            Err(e) => {
                log::error!("Catch of {} not recorded: {}", target.id, e);
                CatchOutcome {
                    target_id: target.id.clone(),
                    awarded: 0,
                    total: ledger.score(),
                    repeated: false,
                }
            }
        });

        self.started += 1;
        self.clock = 0.0;
        self.paused = false;
        self.tweens.clear();
        self.phase = SequencePhase::Aligning;
        self.enter(SequencePhase::Aligning, 0.0, stage);
        log::info!("Catch #{} started for {}", self.started, target.id);

        self.outcome.as_ref()
    }

    /// Advance the sequence clock by `dt` seconds, entering every step that
    /// came due, then pose the nodes for the new time.
    pub fn advance<B: AudioBackend>(&mut self, dt: f32, stage: &mut Stage<'_, B>) {
        if self.is_idle() || self.paused {
            return;
        }
        self.clock += dt.max(0.0);

        while !self.is_idle() && self.clock >= self.next_at {
            let at = self.next_at;
            let next = self.phase.next();
            self.phase = next;
            self.enter(next, at, stage);
        }

        let now = self.clock;
        for tween in &mut self.tweens {
            tween.apply(stage.scene, now);
        }
        self.tweens.retain(|t| !t.is_finished(now));
    }

    /// Tracking lost the target. What happens depends on the configured policy.
    pub fn on_target_lost<B: AudioBackend>(&mut self, stage: &mut Stage<'_, B>) {
        if self.is_idle() {
            return;
        }
        match self.policy {
            LostTargetPolicy::RunHeadless => {
                log::debug!("Target lost mid-catch, continuing off-screen");
            }
            LostTargetPolicy::Pause => {
                log::info!("Target lost mid-catch, pausing at {:?}", self.phase);
                // Cues run on the audio clock, which does not pause with us
                stage.audio.stop_all();
                self.paused = true;
            }
            LostTargetPolicy::Abort => {
                log::info!("Target lost mid-catch, aborting at {:?}", self.phase);
                stage.audio.stop_all();
                self.finish(stage.scene);
            }
        }
    }

    /// Tracking found the target again
    pub fn on_target_detected<B: AudioBackend>(&mut self, stage: &mut Stage<'_, B>) {
        if self.is_idle() {
            return;
        }
        // Lost took the reward text out of the scene along with the coin
        stage.scene.add(NodeKind::RewardText);
        if self.paused {
            log::info!("Target back, resuming {:?}", self.phase);
            self.paused = false;
            self.resume_cue(stage.audio);
        }
    }

    /// Restart the cue the current step owns, stopped when the pause began
    fn resume_cue<B: AudioBackend>(&self, audio: &mut AudioCueScheduler<B>) {
        match self.phase {
            SequencePhase::Spinning => audio.play_throw_cue(0.0),
            SequencePhase::GrowingReward => audio.play_success_cue(self.offset_to(self.reward_onset)),
            _ => {}
        }
    }

    /// Offset from the current clock to scheduled time `at`, for audio
    fn offset_to(&self, at: f32) -> f64 {
        (at - self.clock).max(0.0) as f64
    }

    fn enter<B: AudioBackend>(&mut self, phase: SequencePhase, at: f32, stage: &mut Stage<'_, B>) {
        let t = self.timings;
        log::debug!("Catch step {:?} at {:.2}s", phase, at);

        match phase {
            SequencePhase::Idle => self.finish(stage.scene),
            SequencePhase::Aligning => {
                if let Some(text) = stage.scene.transform_mut(NodeKind::RewardText) {
                    *text = Transform::reward_hidden();
                }
                stage.scene.add(NodeKind::RewardText);
                self.tweens.push(
                    Tween::to(NodeKind::Coin, Property::Rotation, Vec3::ZERO)
                        .timed(at, t.align_duration),
                );
                self.next_at = at + t.retract_delay;
            }
            SequencePhase::Retracting => {
                let rest_z = Transform::coin_rest().position.z;
                self.tweens.push(
                    Tween::to_z(NodeKind::Coin, Property::Position, rest_z + RETRACT_OFFSET_Z)
                        .timed(at, t.retract_duration),
                );
                self.retract_started = at;
                self.next_at = at + t.spin_lead_in;
            }
            SequencePhase::Spinning => {
                stage.audio.play_throw_cue(self.offset_to(at));
                self.tweens.push(
                    Tween::to_x(NodeKind::Coin, Property::Rotation, SPIN_ROTATION_X)
                        .timed(at, t.spin_duration),
                );
                self.next_at = (self.retract_started + t.retract_duration).max(at);
            }
            SequencePhase::Returning => {
                stage.audio.stop(Cue::Throw, self.offset_to(at));
                let rest_z = Transform::coin_rest().position.z;
                self.tweens.push(
                    Tween::to_z(NodeKind::Coin, Property::Position, rest_z)
                        .timed(at, t.return_duration),
                );
                self.next_at = at + t.return_duration;
            }
            SequencePhase::Revealing => {
                let onset = at + t.reveal_delay;
                self.tweens.push(
                    Tween::to(NodeKind::Coin, Property::Scale, Transform::coin_rest().scale)
                        .timed(onset, t.reveal_duration),
                );
                self.next_at = onset;
            }
            SequencePhase::GrowingReward => {
                let onset = at + t.reward_delay;
                self.reward_onset = onset;
                stage.audio.play_success_cue(self.offset_to(onset));
                self.tweens.push(
                    Tween::to(
                        NodeKind::RewardText,
                        Property::Scale,
                        Vec3::splat(REWARD_FULL_SCALE),
                    )
                    .timed(onset, t.reward_duration),
                );
                self.next_at = onset + t.reward_duration;
            }
            SequencePhase::Completed => {
                stage
                    .audio
                    .stop(Cue::Success, self.offset_to(at) + t.success_stop_grace as f64);
                if let Some(outcome) = &self.outcome {
                    log::info!(
                        "Catch complete: {} (+{}, total {}{})",
                        outcome.target_id,
                        outcome.awarded,
                        outcome.total,
                        if outcome.repeated { ", repeated" } else { "" }
                    );
                    stage.navigator.show_result(&outcome.target_id);
                }
                self.next_at = at + t.success_stop_grace;
            }
        }
    }

    /// Back to Idle: reward hidden, coin at rest, nothing scheduled
    fn finish(&mut self, scene: &mut Scene) {
        scene.remove(NodeKind::RewardText);
        if let Some(text) = scene.transform_mut(NodeKind::RewardText) {
            *text = Transform::reward_hidden();
        }
        if let Some(coin) = scene.transform_mut(NodeKind::Coin) {
            *coin = Transform::coin_rest();
        }
        self.tweens.clear();
        self.paused = false;
        self.phase = SequencePhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioCall, HeadlessAudio};
    use crate::navigation::{RecordingNavigator, Route};
    use crate::persistence::MemoryStore;
    use crate::scene::{AssetEvent, AssetKind};
    use crate::targets::default_targets;
    use crate::error::{GameError, Result};
    use proptest::prelude::*;

    #[derive(Default)]
    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(GameError::Storage("read-only".into()))
        }

        fn remove(&mut self, _key: &str) -> Result<()> {
            Err(GameError::Storage("read-only".into()))
        }
    }

    struct Rig {
        scene: Scene,
        audio: AudioCueScheduler<HeadlessAudio>,
        nav: RecordingNavigator,
        ledger: ScoreLedger<MemoryStore>,
        seq: CatchSequencer,
    }

    impl Rig {
        fn new(policy: LostTargetPolicy) -> Self {
            let mut scene = Scene::new(&default_targets()[2]);
            scene.on_asset(AssetEvent::Loaded(AssetKind::CoinModel));
            scene.on_asset(AssetEvent::Loaded(AssetKind::RewardText));
            scene.add(NodeKind::Coin);
            let mut audio = AudioCueScheduler::new(HeadlessAudio::new());
            audio.on_decoded(Cue::Success, ());
            audio.on_decoded(Cue::Throw, ());
            Self {
                scene,
                audio,
                nav: RecordingNavigator::default(),
                ledger: ScoreLedger::new(MemoryStore::new()),
                seq: CatchSequencer::new(CatchTimings::default(), policy),
            }
        }

        fn tap(&mut self) -> Option<CatchOutcome> {
            let target = default_targets()[2].clone();
            let mut stage = Stage {
                scene: &mut self.scene,
                audio: &mut self.audio,
                navigator: &mut self.nav,
            };
            self.seq
                .trigger(&target, &mut self.ledger, &mut stage)
                .cloned()
        }

        /// Run `seconds` in 60 Hz frames
        fn run(&mut self, seconds: f32) {
            let frames = (seconds * 60.0).round() as usize;
            for _ in 0..frames {
                self.audio.tick(1.0 / 60.0);
                let mut stage = Stage {
                    scene: &mut self.scene,
                    audio: &mut self.audio,
                    navigator: &mut self.nav,
                };
                self.seq.advance(1.0 / 60.0, &mut stage);
            }
        }

        fn lose(&mut self) {
            let mut stage = Stage {
                scene: &mut self.scene,
                audio: &mut self.audio,
                navigator: &mut self.nav,
            };
            self.seq.on_target_lost(&mut stage);
        }

        fn detect(&mut self) {
            let mut stage = Stage {
                scene: &mut self.scene,
                audio: &mut self.audio,
                navigator: &mut self.nav,
            };
            self.seq.on_target_detected(&mut stage);
        }

        fn last_start(&self, cue: Cue) -> Option<f64> {
            self.audio.backend().calls.iter().rev().find_map(|c| match *c {
                AudioCall::Start { cue: k, at } if k == cue => Some(at),
                _ => None,
            })
        }

        fn coin(&self) -> Transform {
            self.scene.transform(NodeKind::Coin).unwrap()
        }
    }

    #[test]
    fn test_full_sequence_phases_in_order() {
        let mut rig = Rig::new(LostTargetPolicy::RunHeadless);
        let outcome = rig.tap().unwrap();
        assert_eq!(outcome.total, 500);
        assert!(!outcome.repeated);
        assert_eq!(rig.ledger.score(), 500);
        assert_eq!(rig.seq.phase(), SequencePhase::Aligning);
        assert!(rig.scene.contains(NodeKind::RewardText));

        let checkpoints = [
            (0.4, SequencePhase::Aligning),
            (0.15, SequencePhase::Retracting),
            (0.1, SequencePhase::Spinning),
            (0.9, SequencePhase::Returning),
            (1.05, SequencePhase::Revealing),
            (0.5, SequencePhase::GrowingReward),
            (2.5, SequencePhase::Completed),
            (0.6, SequencePhase::Idle),
        ];
        for (dt, expected) in checkpoints {
            rig.run(dt);
            assert_eq!(rig.seq.phase(), expected, "after +{}s", dt);
        }

        assert_eq!(rig.nav.routes, vec![Route::Result("gold-coin".into())]);
        assert!(!rig.scene.contains(NodeKind::RewardText));
        assert_eq!(rig.coin(), Transform::coin_rest());
    }

    #[test]
    fn test_coin_motion_checkpoints() {
        let mut rig = Rig::new(LostTargetPolicy::RunHeadless);
        rig.tap();

        rig.run(0.5);
        assert!(rig.coin().rotation.length() < 1e-3, "aligned to face camera");

        rig.run(1.0);
        assert!((rig.coin().position.z - RETRACT_OFFSET_Z).abs() < 1e-3, "pulled back");

        rig.run(1.0);
        assert!(rig.coin().position.z.abs() < 1e-3, "returned");
        assert!(rig.coin().rotation.x > 6.0 * std::f32::consts::PI, "still spinning");

        rig.run(3.0);
        let text = rig.scene.transform(NodeKind::RewardText).unwrap();
        assert!((text.scale.x - REWARD_FULL_SCALE).abs() < 1e-6, "reward grown");
    }

    #[test]
    fn test_audio_cue_timing() {
        let mut rig = Rig::new(LostTargetPolicy::RunHeadless);
        rig.tap();
        rig.run(7.0);

        let calls = &rig.audio.backend().calls;
        let find = |want: fn(&AudioCall) -> bool| calls.iter().find(|c| want(c)).copied();

        let throw_start = find(|c| matches!(c, AudioCall::Start { cue: Cue::Throw, .. })).unwrap();
        let throw_stop = find(|c| matches!(c, AudioCall::Stop { cue: Cue::Throw, .. })).unwrap();
        let success_start = find(|c| matches!(c, AudioCall::Start { cue: Cue::Success, .. })).unwrap();
        let success_stop = find(|c| matches!(c, AudioCall::Stop { cue: Cue::Success, .. })).unwrap();

        let at = |c: AudioCall| match c {
            AudioCall::Start { at, .. } | AudioCall::Stop { at, .. } => at,
        };
        // One frame of slack: steps are entered on the frame after they fall due
        let near = |got: f64, want: f64| (got - want).abs() < 0.02;
        assert!(near(at(throw_start), 0.6), "throw start {}", at(throw_start));
        assert!(near(at(throw_stop), 1.5), "throw stop {}", at(throw_stop));
        assert!(near(at(success_start), 3.5), "success start {}", at(success_start));
        assert!(near(at(success_stop), 6.0), "success stop {}", at(success_stop));
        assert_eq!(rig.audio.backend().starts(Cue::Success), 1);
    }

    #[test]
    fn test_taps_during_sequence_are_ignored() {
        let mut rig = Rig::new(LostTargetPolicy::RunHeadless);
        assert!(rig.tap().is_some());
        for _ in 0..10 {
            rig.run(0.5);
            assert!(rig.tap().is_none());
        }
        rig.run(1.5);
        assert!(rig.seq.is_idle());
        assert_eq!(rig.seq.sequences_started(), 1);
        assert_eq!(rig.nav.routes.len(), 1);
    }

    #[test]
    fn test_repeat_catch_after_completion() {
        let mut rig = Rig::new(LostTargetPolicy::RunHeadless);
        rig.tap();
        rig.run(7.0);
        let again = rig.tap().unwrap();
        assert!(again.repeated);
        assert_eq!(again.awarded, 0);
        assert_eq!(again.total, 500);
        assert_eq!(rig.seq.sequences_started(), 2);
    }

    #[test]
    fn test_headless_policy_completes_while_lost() {
        let mut rig = Rig::new(LostTargetPolicy::RunHeadless);
        rig.tap();
        rig.run(1.0);
        rig.scene.remove(NodeKind::Coin);
        rig.lose();
        rig.run(6.0);
        assert!(rig.seq.is_idle());
        assert_eq!(rig.nav.routes.len(), 1);
    }

    #[test]
    fn test_pause_policy_freezes_until_detected() {
        let mut rig = Rig::new(LostTargetPolicy::Pause);
        rig.tap();
        rig.run(1.0);
        let phase = rig.seq.phase();
        rig.lose();
        assert!(rig.seq.is_paused());
        rig.run(10.0);
        assert_eq!(rig.seq.phase(), phase);
        assert!(rig.nav.routes.is_empty());

        rig.detect();
        assert!(!rig.seq.is_paused());
        assert!(rig.scene.contains(NodeKind::RewardText));
        rig.run(6.0);
        assert!(rig.seq.is_idle());
        assert_eq!(rig.nav.routes.len(), 1);
    }

    #[test]
    fn test_pause_silences_and_resumes_throw_cue() {
        let mut rig = Rig::new(LostTargetPolicy::Pause);
        rig.tap();
        rig.run(1.0);
        assert_eq!(rig.seq.phase(), SequencePhase::Spinning);
        assert_eq!(rig.audio.backend().starts(Cue::Throw), 1);

        rig.lose();
        assert_eq!(rig.audio.backend().stops(Cue::Throw), 1);
        rig.run(10.0);
        assert_eq!(rig.audio.backend().starts(Cue::Throw), 1);

        rig.detect();
        assert_eq!(rig.audio.backend().starts(Cue::Throw), 2);
        let now = rig.audio.backend().now();
        assert!((rig.last_start(Cue::Throw).unwrap() - now).abs() < 1e-9);

        rig.run(1.0);
        assert_eq!(rig.audio.backend().stops(Cue::Throw), 2);
    }

    #[test]
    fn test_pause_before_reward_onset_reschedules_success_cue() {
        let mut rig = Rig::new(LostTargetPolicy::Pause);
        rig.tap();
        // GrowingReward begins at 3.0, its cue at 3.5
        rig.run(3.2);
        assert_eq!(rig.seq.phase(), SequencePhase::GrowingReward);
        assert_eq!(rig.audio.backend().starts(Cue::Success), 1);

        rig.lose();
        assert!(rig.audio.backend().stops(Cue::Success) >= 1);
        rig.run(5.0);

        rig.detect();
        assert_eq!(rig.audio.backend().starts(Cue::Success), 2);
        let now = rig.audio.backend().now();
        let remaining = rig.last_start(Cue::Success).unwrap() - now;
        assert!(remaining > 0.2 && remaining < 0.4, "remaining {}", remaining);
    }

    #[test]
    fn test_unrecorded_catch_still_plays() {
        let mut rig = Rig::new(LostTargetPolicy::RunHeadless);
        let mut ledger = ScoreLedger::new(ReadOnlyStore::default());
        let target = default_targets()[2].clone();
        {
            let mut stage = Stage {
                scene: &mut rig.scene,
                audio: &mut rig.audio,
                navigator: &mut rig.nav,
            };
            let outcome = rig.seq.trigger(&target, &mut ledger, &mut stage).unwrap();
            assert_eq!(outcome.awarded, 0);
            assert_eq!(outcome.total, 0);
            assert!(!outcome.repeated);
        }
        assert!(!ledger.is_claimed("gold-coin"));

        rig.run(7.0);
        assert!(rig.seq.is_idle());
        assert_eq!(rig.nav.routes.len(), 1);
    }

    #[test]
    fn test_abort_policy_resets_but_keeps_score() {
        let mut rig = Rig::new(LostTargetPolicy::Abort);
        rig.tap();
        rig.run(2.0);
        rig.lose();
        assert!(rig.seq.is_idle());
        assert_eq!(rig.coin(), Transform::coin_rest());
        assert!(rig.nav.routes.is_empty());
        assert_eq!(rig.ledger.score(), 500);
        assert!(rig.audio.backend().stops(Cue::Success) >= 1);
    }

    #[test]
    fn test_missing_reward_text_degrades_gracefully() {
        let mut scene = Scene::new(&default_targets()[0]);
        scene.on_asset(AssetEvent::Loaded(AssetKind::CoinModel));
        let mut rig = Rig::new(LostTargetPolicy::RunHeadless);
        rig.scene = scene;
        rig.tap();
        rig.run(7.0);
        assert!(rig.seq.is_idle());
        assert_eq!(rig.nav.routes.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_one_sequence_per_idle_window(gaps in prop::collection::vec(0.0f32..1.5, 1..20)) {
            let mut rig = Rig::new(LostTargetPolicy::RunHeadless);
            let mut accepted = 0u64;
            for gap in gaps {
                let was_idle = rig.seq.is_idle();
                let result = rig.tap();
                prop_assert_eq!(result.is_some(), was_idle);
                if result.is_some() {
                    accepted += 1;
                }
                rig.run(gap);
            }
            prop_assert_eq!(rig.seq.sequences_started(), accepted);
            prop_assert_eq!(rig.ledger.score(), 500);
        }
    }
}
