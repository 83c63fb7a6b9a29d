//! Audio cue scheduling
//!
//! Two sampled cues accompany a catch: the throw whoosh while the coin spins
//! and the success jingle while the reward grows. Both are fetched and
//! decoded once at startup. The scheduler only forwards playback for cues
//! whose decode has completed; anything earlier is silently dropped.

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::{WebAudio, fetch_and_decode};

use crate::error::GameError;

/// Sound cue types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    /// Reward reveal jingle
    Success,
    /// Coin spinning away
    Throw,
}

impl Cue {
    pub const ALL: [Cue; 2] = [Cue::Success, Cue::Throw];

    fn index(self) -> usize {
        match self {
            Cue::Success => 0,
            Cue::Throw => 1,
        }
    }
}

/// Playback device. Times are in the device's own clock (seconds).
pub trait AudioBackend {
    /// Decoded sample data
    type Buffer;

    /// Current time on the audio clock
    fn now(&self) -> f64;
    /// Take ownership of a decoded buffer for `cue`
    fn install(&mut self, cue: Cue, buffer: Self::Buffer);
    fn start(&mut self, cue: Cue, at: f64);
    fn stop(&mut self, cue: Cue, at: f64);
    /// Output gain for everything, including cues already sounding
    fn set_gain(&mut self, gain: f32);
    /// Advance a clock the backend drives itself. Hardware clocks ignore this.
    fn tick(&mut self, _dt: f64) {}
}

/// Decode-aware front end for the two catch cues
pub struct AudioCueScheduler<B: AudioBackend> {
    backend: B,
    decoded: [bool; 2],
    volume: f32,
}

impl<B: AudioBackend> AudioCueScheduler<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            decoded: [false; 2],
            volume: 1.0,
        }
    }

    /// Decode finished for `cue`; playback requests are honoured from now on
    pub fn on_decoded(&mut self, cue: Cue, buffer: B::Buffer) {
        self.backend.install(cue, buffer);
        self.decoded[cue.index()] = true;
        log::info!("Sound {:?} ready", cue);
    }

    /// Decode failed; the cue stays silent for the rest of the session
    pub fn on_decode_failed(&mut self, cue: Cue, err: &GameError) {
        log::warn!("Sound {:?} unavailable: {}", cue, err);
    }

    pub fn is_ready(&self, cue: Cue) -> bool {
        self.decoded[cue.index()]
    }

    /// Set playback gain (0.0 - 1.0), effective immediately
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.backend.set_gain(self.volume);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn play_success_cue(&mut self, offset: f64) {
        self.play(Cue::Success, offset);
    }

    pub fn play_throw_cue(&mut self, offset: f64) {
        self.play(Cue::Throw, offset);
    }

    /// Stop `cue` at `offset` seconds from now
    pub fn stop(&mut self, cue: Cue, offset: f64) {
        if !self.is_ready(cue) {
            return;
        }
        let at = self.backend.now() + offset.max(0.0);
        self.backend.stop(cue, at);
    }

    pub fn stop_all(&mut self) {
        for cue in Cue::ALL {
            self.stop(cue, 0.0);
        }
    }

    pub fn tick(&mut self, dt: f64) {
        self.backend.tick(dt);
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn play(&mut self, cue: Cue, offset: f64) {
        if !self.is_ready(cue) {
            log::debug!("Sound {:?} requested before decode, skipped", cue);
            return;
        }
        if self.volume <= 0.0 {
            return;
        }
        let at = self.backend.now() + offset.max(0.0);
        self.backend.start(cue, at);
    }
}

/// One playback command seen by [`HeadlessAudio`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioCall {
    Start { cue: Cue, at: f64 },
    Stop { cue: Cue, at: f64 },
}

/// Backend without a device: keeps its own clock and records commands.
/// Used by the native build and by tests.
#[derive(Debug, Default)]
pub struct HeadlessAudio {
    clock: f64,
    pub calls: Vec<AudioCall>,
    /// Last gain set, if any
    pub gain: Option<f32>,
}

impl HeadlessAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starts(&self, cue: Cue) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, AudioCall::Start { cue: k, .. } if *k == cue))
            .count()
    }

    pub fn stops(&self, cue: Cue) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, AudioCall::Stop { cue: k, .. } if *k == cue))
            .count()
    }
}

impl AudioBackend for HeadlessAudio {
    type Buffer = ();

    fn now(&self) -> f64 {
        self.clock
    }

    fn install(&mut self, _cue: Cue, _buffer: ()) {}

    fn start(&mut self, cue: Cue, at: f64) {
        self.calls.push(AudioCall::Start { cue, at });
    }

    fn stop(&mut self, cue: Cue, at: f64) {
        self.calls.push(AudioCall::Stop { cue, at });
    }

    fn tick(&mut self, dt: f64) {
        self.clock += dt;
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = Some(gain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_before_decode_is_noop() {
        let mut audio = AudioCueScheduler::new(HeadlessAudio::new());
        audio.play_success_cue(0.0);
        audio.play_throw_cue(0.1);
        audio.stop(Cue::Throw, 0.0);
        assert!(audio.backend().calls.is_empty());
    }

    #[test]
    fn test_offsets_are_relative_to_audio_clock() {
        let mut audio = AudioCueScheduler::new(HeadlessAudio::new());
        audio.on_decoded(Cue::Throw, ());
        audio.tick(2.0);
        audio.play_throw_cue(0.1);
        audio.stop(Cue::Throw, 0.5);

        let calls = &audio.backend().calls;
        assert_eq!(calls.len(), 2);
        match calls[0] {
            AudioCall::Start { cue, at } => {
                assert_eq!(cue, Cue::Throw);
                assert!((at - 2.1).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(calls[1], AudioCall::Stop { at, .. } if (at - 2.5).abs() < 1e-9));
    }

    #[test]
    fn test_decode_failure_keeps_cue_silent() {
        let mut audio = AudioCueScheduler::new(HeadlessAudio::new());
        audio.on_decode_failed(Cue::Success, &GameError::Audio("bad mp3".into()));
        audio.play_success_cue(0.0);
        assert!(!audio.is_ready(Cue::Success));
        assert_eq!(audio.backend().starts(Cue::Success), 0);
    }

    #[test]
    fn test_muted_volume_skips_start() {
        let mut audio = AudioCueScheduler::new(HeadlessAudio::new());
        audio.on_decoded(Cue::Success, ());
        audio.set_volume(0.0);
        audio.play_success_cue(0.0);
        assert_eq!(audio.backend().starts(Cue::Success), 0);
    }

    #[test]
    fn test_volume_reaches_backend_gain() {
        let mut audio = AudioCueScheduler::new(HeadlessAudio::new());
        audio.set_volume(1.7);
        assert_eq!(audio.backend().gain, Some(1.0));
        audio.set_volume(0.25);
        assert_eq!(audio.backend().gain, Some(0.25));
        assert_eq!(audio.volume(), 0.25);
    }
}
