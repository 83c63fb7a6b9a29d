//! Web Audio backend
//!
//! Sampled cues played through a shared gain node. A fresh buffer source is
//! created for every start since Web Audio sources are single-use.

use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AudioBuffer, AudioBufferSourceNode, AudioContext, GainNode, Response};

use super::{AudioBackend, Cue};
use crate::error::{GameError, Result};

/// Audio device for the browser build
pub struct WebAudio {
    ctx: Option<AudioContext>,
    gain: Option<GainNode>,
    buffers: [Option<AudioBuffer>; 2],
    playing: [Option<AudioBufferSourceNode>; 2],
}

impl Default for WebAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl WebAudio {
    pub fn new() -> Self {
        // Try to create audio context (may fail if not in secure context)
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        let gain = ctx.as_ref().and_then(|ctx| {
            let gain = ctx.create_gain().ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;
            Some(gain)
        });
        Self {
            ctx,
            gain,
            buffers: [None, None],
            playing: [None, None],
        }
    }

    /// Handle for decoding outside of any borrow of the game
    pub fn context(&self) -> Option<AudioContext> {
        self.ctx.clone()
    }

    /// Resume audio context (required after user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }
}

impl AudioBackend for WebAudio {
    type Buffer = AudioBuffer;

    fn now(&self) -> f64 {
        self.ctx.as_ref().map(|c| c.current_time()).unwrap_or(0.0)
    }

    fn install(&mut self, cue: Cue, buffer: AudioBuffer) {
        self.buffers[cue.index()] = Some(buffer);
    }

    fn start(&mut self, cue: Cue, at: f64) {
        let (Some(ctx), Some(gain)) = (&self.ctx, &self.gain) else {
            return;
        };
        let Some(buffer) = &self.buffers[cue.index()] else {
            return;
        };

        // Resume context if suspended (browsers require user gesture)
        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        let Ok(source) = ctx.create_buffer_source() else {
            log::warn!("Could not create source for {:?}", cue);
            return;
        };
        source.set_buffer(Some(buffer));
        if source.connect_with_audio_node(gain).is_err() {
            return;
        }
        if let Err(e) = source.start_with_when(at) {
            log::warn!("Sound {:?} failed to start: {}", cue, GameError::js_reason(&e));
            return;
        }
        if let Some(previous) = self.playing[cue.index()].replace(source) {
            previous.stop().ok();
        }
    }

    fn stop(&mut self, cue: Cue, at: f64) {
        if let Some(source) = self.playing[cue.index()].take() {
            source.stop_with_when(at).ok();
        }
    }

    fn set_gain(&mut self, gain: f32) {
        if let Some(node) = &self.gain {
            node.gain().set_value(gain);
        }
    }
}

/// Fetch an encoded sound over HTTP and decode it with `ctx`
pub async fn fetch_and_decode(ctx: AudioContext, url: String) -> Result<AudioBuffer> {
    let js_err = |e: wasm_bindgen::JsValue| GameError::asset(url.as_str(), GameError::js_reason(&e));

    let window = web_sys::window().ok_or_else(|| GameError::asset(url.as_str(), "no window"))?;
    let response: Response = JsFuture::from(window.fetch_with_str(&url))
        .await
        .map_err(js_err)?
        .dyn_into()
        .map_err(js_err)?;
    if !response.ok() {
        return Err(GameError::asset(
            url.as_str(),
            format!("HTTP {}", response.status()),
        ));
    }

    let bytes = JsFuture::from(response.array_buffer().map_err(js_err)?)
        .await
        .map_err(js_err)?
        .dyn_into::<js_sys::ArrayBuffer>()
        .map_err(js_err)?;
    let decoded = JsFuture::from(ctx.decode_audio_data(&bytes).map_err(js_err)?)
        .await
        .map_err(js_err)?;
    decoded.dyn_into::<AudioBuffer>().map_err(js_err)
}
