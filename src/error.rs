//! Crate error type
//!
//! Every failure in this game is terminal for the operation that hit it but
//! never for the game itself. Callers log and carry on.

/// Result alias carrying [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The tracking engine rejected session start
    #[error("tracking session failed to start: {0}")]
    TrackingInit(String),
    /// A model, texture or sound could not be fetched or decoded
    #[error("failed to load asset `{asset}`: {reason}")]
    AssetLoad { asset: String, reason: String },
    /// The key-value store refused a read or write
    #[error("storage error: {0}")]
    Storage(String),
    #[error("audio error: {0}")]
    Audio(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// The requested target id is not in the target table
    #[error("unknown target `{0}`")]
    UnknownTarget(String),
    /// A configured target id collides with a key the game stores itself
    #[error("target id `{0}` is a reserved storage key")]
    ReservedTargetId(String),
    #[error("render error: {0}")]
    Render(String),
}

impl GameError {
    pub fn asset(asset: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AssetLoad {
            asset: asset.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl GameError {
    /// Describe a JS exception in a form that survives logging
    pub fn js_reason(value: &wasm_bindgen::JsValue) -> String {
        value
            .as_string()
            .or_else(|| {
                js_sys::JSON::stringify(value)
                    .ok()
                    .and_then(|s| s.as_string())
            })
            .unwrap_or_else(|| format!("{:?}", value))
    }
}
