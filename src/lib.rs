//! lingostream - Realtime streaming transcription and translation
//!
//! Turns a continuous microphone audio stream into incrementally-updated,
//! low-latency transcription and translation text. The engines recompute
//! from scratch on a sliding window; the stabilizer reconciles their noisy
//! output into a stable `partial`/`final` event stream with bounded churn.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod clock;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod stream;

// Core traits (audio → transcript → translation)
pub use engine::{Transcriber, Translator};

// Session surface
pub use stream::{
    AudioFrame, MetricsSnapshot, Segment, SessionHandle, SessionState, StreamEvent,
    StreamingSession, TranscriptState,
};

// Error handling
pub use error::{LingoError, Result};

// Config
pub use config::StreamConfig;

// Time source (for deterministic tests against the gate and scheduler)
pub use clock::{Clock, MockClock, SystemClock};

/// Build version string with optional git commit hash.
///
/// Returns `"0.3.1+abc1234"` when git hash is available, `"0.3.1"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
