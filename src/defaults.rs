//! Default configuration constants for lingostream.
//!
//! This module provides shared constants used across different configuration
//! types to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default sliding-window duration in seconds.
///
/// The transcription engine re-infers this trailing span of audio on every
/// tick. 15s keeps enough left context for the engine to settle on a stable
/// prefix without growing per-tick inference cost unboundedly.
pub const WINDOW_SECONDS: u32 = 15;

/// Default tick interval in milliseconds.
///
/// Each tick snapshots the window and submits it for transcription. 400ms
/// keeps perceived latency in the hundreds-of-milliseconds range while
/// leaving headroom for inference on modest hardware.
pub const STEP_MS: u64 = 400;

/// Default stability-streak threshold (K).
///
/// A live suffix is promoted to committed once its prefix has survived K
/// consecutive ticks without shrinking. Higher values trade latency for
/// fewer premature commits.
pub const STABILITY_STREAK: u32 = 3;

/// Default debounce interval for live-suffix translation in milliseconds.
///
/// Volatile suffix text is translated at most this often to bound the rate
/// of expensive translation calls on text that may still change.
pub const TRANSLATION_DEBOUNCE_MS: u64 = 1000;

/// Minimum character growth before a live suffix is re-translated.
///
/// Suffix changes smaller than this within a debounce window are considered
/// trivial and skipped.
pub const TRANSLATION_MIN_GROWTH: usize = 4;

/// Default Voice Activity Detection (VAD) energy threshold.
///
/// This RMS-based threshold (0.0 to 1.0) determines when the window tail is
/// considered speech. A value of 0.02 is tuned for typical microphone input
/// levels and provides good sensitivity while filtering background noise.
pub const VAD_THRESHOLD: f32 = 0.02;

/// Default VAD tail duration in milliseconds.
///
/// The gate classifies only this trailing portion of the window each tick.
pub const VAD_TAIL_MS: u32 = 400;

/// Default silence hold in milliseconds before an utterance boundary fires.
///
/// 800ms allows for natural pauses in speech without prematurely splitting
/// an utterance.
pub const VAD_HOLD_MS: u32 = 800;

/// Default zero-crossing rate above which a low-energy tail still counts as
/// speech (unvoiced fricatives carry little energy but cross zero often).
pub const VAD_ZCR_THRESHOLD: f32 = 0.35;

/// Default source language for transcription.
///
/// "auto" lets the engine detect the spoken language automatically.
/// Set to a specific code (e.g., "en", "de") to force a language.
pub const DEFAULT_SOURCE_LANGUAGE: &str = "auto";

/// Language value that triggers automatic language detection.
pub const AUTO_LANGUAGE: &str = "auto";

/// Minimum RMS energy for a window snapshot to be worth transcribing.
///
/// Snapshots below this are silence/ambient noise — skip the engine
/// entirely. The VAD speech threshold is 0.02; this is set 20× lower to
/// only reject truly silent windows while allowing anything borderline.
pub const MIN_TICK_ENERGY: f32 = 0.001;

/// Number of consecutive transient transcription failures that escalates to
/// a fatal pipeline error.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Default shutdown timeout in milliseconds.
///
/// How long `stop()` waits for an in-flight transcription call before
/// detaching it.
pub const SHUTDOWN_TIMEOUT_MS: u64 = 2000;

/// Default capacity of the outbound event channel.
pub const EVENT_BUFFER: usize = 256;

/// Default capacity of the inbound audio frame channel.
pub const FRAME_BUFFER: usize = 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_holds_whole_ticks() {
        // The window must span many ticks, or the stabilizer never sees a
        // repeated prefix.
        let window_ms = WINDOW_SECONDS as u64 * 1000;
        assert!(window_ms / STEP_MS >= 10);
    }

    #[test]
    fn energy_floor_below_vad_threshold() {
        assert!(MIN_TICK_ENERGY < VAD_THRESHOLD);
    }
}
