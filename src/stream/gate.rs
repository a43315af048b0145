//! Voice activity gate.
//!
//! Classifies the trailing portion of the window as speech or silence using
//! short-term energy plus zero-crossing rate, and turns sustained silence
//! into utterance boundaries that force-promote the live suffix. The gate
//! never raises hard errors: absence of a confident signal defaults to
//! speech, so an uncertain tail can't truncate an utterance prematurely.

use crate::clock::{Clock, SystemClock};
use crate::config::VadConfig;
use crate::stream::window::{calculate_rms, zero_crossing_rate};
use std::time::Instant;

/// Tail classification for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Speech,
    Silence,
}

/// Gate output per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    /// Speech in the tail (or gate disabled / no confident signal).
    Speech,
    /// Silence, but the hold has not elapsed yet.
    Silence,
    /// Silence sustained past the hold: an utterance boundary.
    Boundary,
}

/// Adaptive ambient-noise state for threshold adjustment.
#[derive(Debug)]
struct AutoLevel {
    /// Running average of ambient noise level.
    ambient_level: f32,
    /// Smoothing factor for ambient level (0-1, higher = more smoothing).
    smoothing: f32,
    /// Minimum threshold (never go below this).
    min_threshold: f32,
    /// Multiplier above ambient to set threshold.
    threshold_multiplier: f32,
    /// Number of observations processed.
    sample_count: u64,
}

impl AutoLevel {
    fn new(min_threshold: f32) -> Self {
        Self {
            ambient_level: 0.01,
            smoothing: 0.95,
            min_threshold,
            threshold_multiplier: 2.5,
            sample_count: 0,
        }
    }

    /// Update ambient level from a frame and return the adjusted threshold.
    fn update(&mut self, level: f32, is_speech: bool) -> f32 {
        self.sample_count += 1;

        // Only update ambient level during non-speech periods
        if !is_speech && self.sample_count > 10 {
            let alpha = if self.sample_count < 100 {
                0.1 // Learn faster initially
            } else {
                1.0 - self.smoothing
            };
            self.ambient_level = self.ambient_level * (1.0 - alpha) + level * alpha;
        }

        (self.ambient_level * self.threshold_multiplier).max(self.min_threshold)
    }

    fn ambient(&self) -> f32 {
        self.ambient_level
    }
}

/// Voice activity gate with silence-hold boundary detection.
pub struct VoiceGate<C: Clock = SystemClock> {
    config: VadConfig,
    threshold: f32,
    speech_active: bool,
    silence_start: Option<Instant>,
    boundary_sent: bool,
    auto_level: Option<AutoLevel>,
    clock: C,
}

impl<C: Clock> VoiceGate<C> {
    /// Creates a gate with the given configuration and clock.
    pub fn with_clock(config: VadConfig, clock: C) -> Self {
        let auto_level = config
            .auto_level
            .then(|| AutoLevel::new(config.energy_threshold));
        Self {
            threshold: config.energy_threshold,
            config,
            speech_active: false,
            silence_start: None,
            boundary_sent: false,
            auto_level,
            clock,
        }
    }

    /// Classifies a window tail as speech or silence.
    ///
    /// A tail too short to measure classifies as speech (fail open).
    pub fn classify(&self, tail: &[f32]) -> GateDecision {
        if tail.is_empty() {
            return GateDecision::Speech;
        }

        let rms = calculate_rms(tail);
        let zcr = zero_crossing_rate(tail);

        // Low-energy but high-ZCR tails are unvoiced consonants, not silence
        if rms > self.threshold || (rms > self.threshold * 0.25 && zcr > self.config.zcr_threshold)
        {
            GateDecision::Speech
        } else {
            GateDecision::Silence
        }
    }

    /// Observes the window tail for this tick and reports the gate event.
    ///
    /// Returns `Boundary` exactly once per sustained silence: the hold timer
    /// starts at the first silent tick after speech and fires when
    /// `hold_ms` has elapsed.
    pub fn observe(&mut self, tail: &[f32]) -> GateEvent {
        if !self.config.enabled {
            return GateEvent::Speech;
        }

        let decision = self.classify(tail);

        if let Some(ref mut auto_level) = self.auto_level {
            let level = calculate_rms(tail);
            self.threshold = auto_level.update(level, decision == GateDecision::Speech);
        }

        match decision {
            GateDecision::Speech => {
                self.speech_active = true;
                self.silence_start = None;
                self.boundary_sent = false;
                GateEvent::Speech
            }
            GateDecision::Silence => {
                if !self.speech_active {
                    // Nothing to bound yet
                    return GateEvent::Silence;
                }

                let now = self.clock.now();
                let start = *self.silence_start.get_or_insert(now);
                let elapsed_ms = now.duration_since(start).as_millis() as u32;

                if elapsed_ms >= self.config.hold_ms && !self.boundary_sent {
                    self.boundary_sent = true;
                    self.speech_active = false;
                    self.silence_start = None;
                    GateEvent::Boundary
                } else {
                    GateEvent::Silence
                }
            }
        }
    }

    /// True while the gate considers an utterance in progress.
    pub fn is_speech_active(&self) -> bool {
        self.speech_active
    }

    /// The effective energy threshold (adapted when auto-level is on).
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Current ambient noise estimate, if auto-level is enabled.
    pub fn ambient(&self) -> Option<f32> {
        self.auto_level.as_ref().map(|al| al.ambient())
    }

    /// Resets the gate state.
    pub fn reset(&mut self) {
        self.speech_active = false;
        self.silence_start = None;
        self.boundary_sent = false;
        self.threshold = self.config.energy_threshold;
        if let Some(ref mut al) = self.auto_level {
            *al = AutoLevel::new(self.config.energy_threshold);
        }
    }
}

impl VoiceGate<SystemClock> {
    /// Creates a gate with the given configuration using the system clock.
    pub fn new(config: VadConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use std::time::Duration;

    fn config() -> VadConfig {
        VadConfig {
            auto_level: false,
            ..VadConfig::default()
        }
    }

    fn speech(count: usize) -> Vec<f32> {
        // Alternate to keep RMS high without a DC offset
        (0..count)
            .map(|i| if i % 2 == 0 { 0.3 } else { -0.3 })
            .collect()
    }

    fn silence(count: usize) -> Vec<f32> {
        vec![0.0; count]
    }

    #[test]
    fn test_classify_speech_and_silence() {
        let gate = VoiceGate::new(config());
        assert_eq!(gate.classify(&speech(1000)), GateDecision::Speech);
        assert_eq!(gate.classify(&silence(1000)), GateDecision::Silence);
    }

    #[test]
    fn test_classify_empty_tail_fails_open() {
        let gate = VoiceGate::new(config());
        assert_eq!(gate.classify(&[]), GateDecision::Speech);
    }

    #[test]
    fn test_classify_unvoiced_fricative_fails_open() {
        // Low energy, high zero-crossing rate: amplitude just above a
        // quarter of the 0.02 threshold, alternating every sample.
        let tail: Vec<f32> = (0..1000)
            .map(|i| if i % 2 == 0 { 0.008 } else { -0.008 })
            .collect();
        let gate = VoiceGate::new(config());
        assert_eq!(gate.classify(&tail), GateDecision::Speech);
    }

    #[test]
    fn test_boundary_fires_after_hold() {
        let clock = MockClock::new();
        let mut gate = VoiceGate::with_clock(config(), clock.clone());

        assert_eq!(gate.observe(&speech(1000)), GateEvent::Speech);
        assert!(gate.is_speech_active());

        // First silent tick starts the hold
        assert_eq!(gate.observe(&silence(1000)), GateEvent::Silence);

        clock.advance(Duration::from_millis(900));
        assert_eq!(gate.observe(&silence(1000)), GateEvent::Boundary);
        assert!(!gate.is_speech_active());
    }

    #[test]
    fn test_boundary_fires_once_per_silence() {
        let clock = MockClock::new();
        let mut gate = VoiceGate::with_clock(config(), clock.clone());

        gate.observe(&speech(1000));
        gate.observe(&silence(1000));
        clock.advance(Duration::from_millis(900));
        assert_eq!(gate.observe(&silence(1000)), GateEvent::Boundary);

        // Continued silence never re-fires
        clock.advance(Duration::from_millis(900));
        assert_eq!(gate.observe(&silence(1000)), GateEvent::Silence);
    }

    #[test]
    fn test_speech_resumption_cancels_hold() {
        let clock = MockClock::new();
        let mut gate = VoiceGate::with_clock(config(), clock.clone());

        gate.observe(&speech(1000));
        gate.observe(&silence(1000));
        clock.advance(Duration::from_millis(500));

        // Speech resumes before the hold elapses
        assert_eq!(gate.observe(&speech(1000)), GateEvent::Speech);

        // A new silence needs the full hold again
        gate.observe(&silence(1000));
        clock.advance(Duration::from_millis(500));
        assert_eq!(gate.observe(&silence(1000)), GateEvent::Silence);
        clock.advance(Duration::from_millis(400));
        assert_eq!(gate.observe(&silence(1000)), GateEvent::Boundary);
    }

    #[test]
    fn test_no_boundary_without_prior_speech() {
        let clock = MockClock::new();
        let mut gate = VoiceGate::with_clock(config(), clock.clone());

        for _ in 0..5 {
            clock.advance(Duration::from_millis(1000));
            assert_eq!(gate.observe(&silence(1000)), GateEvent::Silence);
        }
    }

    #[test]
    fn test_disabled_gate_always_speech() {
        let mut gate = VoiceGate::new(VadConfig {
            enabled: false,
            ..config()
        });

        assert_eq!(gate.observe(&silence(1000)), GateEvent::Speech);
        assert_eq!(gate.observe(&speech(1000)), GateEvent::Speech);
    }

    #[test]
    fn test_boundary_can_refire_after_new_utterance() {
        let clock = MockClock::new();
        let mut gate = VoiceGate::with_clock(config(), clock.clone());

        gate.observe(&speech(1000));
        gate.observe(&silence(1000));
        clock.advance(Duration::from_millis(900));
        assert_eq!(gate.observe(&silence(1000)), GateEvent::Boundary);

        // New utterance, new boundary
        gate.observe(&speech(1000));
        gate.observe(&silence(1000));
        clock.advance(Duration::from_millis(900));
        assert_eq!(gate.observe(&silence(1000)), GateEvent::Boundary);
    }

    #[test]
    fn test_reset() {
        let mut gate = VoiceGate::new(config());
        gate.observe(&speech(1000));
        assert!(gate.is_speech_active());

        gate.reset();
        assert!(!gate.is_speech_active());
    }

    #[test]
    fn test_auto_level_tracks_ambient() {
        let mut al = AutoLevel::new(0.01);

        for _ in 0..50 {
            al.update(0.005, false);
        }
        assert!(al.ambient() < 0.01);

        let threshold = al.update(0.005, false);
        assert!(threshold > al.ambient());
    }

    #[test]
    fn test_auto_level_ignores_speech() {
        let mut al = AutoLevel::new(0.01);

        for _ in 0..50 {
            al.update(0.01, false);
        }
        let baseline = al.ambient();

        for _ in 0..20 {
            al.update(0.5, true);
        }
        assert!((al.ambient() - baseline).abs() < 0.01);
    }

    #[test]
    fn test_gate_with_auto_level_adapts_threshold() {
        let mut gate = VoiceGate::new(VadConfig {
            auto_level: true,
            ..VadConfig::default()
        });

        let noisy: Vec<f32> = (0..1000)
            .map(|i| if i % 2 == 0 { 0.05 } else { -0.05 })
            .collect();
        for _ in 0..200 {
            gate.observe(&noisy);
        }

        // Ambient tracking is active and reported
        assert!(gate.ambient().is_some());
        assert!(gate.threshold() >= 0.02);
    }
}
