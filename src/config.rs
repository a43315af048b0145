use crate::defaults;
use crate::error::{LingoError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration for a streaming session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    /// Target language for translation (BCP-47 / ISO 639 code). Required:
    /// validation rejects an empty value.
    pub target_language: String,
    /// Source language hint for transcription ("auto" for detection).
    pub source_language: String,
    pub audio: AudioConfig,
    pub vad: VadConfig,
    pub stabilizer: StabilizerConfig,
    pub translation: TranslationConfig,
    pub session: SessionConfig,
    pub diagnostics: DiagnosticsConfig,
}

/// Audio window configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Trailing window duration re-inferred on every tick.
    pub window_seconds: u32,
    /// Minimum snapshot RMS energy worth sending to the engine.
    pub min_tick_energy: f32,
}

/// Voice activity gate configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VadConfig {
    /// Whether the gate participates in promotion at all. When disabled,
    /// boundary detection degrades to the stability-streak policy alone.
    pub enabled: bool,
    /// RMS threshold for detecting speech (0.0 to 1.0).
    pub energy_threshold: f32,
    /// Zero-crossing rate above which a low-energy tail still counts as speech.
    pub zcr_threshold: f32,
    /// Portion of the window classified each tick (milliseconds).
    pub tail_ms: u32,
    /// Silence sustained this long is an utterance boundary (milliseconds).
    pub hold_ms: u32,
    /// Enable adaptive ambient-noise threshold tracking.
    pub auto_level: bool,
}

/// Stabilizer configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Consecutive non-shrinking ticks before a live suffix is promoted (K).
    pub stability_streak_threshold: u32,
    /// Allow word-level commits inside a long revising utterance.
    pub word_commit: bool,
}

/// Translation scheduler configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslationConfig {
    /// Minimum interval between live-suffix translations (milliseconds).
    pub debounce_ms: u64,
    /// Minimum character growth before a suffix is re-translated.
    pub min_growth: usize,
    /// Translate the volatile live suffix at all (finalized segments are
    /// always translated).
    pub translate_live_suffix: bool,
}

/// Session pacing and lifecycle configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Tick interval driving transcription (milliseconds).
    pub step_ms: u64,
    /// How long `stop()` waits for an in-flight engine call (milliseconds).
    pub shutdown_timeout_ms: u64,
    /// Outbound event channel capacity.
    pub event_buffer: usize,
}

/// Diagnostics configuration, read once at startup and passed explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Emit a periodic `metrics` event even without failures.
    pub periodic_metrics: bool,
    /// Ticks between periodic metrics events.
    pub metrics_interval_ticks: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            target_language: String::new(),
            source_language: defaults::DEFAULT_SOURCE_LANGUAGE.to_string(),
            audio: AudioConfig::default(),
            vad: VadConfig::default(),
            stabilizer: StabilizerConfig::default(),
            translation: TranslationConfig::default(),
            session: SessionConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            window_seconds: defaults::WINDOW_SECONDS,
            min_tick_energy: defaults::MIN_TICK_ENERGY,
        }
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            energy_threshold: defaults::VAD_THRESHOLD,
            zcr_threshold: defaults::VAD_ZCR_THRESHOLD,
            tail_ms: defaults::VAD_TAIL_MS,
            hold_ms: defaults::VAD_HOLD_MS,
            auto_level: true,
        }
    }
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            stability_streak_threshold: defaults::STABILITY_STREAK,
            word_commit: true,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            debounce_ms: defaults::TRANSLATION_DEBOUNCE_MS,
            min_growth: defaults::TRANSLATION_MIN_GROWTH,
            translate_live_suffix: true,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            step_ms: defaults::STEP_MS,
            shutdown_timeout_ms: defaults::SHUTDOWN_TIMEOUT_MS,
            event_buffer: defaults::EVENT_BUFFER,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            periodic_metrics: false,
            metrics_interval_ticks: 25,
        }
    }
}

impl StreamConfig {
    /// Creates a config for the given target language with all defaults.
    pub fn for_target(target_language: &str) -> Self {
        Self {
            target_language: target_language.to_string(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: StreamConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file
    /// doesn't exist. Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported environment variables:
    /// - LINGO_TARGET_LANGUAGE → target_language
    /// - LINGO_SOURCE_LANGUAGE → source_language
    /// - LINGO_STEP → session.step_ms (humantime, e.g. "250ms")
    /// - LINGO_WINDOW → audio.window_seconds (humantime, e.g. "15s")
    /// - LINGO_DEBOUNCE → translation.debounce_ms (humantime)
    /// - LINGO_VAD → vad.enabled ("0"/"false" disables)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(lang) = std::env::var("LINGO_TARGET_LANGUAGE")
            && !lang.is_empty()
        {
            self.target_language = lang;
        }

        if let Ok(lang) = std::env::var("LINGO_SOURCE_LANGUAGE")
            && !lang.is_empty()
        {
            self.source_language = lang;
        }

        if let Some(step) = env_duration("LINGO_STEP") {
            self.session.step_ms = step.as_millis() as u64;
        }

        if let Some(window) = env_duration("LINGO_WINDOW") {
            self.audio.window_seconds = window.as_secs().max(1) as u32;
        }

        if let Some(debounce) = env_duration("LINGO_DEBOUNCE") {
            self.translation.debounce_ms = debounce.as_millis() as u64;
        }

        if let Ok(vad) = std::env::var("LINGO_VAD")
            && !vad.is_empty()
        {
            self.vad.enabled = !matches!(vad.as_str(), "0" | "false" | "off");
        }

        self
    }

    /// Validates the configuration at session start.
    ///
    /// Invalid option combinations never reach the running pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.target_language.trim().is_empty() {
            return Err(LingoError::ConfigInvalidValue {
                key: "target_language".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.audio.sample_rate == 0 {
            return Err(LingoError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.window_seconds == 0 {
            return Err(LingoError::ConfigInvalidValue {
                key: "audio.window_seconds".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.session.step_ms == 0 {
            return Err(LingoError::ConfigInvalidValue {
                key: "session.step_ms".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.session.step_ms >= self.audio.window_seconds as u64 * 1000 {
            return Err(LingoError::ConfigInvalidValue {
                key: "session.step_ms".to_string(),
                message: "must be shorter than the window".to_string(),
            });
        }
        if self.stabilizer.stability_streak_threshold == 0 {
            return Err(LingoError::ConfigInvalidValue {
                key: "stabilizer.stability_streak_threshold".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.vad.enabled && self.vad.tail_ms == 0 {
            return Err(LingoError::ConfigInvalidValue {
                key: "vad.tail_ms".to_string(),
                message: "must be positive when VAD is enabled".to_string(),
            });
        }
        if self.session.event_buffer == 0 {
            return Err(LingoError::ConfigInvalidValue {
                key: "session.event_buffer".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Window capacity in samples.
    pub fn window_capacity(&self) -> usize {
        self.audio.window_seconds as usize * self.audio.sample_rate as usize
    }

    /// Tick interval as a `Duration`.
    pub fn step(&self) -> Duration {
        Duration::from_millis(self.session.step_ms)
    }

    /// Shutdown timeout as a `Duration`.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.session.shutdown_timeout_ms)
    }

    /// Source language hint passed to the engine, `None` when auto-detecting.
    pub fn source_hint(&self) -> Option<&str> {
        if self.source_language == defaults::AUTO_LANGUAGE {
            None
        } else {
            Some(&self.source_language)
        }
    }

    /// Get the default configuration file path.
    ///
    /// Returns ~/.config/lingostream/config.toml on Linux.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lingostream").join("config.toml"))
    }
}

fn env_duration(key: &str) -> Option<Duration> {
    let raw = std::env::var(key).ok()?;
    if raw.is_empty() {
        return None;
    }
    match humantime::parse_duration(&raw) {
        Ok(d) => Some(d),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "ignoring unparsable duration");
            None
        }
    }
}
