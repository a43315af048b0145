//! Transcription tick driver.
//!
//! Owns one tick's interaction with the external transcription capability:
//! gate the snapshot on an energy floor, move the blocking engine call off
//! the async executor, scrub the candidate, and track the failure streak
//! that escalates transient errors to a fatal pipeline error.

use crate::config::StreamConfig;
use crate::defaults;
use crate::engine::{scrub_candidate, Transcriber};
use crate::error::LingoError;
use crate::stream::window::calculate_rms;
use std::sync::Arc;

/// Why a tick produced no candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyWindow,
    BelowEnergyFloor,
}

/// Outcome of one tick's transcription attempt.
#[derive(Debug)]
pub enum TickResult {
    /// Nothing worth transcribing; the previous state is reused.
    Skipped(SkipReason),
    /// A scrubbed candidate transcript.
    Candidate(String),
    /// A transient failure; the tick is skipped and retried next cycle.
    TransientFailure { consecutive: u32 },
    /// Unrecoverable: the session must surface a terminal event and close.
    Fatal(LingoError),
}

pub struct TickDriver<T: Transcriber> {
    transcriber: Arc<T>,
    sample_rate: u32,
    language_hint: Option<String>,
    min_energy: f32,
    consecutive_failures: u32,
    transient_failures: u64,
    skipped_ticks: u64,
}

impl<T: Transcriber + 'static> TickDriver<T> {
    pub fn new(transcriber: Arc<T>, config: &StreamConfig) -> Self {
        Self {
            transcriber,
            sample_rate: config.audio.sample_rate,
            language_hint: config.source_hint().map(str::to_string),
            min_energy: config.audio.min_tick_energy,
            consecutive_failures: 0,
            transient_failures: 0,
            skipped_ticks: 0,
        }
    }

    /// Runs one tick against the engine.
    ///
    /// The blocking engine call runs on the blocking thread pool; while it
    /// is outstanding the caller's tick timer collapses missed ticks, which
    /// is the pipeline's backpressure policy.
    pub async fn transcribe_tick(&mut self, snapshot: Vec<f32>) -> TickResult {
        if snapshot.is_empty() {
            self.skipped_ticks += 1;
            return TickResult::Skipped(SkipReason::EmptyWindow);
        }
        if calculate_rms(&snapshot) < self.min_energy {
            self.skipped_ticks += 1;
            return TickResult::Skipped(SkipReason::BelowEnergyFloor);
        }

        let transcriber = self.transcriber.clone();
        let sample_rate = self.sample_rate;
        let hint = self.language_hint.clone();

        let result = tokio::task::spawn_blocking(move || {
            transcriber.transcribe(&snapshot, sample_rate, hint.as_deref())
        })
        .await;

        match result {
            Ok(Ok(text)) => {
                self.consecutive_failures = 0;
                TickResult::Candidate(scrub_candidate(&text))
            }
            Ok(Err(e)) if e.is_fatal() => TickResult::Fatal(e),
            Ok(Err(e)) => self.record_transient(e.to_string()),
            Err(join_err) => {
                // A panicking engine is not recoverable mid-session
                TickResult::Fatal(LingoError::FatalEngine {
                    message: format!("transcription task panicked: {join_err}"),
                })
            }
        }
    }

    fn record_transient(&mut self, message: String) -> TickResult {
        self.consecutive_failures += 1;
        self.transient_failures += 1;
        tracing::warn!(
            consecutive = self.consecutive_failures,
            %message,
            "transcription tick failed"
        );

        if self.consecutive_failures >= defaults::MAX_CONSECUTIVE_FAILURES {
            TickResult::Fatal(LingoError::FatalEngine {
                message: format!(
                    "{} consecutive transcription failures, last: {message}",
                    self.consecutive_failures
                ),
            })
        } else {
            TickResult::TransientFailure {
                consecutive: self.consecutive_failures,
            }
        }
    }

    /// Consecutive transient failures right now.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Transient failures over the whole session.
    pub fn transient_failures(&self) -> u64 {
        self.transient_failures
    }

    /// Ticks skipped for empty or silent windows.
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamConfig;
    use crate::engine::MockTranscriber;
    use crate::error::Result;

    fn driver(transcriber: MockTranscriber) -> TickDriver<MockTranscriber> {
        TickDriver::new(Arc::new(transcriber), &StreamConfig::for_target("de"))
    }

    fn audible(count: usize) -> Vec<f32> {
        (0..count)
            .map(|i| if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect()
    }

    #[tokio::test]
    async fn test_candidate_is_scrubbed() {
        let mut driver = driver(MockTranscriber::new("m").with_response("hello [BLANK_AUDIO]"));

        match driver.transcribe_tick(audible(1600)).await {
            TickResult::Candidate(text) => assert_eq!(text, "hello"),
            other => panic!("expected candidate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_window_skips() {
        let transcriber = MockTranscriber::new("m");
        let mut driver = TickDriver::new(
            Arc::new(transcriber),
            &StreamConfig::for_target("de"),
        );

        match driver.transcribe_tick(Vec::new()).await {
            TickResult::Skipped(SkipReason::EmptyWindow) => {}
            other => panic!("expected skip, got {other:?}"),
        }
        assert_eq!(driver.skipped_ticks(), 1);
    }

    #[tokio::test]
    async fn test_silent_window_skips_engine() {
        let transcriber = Arc::new(MockTranscriber::new("m"));
        let mut driver =
            TickDriver::new(transcriber.clone(), &StreamConfig::for_target("de"));

        match driver.transcribe_tick(vec![0.0; 16000]).await {
            TickResult::Skipped(SkipReason::BelowEnergyFloor) => {}
            other => panic!("expected skip, got {other:?}"),
        }
        // The engine was never invoked
        assert_eq!(transcriber.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transient_failure_streak_escalates() {
        let mut driver = driver(MockTranscriber::new("m").with_failure());

        match driver.transcribe_tick(audible(1600)).await {
            TickResult::TransientFailure { consecutive: 1 } => {}
            other => panic!("expected transient, got {other:?}"),
        }
        match driver.transcribe_tick(audible(1600)).await {
            TickResult::TransientFailure { consecutive: 2 } => {}
            other => panic!("expected transient, got {other:?}"),
        }
        // Third consecutive failure escalates to fatal
        match driver.transcribe_tick(audible(1600)).await {
            TickResult::Fatal(LingoError::FatalEngine { .. }) => {}
            other => panic!("expected fatal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_resets_failure_streak() {
        let outcomes: Vec<Result<String>> = vec![
            Err(LingoError::TransientEngine {
                message: "blip".to_string(),
            }),
            Err(LingoError::TransientEngine {
                message: "blip".to_string(),
            }),
            Ok("recovered".to_string()),
            Err(LingoError::TransientEngine {
                message: "blip".to_string(),
            }),
        ];
        let mut driver = driver(MockTranscriber::new("m").with_outcomes(outcomes));

        driver.transcribe_tick(audible(1600)).await;
        driver.transcribe_tick(audible(1600)).await;
        assert_eq!(driver.consecutive_failures(), 2);

        match driver.transcribe_tick(audible(1600)).await {
            TickResult::Candidate(text) => assert_eq!(text, "recovered"),
            other => panic!("expected candidate, got {other:?}"),
        }
        assert_eq!(driver.consecutive_failures(), 0);

        // The streak starts over
        match driver.transcribe_tick(audible(1600)).await {
            TickResult::TransientFailure { consecutive: 1 } => {}
            other => panic!("expected transient, got {other:?}"),
        }
        assert_eq!(driver.transient_failures(), 3);
    }

    #[tokio::test]
    async fn test_fatal_engine_error_passes_through() {
        let mut driver = driver(MockTranscriber::new("m").with_fatal_failure());

        match driver.transcribe_tick(audible(1600)).await {
            TickResult::Fatal(LingoError::FatalEngine { .. }) => {}
            other => panic!("expected fatal, got {other:?}"),
        }
    }
}
