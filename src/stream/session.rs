//! Streaming session orchestrator.
//!
//! Wires the window buffer, voice gate, tick driver, stabilizer, and
//! translation scheduler into a running session:
//!
//! ```text
//! ┌────────┐    ┌────────┐  tick  ┌────────┐    ┌────────────┐
//! │ frames │───▶│ Window │───────▶│ Driver │───▶│ Stabilizer │──┐
//! └────────┘    │ Buffer │        └────────┘    └────────────┘  │
//!                └────────┘            ▲       ┌─────────────┐   │ events
//!                    │                 │       │ Translation │◀──┤
//!                    ▼              timer      │  Scheduler  │   ▼
//!                VoiceGate                     └─────────────┘ consumer
//! ```
//!
//! Three tasks run per session: frame ingest, the tick loop, and the
//! translation scheduler. All events are emitted from the tick loop, so the
//! output channel carries them in emission order; every event is stamped
//! with its originating tick.

use crate::config::StreamConfig;
use crate::engine::{Transcriber, Translator};
use crate::error::{LingoError, Result};
use crate::stream::driver::{TickDriver, TickResult};
use crate::stream::frame::AudioFrame;
use crate::stream::events::{MetricsSnapshot, StreamEvent};
use crate::stream::gate::{GateEvent, VoiceGate};
use crate::stream::latency::{LatencyTracker, TickTiming};
use crate::stream::scheduler::{TranslateJob, TranslationOutcome, TranslationScheduler};
use crate::stream::stabilizer::Stabilizer;
use crate::stream::window::WindowBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Session lifecycle states.
///
/// The machine sequences event emission only; text state lives in the
/// stabilizer's `TranscriptState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No audio frame has arrived yet.
    Idle,
    /// Audio is flowing; waiting for the next tick.
    Listening,
    /// A window snapshot is at the engine.
    Transcribing,
    /// Reconciling the candidate against the transcript state.
    Stabilizing,
    /// Translation work was dispatched this tick.
    Translating,
    /// Events are being handed to the consumer.
    Emitting,
    /// Terminal: no further events are produced.
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Listening => "listening",
            SessionState::Transcribing => "transcribing",
            SessionState::Stabilizing => "stabilizing",
            SessionState::Translating => "translating",
            SessionState::Emitting => "emitting",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Handle to a running session.
pub struct SessionHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    shutdown_timeout: Duration,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<SessionState>>,
}

impl SessionHandle {
    /// Stops the session: ingest stops, the in-flight transcription gets up
    /// to the shutdown timeout to finish, pending translations are
    /// cancelled, a terminal event is flushed, and the stream closes.
    pub async fn stop(mut self) -> Result<()> {
        let _ = self.shutdown.send(true);

        let mut timed_out = false;
        let deadline = Instant::now() + self.shutdown_timeout;
        for task in self.tasks.drain(..) {
            let abort = task.abort_handle();
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_panic() => {
                    tracing::error!(error = %e, "session task panicked");
                }
                Ok(Err(_)) => {} // cancelled
                Err(_) => {
                    // Deadline passed: detach the task, it dies with the
                    // runtime.
                    abort.abort();
                    timed_out = true;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);

        if timed_out {
            Err(LingoError::ShutdownTimeout {
                timeout_ms: self.shutdown_timeout.as_millis() as u64,
            })
        } else {
            Ok(())
        }
    }

    /// Returns true while the session is producing events.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Current state of the session state machine.
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Streaming transcription-and-translation session.
pub struct StreamingSession {
    config: StreamConfig,
}

impl StreamingSession {
    /// Creates a session, validating the configuration.
    ///
    /// Invalid option combinations are rejected here and never reach the
    /// running pipeline.
    pub fn new(config: StreamConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Starts the session.
    ///
    /// # Arguments
    /// * `frames` - Asynchronous sequence of audio frames from the capture
    ///   layer
    /// * `transcriber` - External transcription capability
    /// * `translator` - External translation capability
    ///
    /// # Returns
    /// The ordered event stream and a handle to stop the session.
    pub fn start<T, U>(
        self,
        frames: mpsc::Receiver<AudioFrame>,
        transcriber: Arc<T>,
        translator: Arc<U>,
    ) -> (mpsc::Receiver<StreamEvent>, SessionHandle)
    where
        T: Transcriber + 'static,
        U: Translator + 'static,
    {
        let config = self.config;
        let (event_tx, event_rx) = mpsc::channel(config.session.event_buffer);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (job_tx, job_rx) = mpsc::channel::<TranslateJob>(64);
        let (result_tx, result_rx) = mpsc::channel::<TranslationOutcome>(64);

        let window = Arc::new(Mutex::new(WindowBuffer::new(
            config.audio.window_seconds,
            config.audio.sample_rate,
        )));
        let started = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(SessionState::Idle));

        // Frame ingest: the single writer to the window buffer.
        let ingest_window = window.clone();
        let ingest_started = started.clone();
        let mut ingest_shutdown = shutdown_rx.clone();
        let ingest_task = tokio::spawn(async move {
            let mut frames = frames;
            loop {
                tokio::select! {
                    changed = ingest_shutdown.changed() => {
                        if changed.is_err() || *ingest_shutdown.borrow() {
                            break;
                        }
                    }
                    frame = frames.recv() => match frame {
                        Some(frame) => {
                            {
                                let mut window =
                                    ingest_window.lock().unwrap_or_else(|e| e.into_inner());
                                window.push(frame);
                            }
                            // Flipped after the push so the first counted
                            // tick always sees a non-empty window.
                            ingest_started.store(true, Ordering::SeqCst);
                        }
                        // Producer finished; the tick loop keeps draining
                        // whatever is already buffered.
                        None => break,
                    },
                }
            }
        });

        // Translation scheduler station.
        let scheduler = TranslationScheduler::new(
            translator,
            &config.target_language,
            config.translation,
        );
        let scheduler_task = tokio::spawn(async move {
            scheduler.run(job_rx, result_tx).await;
        });

        // Tick loop: drives transcription, owns the stabilizer, and is the
        // single emitter of events.
        let loop_running = running.clone();
        let tick_loop = TickLoop {
            config: config.clone(),
            window,
            started,
            state: state.clone(),
            driver: TickDriver::new(transcriber, &config),
            gate: VoiceGate::new(config.vad),
            stabilizer: Stabilizer::new(config.stabilizer),
            latency: LatencyTracker::new(),
            events: event_tx,
            jobs: job_tx,
            tick: 0,
            seq: 0,
            cache_hits: 0,
            cache_misses: 0,
        };
        let loop_task = tokio::spawn(async move {
            tick_loop.run(shutdown_rx, result_rx).await;
            loop_running.store(false, Ordering::SeqCst);
        });

        let handle = SessionHandle {
            shutdown: shutdown_tx,
            tasks: vec![loop_task, ingest_task, scheduler_task],
            shutdown_timeout: config.shutdown_timeout(),
            running,
            state,
        };

        (event_rx, handle)
    }
}

struct TickLoop<T: Transcriber> {
    config: StreamConfig,
    window: Arc<Mutex<WindowBuffer>>,
    started: Arc<AtomicBool>,
    state: Arc<Mutex<SessionState>>,
    driver: TickDriver<T>,
    gate: VoiceGate,
    stabilizer: Stabilizer,
    latency: LatencyTracker,
    events: mpsc::Sender<StreamEvent>,
    jobs: mpsc::Sender<TranslateJob>,
    tick: u64,
    seq: u64,
    cache_hits: u64,
    cache_misses: u64,
}

impl<T: Transcriber + 'static> TickLoop<T> {
    async fn run(
        mut self,
        mut shutdown: watch::Receiver<bool>,
        mut translations: mpsc::Receiver<TranslationOutcome>,
    ) {
        let mut interval = tokio::time::interval(self.config.step());
        // Backpressure: while a tick's engine call is outstanding, missed
        // timer fires collapse into at most one pending tick.
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut translations_open = true;
        let error = loop {
            tokio::select! {
                // Shutdown outranks pending work; refinements outrank new
                // ticks so they flush promptly.
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break None;
                    }
                }
                outcome = translations.recv(), if translations_open => match outcome {
                    Some(outcome) => {
                        if self.emit_translation(outcome).await.is_err() {
                            return; // consumer gone, nothing to flush to
                        }
                    }
                    None => {
                        // Scheduler died unexpectedly; translation stops
                        // but transcription remains valuable.
                        tracing::warn!("translation scheduler stopped");
                        translations_open = false;
                    }
                },
                _ = interval.tick() => {
                    match self.run_tick().await {
                        Ok(()) => {}
                        Err(TickError::ConsumerGone) => return,
                        Err(TickError::Fatal(e)) => break Some(e),
                    }
                }
            }
        };

        self.set_state(SessionState::Closed);
        let seq = self.next_seq();
        let _ = self
            .events
            .send(StreamEvent::Closed {
                tick: self.tick,
                seq,
                error: error.map(|e| e.to_string()),
            })
            .await;
        // Dropping `events` and `jobs` lets the consumer's receiver end and
        // winds the scheduler down.
    }

    async fn run_tick(&mut self) -> std::result::Result<(), TickError> {
        if !self.started.load(Ordering::SeqCst) {
            // Idle: no audio has arrived yet, ticks don't count.
            return Ok(());
        }

        self.tick += 1;
        let tick = self.tick;

        let (snapshot, tail, window_samples) = {
            let window = self.window.lock().unwrap_or_else(|e| e.into_inner());
            (
                window.snapshot(),
                window.tail(self.config.vad.tail_ms),
                window.len(),
            )
        };

        let boundary = self.gate.observe(&tail) == GateEvent::Boundary;
        if boundary {
            tracing::debug!(tick, "utterance boundary");
        }

        self.set_state(SessionState::Transcribing);
        let snapshot_taken = Instant::now();
        let audio_duration = Duration::from_millis(
            (snapshot.len() as u64 * 1000) / self.config.audio.sample_rate as u64,
        );
        let result = self.driver.transcribe_tick(snapshot).await;
        let inference_done = Instant::now();

        match result {
            TickResult::Candidate(candidate) => {
                self.set_state(SessionState::Stabilizing);
                let outcome = self.stabilizer.feed(&candidate, tick, boundary);

                if let Some(segment) = outcome.promoted {
                    self.set_state(SessionState::Translating);
                    self.emit(StreamEvent::Final {
                        tick,
                        seq: 0, // stamped in emit
                        segment_id: segment.id,
                        text: segment.text.clone(),
                        translation: None,
                    })
                    .await?;
                    let _ = self.jobs.send(TranslateJob::Segment(segment)).await;
                } else if outcome.live_changed {
                    let text = self.stabilizer.live_suffix().to_string();
                    self.emit(StreamEvent::Partial {
                        tick,
                        seq: 0,
                        text: text.clone(),
                        translation: None,
                    })
                    .await?;
                    if !text.is_empty() {
                        let _ = self.jobs.send(TranslateJob::LiveSuffix { tick, text }).await;
                    }
                }

                self.latency.record(TickTiming {
                    snapshot_taken,
                    inference_done,
                    emitted: Instant::now(),
                    audio_duration,
                });
            }
            TickResult::Skipped(reason) => {
                tracing::trace!(tick, ?reason, "tick skipped");
                // A boundary can fire on a silent window while suffix text
                // is still pending promotion.
                if boundary
                    && let Some(segment) = self.stabilizer.force_promote(tick)
                {
                    self.set_state(SessionState::Translating);
                    self.emit(StreamEvent::Final {
                        tick,
                        seq: 0,
                        segment_id: segment.id,
                        text: segment.text.clone(),
                        translation: None,
                    })
                    .await?;
                    let _ = self.jobs.send(TranslateJob::Segment(segment)).await;
                }
            }
            TickResult::TransientFailure { .. } => {
                // The previous transcript state is reused unchanged; a
                // metrics event records the failure.
                let snapshot = self.metrics_snapshot(window_samples);
                self.emit(StreamEvent::Metrics {
                    tick,
                    seq: 0,
                    snapshot,
                })
                .await?;
            }
            TickResult::Fatal(e) => {
                tracing::error!(tick, error = %e, "fatal pipeline error");
                return Err(TickError::Fatal(e));
            }
        }

        if self.config.diagnostics.periodic_metrics
            && self
                .tick
                .is_multiple_of(self.config.diagnostics.metrics_interval_ticks.max(1))
        {
            let snapshot = self.metrics_snapshot(window_samples);
            self.emit(StreamEvent::Metrics {
                tick,
                seq: 0,
                snapshot,
            })
            .await?;
        }

        self.set_state(SessionState::Emitting);
        self.set_state(SessionState::Listening);
        Ok(())
    }

    /// Emits a translation refinement, stamped with its originating tick.
    async fn emit_translation(
        &mut self,
        outcome: TranslationOutcome,
    ) -> std::result::Result<(), TickError> {
        if outcome.cache_hit {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }

        match outcome.segment_id {
            Some(segment_id) => {
                self.emit(StreamEvent::Final {
                    tick: outcome.tick,
                    seq: 0,
                    segment_id,
                    text: outcome.source_text,
                    translation: outcome.translation,
                })
                .await
            }
            None => {
                // Stale suffix translations are advisory; drop them once
                // the live text has moved on.
                if outcome.source_text != self.stabilizer.live_suffix() {
                    return Ok(());
                }
                self.emit(StreamEvent::Partial {
                    tick: outcome.tick,
                    seq: 0,
                    text: outcome.source_text,
                    translation: outcome.translation,
                })
                .await
            }
        }
    }

    async fn emit(&mut self, event: StreamEvent) -> std::result::Result<(), TickError> {
        let seq = self.next_seq();
        let event = match event {
            StreamEvent::Partial {
                tick,
                text,
                translation,
                ..
            } => StreamEvent::Partial {
                tick,
                seq,
                text,
                translation,
            },
            StreamEvent::Final {
                tick,
                segment_id,
                text,
                translation,
                ..
            } => StreamEvent::Final {
                tick,
                seq,
                segment_id,
                text,
                translation,
            },
            StreamEvent::Metrics { tick, snapshot, .. } => StreamEvent::Metrics {
                tick,
                seq,
                snapshot,
            },
            StreamEvent::Closed { tick, error, .. } => StreamEvent::Closed { tick, seq, error },
        };

        self.events
            .send(event)
            .await
            .map_err(|_| TickError::ConsumerGone)
    }

    fn metrics_snapshot(&self, window_samples: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.tick,
            skipped_ticks: self.driver.skipped_ticks(),
            transient_failures: self.driver.transient_failures(),
            consecutive_failures: self.driver.consecutive_failures(),
            last_inference_ms: self
                .latency
                .last_inference()
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
            mean_inference_ms: self.latency.mean_inference().as_millis() as u64,
            window_samples,
            segments: self.stabilizer.segments().len() as u64,
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn set_state(&self, state: SessionState) {
        let mut current = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *current != state {
            tracing::trace!(from = %current, to = %state, "session state");
            *current = state;
        }
    }
}

enum TickError {
    /// The event receiver was dropped; the session winds down silently.
    ConsumerGone,
    /// A fatal error; a terminal event is flushed before closing.
    Fatal(LingoError),
}
