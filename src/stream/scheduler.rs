//! Segment translation scheduler.
//!
//! Translates finalized segments (always) and the volatile live suffix (at a
//! debounced rate) through the external translation capability. Results are
//! content-addressed in a session-lifetime cache: finalized segment text
//! never changes, so entries never go stale. At most one translation call is
//! in flight per distinct text key; repeat requests for an in-flight key
//! coalesce onto the pending call instead of issuing a duplicate.

use crate::clock::{Clock, SystemClock};
use crate::config::TranslationConfig;
use crate::engine::Translator;
use crate::error::Result;
use crate::stream::frame::Segment;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Work submitted to the scheduler.
#[derive(Debug, Clone)]
pub enum TranslateJob {
    /// A finalized segment; always translated (through the cache).
    Segment(Segment),
    /// The live suffix changed; translated at a debounced rate.
    LiveSuffix { tick: u64, text: String },
}

/// A completed (or failed) translation, stamped with the originating tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOutcome {
    pub tick: u64,
    /// Set for segment refinements, None for live-suffix translations.
    pub segment_id: Option<u64>,
    pub source_text: String,
    /// None when the translation failed; the failure is isolated to this
    /// text, transcript output remains valuable without it.
    pub translation: Option<String>,
    pub cache_hit: bool,
}

/// Cache hit/miss counters for metrics events.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

type CacheKey = (String, String);

struct PendingRequest {
    tick: u64,
    segment_id: Option<u64>,
}

/// Translation scheduler station.
pub struct TranslationScheduler<T: Translator, C: Clock = SystemClock> {
    translator: Arc<T>,
    target_language: String,
    config: TranslationConfig,
    cache: HashMap<CacheKey, String>,
    in_flight: HashMap<CacheKey, Vec<PendingRequest>>,
    stats: CacheStats,
    last_live_sent: Option<Instant>,
    last_live_text: String,
    clock: C,
}

impl<T: Translator + 'static> TranslationScheduler<T, SystemClock> {
    pub fn new(translator: Arc<T>, target_language: &str, config: TranslationConfig) -> Self {
        Self::with_clock(translator, target_language, config, SystemClock)
    }
}

impl<T: Translator + 'static, C: Clock> TranslationScheduler<T, C> {
    pub fn with_clock(
        translator: Arc<T>,
        target_language: &str,
        config: TranslationConfig,
        clock: C,
    ) -> Self {
        Self {
            translator,
            target_language: target_language.to_string(),
            config,
            cache: HashMap::new(),
            in_flight: HashMap::new(),
            stats: CacheStats::default(),
            last_live_sent: None,
            last_live_text: String::new(),
            clock,
        }
    }

    /// Cache counters at this point in the session.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Runs the scheduler station.
    ///
    /// Receives jobs until the channel closes, then drains in-flight calls.
    /// Aborting the station task (session shutdown) cancels in-flight calls
    /// with it, since they live in the station's `JoinSet`.
    pub async fn run(
        mut self,
        mut jobs: mpsc::Receiver<TranslateJob>,
        results: mpsc::Sender<TranslationOutcome>,
    ) {
        let mut tasks: JoinSet<(CacheKey, Result<String>)> = JoinSet::new();

        loop {
            tokio::select! {
                job = jobs.recv() => match job {
                    Some(job) => {
                        if !self.handle_job(job, &mut tasks, &results).await {
                            return; // consumer gone
                        }
                    }
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if !self.handle_completion(joined, &results).await {
                        return;
                    }
                }
            }
        }

        // Jobs channel closed: drain outstanding calls so final segments
        // still get their refinements.
        while let Some(joined) = tasks.join_next().await {
            if !self.handle_completion(joined, &results).await {
                return;
            }
        }
    }

    /// Returns false when the results channel is closed.
    async fn handle_job(
        &mut self,
        job: TranslateJob,
        tasks: &mut JoinSet<(CacheKey, Result<String>)>,
        results: &mpsc::Sender<TranslationOutcome>,
    ) -> bool {
        let (tick, segment_id, text) = match job {
            TranslateJob::Segment(segment) => {
                (segment.finalized_at_tick, Some(segment.id), segment.text)
            }
            TranslateJob::LiveSuffix { tick, text } => {
                if !self.should_translate_live(&text) {
                    return true;
                }
                self.last_live_sent = Some(self.clock.now());
                self.last_live_text = text.clone();
                (tick, None, text)
            }
        };

        if text.is_empty() {
            return true;
        }

        let key = (text.clone(), self.target_language.clone());

        if let Some(cached) = self.cache.get(&key) {
            self.stats.hits += 1;
            return results
                .send(TranslationOutcome {
                    tick,
                    segment_id,
                    source_text: text,
                    translation: Some(cached.clone()),
                    cache_hit: true,
                })
                .await
                .is_ok();
        }

        let request = PendingRequest { tick, segment_id };
        if let Some(pending) = self.in_flight.get_mut(&key) {
            // Coalesce onto the existing call
            pending.push(request);
            return true;
        }

        self.stats.misses += 1;
        self.in_flight.insert(key.clone(), vec![request]);

        let translator = self.translator.clone();
        let target = self.target_language.clone();
        tasks.spawn(async move {
            let result = translator.translate(&key.0, &target).await;
            (key, result)
        });
        true
    }

    /// Debounce and triviality gate for live-suffix translation.
    fn should_translate_live(&self, text: &str) -> bool {
        if !self.config.translate_live_suffix || text.is_empty() {
            return false;
        }
        if text == self.last_live_text {
            return false;
        }
        // A short pure extension of the last translated suffix is trivial
        if text.starts_with(&self.last_live_text)
            && text.len() - self.last_live_text.len() < self.config.min_growth
        {
            return false;
        }
        if let Some(sent) = self.last_live_sent {
            let elapsed = self.clock.now().duration_since(sent).as_millis() as u64;
            if elapsed < self.config.debounce_ms {
                return false;
            }
        }
        true
    }

    /// Returns false when the results channel is closed.
    async fn handle_completion(
        &mut self,
        joined: std::result::Result<(CacheKey, Result<String>), tokio::task::JoinError>,
        results: &mpsc::Sender<TranslationOutcome>,
    ) -> bool {
        let (key, result) = match joined {
            Ok(done) => done,
            Err(e) => {
                tracing::warn!(error = %e, "translation task aborted");
                return true;
            }
        };

        let pending = self.in_flight.remove(&key).unwrap_or_default();

        let translation = match result {
            Ok(translated) => {
                self.cache.insert(key.clone(), translated.clone());
                Some(translated)
            }
            Err(e) => {
                // Failure is isolated: the event goes out without a
                // translation and the session continues.
                tracing::warn!(text = %key.0, error = %e, "translation failed");
                None
            }
        };

        for request in pending {
            let outcome = TranslationOutcome {
                tick: request.tick,
                segment_id: request.segment_id,
                source_text: key.0.clone(),
                translation: translation.clone(),
                cache_hit: false,
            };
            if results.send(outcome).await.is_err() {
                return false;
            }
        }
        true
    }
}
