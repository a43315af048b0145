use crate::error::{LingoError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Trait for text translation.
///
/// Translation is a round-trip to a model or service, so the call is async;
/// the scheduler runs it in spawned tasks it can cancel on shutdown.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate text into the target language.
    ///
    /// # Errors
    /// `TransientEngine` for a retryable failure, `FatalEngine` when the
    /// backend is unusable. The scheduler isolates failures per segment.
    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;
}

#[async_trait]
impl<T: Translator + ?Sized> Translator for std::sync::Arc<T> {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        (**self).translate(text, target_language).await
    }
}

/// Mock translator for testing.
///
/// By default echoes the input wrapped in the target language tag so tests
/// can assert on exact output. Counts calls so cache-idempotence and
/// coalescing tests can assert no duplicate external calls were made.
pub struct MockTranslator {
    responses: Mutex<HashMap<String, String>>,
    delay: Option<Duration>,
    fail_texts: Mutex<Vec<String>>,
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            delay: None,
            fail_texts: Mutex::new(Vec::new()),
            should_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Configure a fixed translation for a specific source text.
    pub fn with_translation(self, source: &str, translated: &str) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(source.to_string(), translated.to_string());
        self
    }

    /// Configure the mock to sleep before answering, simulating a slow
    /// round-trip.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Configure the mock to fail every call with a transient error.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Configure the mock to fail only for a specific source text.
    pub fn with_failure_for(self, text: &str) -> Self {
        self.fail_texts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        self
    }

    /// Number of translate calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let fails_for_text = self
            .fail_texts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|t| t == text);

        if self.should_fail || fails_for_text {
            return Err(LingoError::TransientEngine {
                message: format!("mock translation failure for \"{text}\""),
            });
        }

        let canned = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(text)
            .cloned();

        Ok(canned.unwrap_or_else(|| format!("[{target_language}] {text}")))
    }
}
