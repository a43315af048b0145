use crate::error::{LingoError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Trait for speech-to-text transcription over a window snapshot.
///
/// This trait allows swapping implementations (a real model vs mock). Calls
/// are blocking from the engine's point of view; the driver moves them off
/// the async executor with `spawn_blocking`.
pub trait Transcriber: Send + Sync {
    /// Transcribe a window of audio samples to text.
    ///
    /// # Arguments
    /// * `samples` - Mono float samples in the range [-1.0, 1.0]
    /// * `sample_rate` - Sample rate in Hz
    /// * `language_hint` - Source language, or None for auto-detection
    ///
    /// # Errors
    /// `TransientEngine` for a single-call failure the driver may retry next
    /// tick; `FatalEngine` when the engine is unusable for the session.
    fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
        language_hint: Option<&str>,
    ) -> Result<String>;

    /// Get the name of the loaded model.
    fn model_name(&self) -> &str;

    /// Check if the transcriber is ready.
    fn is_ready(&self) -> bool;
}

/// Implement Transcriber for Arc<T> to allow sharing across tasks.
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
        language_hint: Option<&str>,
    ) -> Result<String> {
        (**self).transcribe(samples, sample_rate, language_hint)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Mock transcriber for testing.
///
/// Returns a fixed response, or walks a script of per-call outcomes when one
/// is provided. Counts calls so tests can assert on invocation behavior.
pub struct MockTranscriber {
    model_name: String,
    response: String,
    script: Mutex<Vec<Result<String>>>,
    delay: Option<Duration>,
    should_fail: bool,
    fail_fatal: bool,
    calls: AtomicUsize,
}

impl MockTranscriber {
    /// Create a new mock transcriber with default settings.
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "mock transcription".to_string(),
            script: Mutex::new(Vec::new()),
            delay: None,
            should_fail: false,
            fail_fatal: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Configure the mock to return a specific response.
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure a per-call script. Each call consumes the next entry;
    /// when the script is exhausted the last scripted text (or the fixed
    /// response) repeats.
    pub fn with_script<I, S>(self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
            *script = candidates.into_iter().map(|c| Ok(c.into())).collect();
            script.reverse(); // pop() walks front-to-back
        }
        self
    }

    /// Configure a per-call script of full outcomes (including errors).
    pub fn with_outcomes(self, outcomes: Vec<Result<String>>) -> Self {
        {
            let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
            *script = outcomes;
            script.reverse();
        }
        self
    }

    /// Configure the mock to sleep before answering, simulating slow
    /// inference.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Configure the mock to fail every call with a transient error.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Configure the mock to fail every call with a fatal error.
    pub fn with_fatal_failure(mut self) -> Self {
        self.should_fail = true;
        self.fail_fatal = true;
        self
    }

    /// Number of transcribe calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(
        &self,
        _samples: &[f32],
        _sample_rate: u32,
        _language_hint: Option<&str>,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        if self.should_fail {
            return if self.fail_fatal {
                Err(LingoError::FatalEngine {
                    message: "mock fatal failure".to_string(),
                })
            } else {
                Err(LingoError::TransientEngine {
                    message: "mock transient failure".to_string(),
                })
            };
        }

        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(outcome) = script.pop() {
            if script.is_empty() {
                // Keep repeating the final candidate once the script runs out
                if let Ok(ref text) = outcome {
                    script.push(Ok(text.clone()));
                }
            }
            return outcome;
        }

        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_transcriber_returns_response() {
        let transcriber = MockTranscriber::new("test-model").with_response("Hello, this is a test");

        let audio = vec![0.0f32; 1000];
        let result = transcriber.transcribe(&audio, 16000, None);

        assert_eq!(result.unwrap(), "Hello, this is a test");
    }

    #[test]
    fn test_mock_transcriber_returns_error_when_configured() {
        let transcriber = MockTranscriber::new("test-model").with_failure();

        let audio = vec![0.0f32; 1000];
        let result = transcriber.transcribe(&audio, 16000, None);

        match result {
            Err(LingoError::TransientEngine { message }) => {
                assert_eq!(message, "mock transient failure");
            }
            other => panic!("Expected TransientEngine error, got {:?}", other),
        }
    }

    #[test]
    fn test_mock_transcriber_fatal_failure() {
        let transcriber = MockTranscriber::new("test-model").with_fatal_failure();
        let result = transcriber.transcribe(&[0.0], 16000, None);
        assert!(matches!(result, Err(LingoError::FatalEngine { .. })));
    }

    #[test]
    fn test_mock_transcriber_script_walks_candidates() {
        let transcriber =
            MockTranscriber::new("test-model").with_script(["hel", "hell", "hello world"]);

        let audio = vec![0.0f32; 100];
        assert_eq!(transcriber.transcribe(&audio, 16000, None).unwrap(), "hel");
        assert_eq!(transcriber.transcribe(&audio, 16000, None).unwrap(), "hell");
        assert_eq!(
            transcriber.transcribe(&audio, 16000, None).unwrap(),
            "hello world"
        );
        // Script exhausted: last candidate repeats
        assert_eq!(
            transcriber.transcribe(&audio, 16000, None).unwrap(),
            "hello world"
        );
    }

    #[test]
    fn test_mock_transcriber_outcomes_include_errors() {
        let transcriber = MockTranscriber::new("test-model").with_outcomes(vec![
            Ok("first".to_string()),
            Err(LingoError::TransientEngine {
                message: "blip".to_string(),
            }),
            Ok("second".to_string()),
        ]);

        let audio = vec![0.0f32; 100];
        assert_eq!(transcriber.transcribe(&audio, 16000, None).unwrap(), "first");
        assert!(transcriber.transcribe(&audio, 16000, None).is_err());
        assert_eq!(
            transcriber.transcribe(&audio, 16000, None).unwrap(),
            "second"
        );
    }

    #[test]
    fn test_mock_transcriber_counts_calls() {
        let transcriber = MockTranscriber::new("test-model");
        assert_eq!(transcriber.call_count(), 0);

        let audio = vec![0.0f32; 10];
        let _ = transcriber.transcribe(&audio, 16000, None);
        let _ = transcriber.transcribe(&audio, 16000, None);
        assert_eq!(transcriber.call_count(), 2);
    }

    #[test]
    fn test_mock_transcriber_model_name_and_ready() {
        let transcriber = MockTranscriber::new("base-streaming");
        assert_eq!(transcriber.model_name(), "base-streaming");
        assert!(transcriber.is_ready());

        let failing = MockTranscriber::new("base-streaming").with_failure();
        assert!(!failing.is_ready());
    }

    #[test]
    fn test_transcriber_trait_is_object_safe() {
        let transcriber: Box<dyn Transcriber> =
            Box::new(MockTranscriber::new("test-model").with_response("boxed test"));

        assert_eq!(transcriber.model_name(), "test-model");
        let result = transcriber.transcribe(&[0.0; 100], 16000, Some("en"));
        assert_eq!(result.unwrap(), "boxed test");
    }

    #[test]
    fn test_arc_transcriber_shares_counter() {
        let transcriber = Arc::new(MockTranscriber::new("shared"));
        let clone = transcriber.clone();

        let _ = clone.transcribe(&[0.0; 10], 16000, None);
        assert_eq!(transcriber.call_count(), 1);
    }
}
