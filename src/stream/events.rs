//! Events published to the session consumer.
//!
//! Events are stamped with the tick that produced them. Transcript `Final`
//! events are emitted in strictly increasing tick order; translation
//! refinements carry their segment's originating tick and may arrive later;
//! `Partial` events are advisory. Consumers needing a strict interleaving
//! sort on `(tick, seq)`.

use serde::{Deserialize, Serialize};

/// Aggregate counters surfaced through `Metrics` events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Ticks executed so far (including skipped ones).
    pub ticks: u64,
    /// Ticks skipped because the window was empty or below the energy floor.
    pub skipped_ticks: u64,
    /// Transient transcription failures observed so far.
    pub transient_failures: u64,
    /// Consecutive transient failures at snapshot time.
    pub consecutive_failures: u32,
    /// Milliseconds the most recent transcription call took.
    pub last_inference_ms: u64,
    /// Mean transcription latency in milliseconds.
    pub mean_inference_ms: u64,
    /// Samples currently buffered in the window.
    pub window_samples: usize,
    /// Segments finalized so far.
    pub segments: u64,
    /// Translation cache hits.
    pub cache_hits: u64,
    /// Translation cache misses (external calls issued).
    pub cache_misses: u64,
}

/// An event on the session's ordered output stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    /// The live suffix changed. Advisory: may be revised by later ticks.
    Partial {
        tick: u64,
        /// Monotonic emission counter, for consumers that resequence.
        seq: u64,
        /// The volatile live suffix as of this tick.
        text: String,
        /// Debounced translation of the live suffix, when one is available.
        translation: Option<String>,
    },
    /// A segment was finalized, or a finalized segment's translation
    /// arrived (`translation` filled in, same tick as the original).
    Final {
        tick: u64,
        seq: u64,
        segment_id: u64,
        text: String,
        translation: Option<String>,
    },
    /// Diagnostic counters; also emitted whenever a tick fails.
    Metrics {
        tick: u64,
        seq: u64,
        snapshot: MetricsSnapshot,
    },
    /// Terminal event: the stream is complete. `error` is set when the
    /// session ended on a fatal pipeline error.
    Closed {
        tick: u64,
        seq: u64,
        error: Option<String>,
    },
}

impl StreamEvent {
    /// Tick that produced this event.
    pub fn tick(&self) -> u64 {
        match self {
            StreamEvent::Partial { tick, .. }
            | StreamEvent::Final { tick, .. }
            | StreamEvent::Metrics { tick, .. }
            | StreamEvent::Closed { tick, .. } => *tick,
        }
    }

    /// Emission sequence number.
    pub fn seq(&self) -> u64 {
        match self {
            StreamEvent::Partial { seq, .. }
            | StreamEvent::Final { seq, .. }
            | StreamEvent::Metrics { seq, .. }
            | StreamEvent::Closed { seq, .. } => *seq,
        }
    }

    /// True for text that will never be retracted.
    pub fn is_stable(&self) -> bool {
        matches!(self, StreamEvent::Final { .. })
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, StreamEvent::Partial { .. })
    }

    pub fn is_final(&self) -> bool {
        matches!(self, StreamEvent::Final { .. })
    }

    pub fn is_metrics(&self) -> bool {
        matches!(self, StreamEvent::Metrics { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, StreamEvent::Closed { .. })
    }

    /// Transcript text carried by this event, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Partial { text, .. } | StreamEvent::Final { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Translation carried by this event, if any.
    pub fn translation(&self) -> Option<&str> {
        match self {
            StreamEvent::Partial { translation, .. } | StreamEvent::Final { translation, .. } => {
                translation.as_deref()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let partial = StreamEvent::Partial {
            tick: 3,
            seq: 7,
            text: "hel".to_string(),
            translation: None,
        };
        assert_eq!(partial.tick(), 3);
        assert_eq!(partial.seq(), 7);
        assert!(partial.is_partial());
        assert!(!partial.is_stable());
        assert_eq!(partial.text(), Some("hel"));
        assert_eq!(partial.translation(), None);
    }

    #[test]
    fn test_final_is_stable() {
        let event = StreamEvent::Final {
            tick: 4,
            seq: 9,
            segment_id: 0,
            text: "hello world".to_string(),
            translation: Some("hallo welt".to_string()),
        };
        assert!(event.is_stable());
        assert!(event.is_final());
        assert_eq!(event.translation(), Some("hallo welt"));
    }

    #[test]
    fn test_metrics_has_no_text() {
        let event = StreamEvent::Metrics {
            tick: 2,
            seq: 5,
            snapshot: MetricsSnapshot::default(),
        };
        assert!(event.is_metrics());
        assert_eq!(event.text(), None);
        assert_eq!(event.translation(), None);
    }

    #[test]
    fn test_closed_carries_error() {
        let event = StreamEvent::Closed {
            tick: 10,
            seq: 20,
            error: Some("engine gone".to_string()),
        };
        assert!(event.is_closed());
        assert!(!event.is_stable());
    }

    #[test]
    fn test_event_serialization_tags_kind() {
        let event = StreamEvent::Partial {
            tick: 1,
            seq: 1,
            text: "x".to_string(),
            translation: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"partial\""));

        let parsed: StreamEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
