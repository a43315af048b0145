//! Data types that flow through the streaming pipeline.

use std::time::Instant;

/// Audio frame handed to the session by the capture layer.
///
/// Immutable once captured; ownership transfers into the window buffer on
/// ingest.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Sequence number for ordering and gap detection.
    pub sequence: u64,
    /// Mono float samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Timestamp when the audio was captured.
    pub timestamp: Instant,
}

impl AudioFrame {
    /// Creates a new audio frame stamped with the current instant.
    pub fn new(sequence: u64, samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            sequence,
            samples,
            sample_rate,
            timestamp: Instant::now(),
        }
    }

    /// Returns the duration of this frame in milliseconds.
    pub fn duration_ms(&self) -> u32 {
        ((self.samples.len() as u64 * 1000) / self.sample_rate as u64) as u32
    }
}

/// One finalized, immutable unit of committed transcript text.
///
/// Segments are append-only; the segment list plus the current live suffix
/// reconstructs the full transcript so far.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    pub id: u64,
    pub text: String,
    pub finalized_at_tick: u64,
}

/// Transcript state owned by the stabilizer.
///
/// `committed` never changes once text lands in it; `live_suffix` is
/// replaced on every tick; `stable_streak` counts consecutive ticks where
/// the candidate's overlap with the previous live suffix did not shrink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptState {
    pub committed: String,
    pub live_suffix: String,
    pub stable_streak: u32,
}

impl TranscriptState {
    /// Full transcript so far: committed text plus the volatile tail.
    pub fn full_text(&self) -> String {
        if self.committed.is_empty() {
            self.live_suffix.clone()
        } else if self.live_suffix.is_empty() {
            self.committed.clone()
        } else {
            format!("{} {}", self.committed.trim_end(), self.live_suffix)
        }
    }
}
