//! Latency measurement for the tick loop.

use std::time::{Duration, Instant};

/// Timing information for a single tick.
#[derive(Debug, Clone)]
pub struct TickTiming {
    /// When the window snapshot was taken.
    pub snapshot_taken: Instant,
    /// When the transcription call returned.
    pub inference_done: Instant,
    /// When the tick's events were handed to the emitter.
    pub emitted: Instant,
    /// Duration of the audio content in the snapshot.
    pub audio_duration: Duration,
}

impl TickTiming {
    /// Time spent inside the transcription engine.
    pub fn inference_latency(&self) -> Duration {
        self.inference_done.duration_since(self.snapshot_taken)
    }

    /// End-to-end latency from snapshot to emission.
    pub fn total_latency(&self) -> Duration {
        self.emitted.duration_since(self.snapshot_taken)
    }

    /// Real-time factor for the inference: < 1.0 means faster than
    /// real-time, > 1.0 means the engine cannot keep up with the window.
    pub fn realtime_factor(&self) -> f64 {
        if self.audio_duration.is_zero() {
            return 0.0;
        }
        self.inference_latency().as_secs_f64() / self.audio_duration.as_secs_f64()
    }
}

/// Aggregated latency statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyStats {
    pub count: usize,
    pub inference_avg: Duration,
    pub inference_min: Duration,
    pub inference_max: Duration,
    pub total_avg: Duration,
    pub realtime_factor_avg: f64,
}

/// Collects tick timings and reports aggregates.
pub struct LatencyTracker {
    measurements: Vec<TickTiming>,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self {
            measurements: Vec::new(),
        }
    }

    /// Records a timing measurement.
    pub fn record(&mut self, timing: TickTiming) {
        self.measurements.push(timing);
    }

    /// Latency of the most recent tick's inference, if any.
    pub fn last_inference(&self) -> Option<Duration> {
        self.measurements.last().map(|t| t.inference_latency())
    }

    /// Mean inference latency across all recorded ticks.
    pub fn mean_inference(&self) -> Duration {
        if self.measurements.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.measurements.iter().map(|t| t.inference_latency()).sum();
        sum / self.measurements.len() as u32
    }

    /// Computes aggregated statistics, or None with no measurements.
    pub fn stats(&self) -> Option<LatencyStats> {
        if self.measurements.is_empty() {
            return None;
        }

        let inference: Vec<Duration> = self
            .measurements
            .iter()
            .map(|t| t.inference_latency())
            .collect();
        let totals: Vec<Duration> = self.measurements.iter().map(|t| t.total_latency()).collect();
        let rtf_sum: f64 = self.measurements.iter().map(|t| t.realtime_factor()).sum();

        let count = self.measurements.len();
        Some(LatencyStats {
            count,
            inference_avg: inference.iter().sum::<Duration>() / count as u32,
            inference_min: inference.iter().min().copied().unwrap_or(Duration::ZERO),
            inference_max: inference.iter().max().copied().unwrap_or(Duration::ZERO),
            total_avg: totals.iter().sum::<Duration>() / count as u32,
            realtime_factor_avg: rtf_sum / count as f64,
        })
    }

    pub fn count(&self) -> usize {
        self.measurements.len()
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}
