//! Realtime windowed transcription-and-translation pipeline.
//!
//! ```text
//! ┌────────┐    ┌──────────┐  tick   ┌────────┐    ┌────────────┐    ┌─────────┐
//! │ frames │───▶│  Window  │────────▶│ Driver │───▶│ Stabilizer │───▶│ Emitter │───▶ consumer
//! └────────┘    │  Buffer  │         └────────┘    └────────────┘    └─────────┘
//!                └──────────┘                            │                ▲
//!                     │                                  ▼                │
//!                 VoiceGate ── boundary ──▶      Translation Scheduler ───┘
//! ```

pub mod driver;
pub mod events;
pub mod frame;
pub mod gate;
pub mod latency;
pub mod scheduler;
pub mod session;
pub mod stabilizer;
pub mod window;

pub use driver::{SkipReason, TickDriver, TickResult};
pub use events::{MetricsSnapshot, StreamEvent};
pub use frame::{AudioFrame, Segment, TranscriptState};
pub use gate::{GateDecision, GateEvent, VoiceGate};
pub use latency::{LatencyStats, LatencyTracker, TickTiming};
pub use scheduler::{TranslateJob, TranslationOutcome, TranslationScheduler};
pub use session::{SessionHandle, SessionState, StreamingSession};
pub use stabilizer::{FeedOutcome, Stabilizer};
pub use window::WindowBuffer;
