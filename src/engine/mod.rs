//! External engine capabilities consumed by the pipeline.
//!
//! The acoustic model and the translation model are opaque collaborators
//! behind the [`Transcriber`] and [`Translator`] traits. Mock
//! implementations live here too so the pipeline is testable without any
//! model on disk.

pub mod scrub;
pub mod transcriber;
pub mod translator;

pub use scrub::scrub_candidate;
pub use transcriber::{MockTranscriber, Transcriber};
pub use translator::{MockTranslator, Translator};
