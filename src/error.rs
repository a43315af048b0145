//! Error types for lingostream.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LingoError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Engine errors
    //
    // TransientEngine is recoverable per tick; FatalEngine terminates the
    // session after a terminal event.
    #[error("Transient engine failure: {message}")]
    TransientEngine { message: String },

    #[error("Fatal engine failure: {message}")]
    FatalEngine { message: String },

    #[error("Transcription failed: {message}")]
    Transcription { message: String },

    #[error("Translation failed for \"{text}\": {message}")]
    Translation { text: String, message: String },

    // Session lifecycle errors
    #[error("Session is closed")]
    SessionClosed,

    #[error("Event consumer disconnected")]
    ConsumerGone,

    #[error("Shutdown timed out after {timeout_ms}ms")]
    ShutdownTimeout { timeout_ms: u64 },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl LingoError {
    /// Returns true if this error allows the pipeline to continue
    /// (the tick is skipped, the previous transcript state is reused).
    pub fn is_transient(&self) -> bool {
        matches!(self, LingoError::TransientEngine { .. })
    }

    /// Returns true if this error must terminate the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LingoError::FatalEngine { .. })
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, LingoError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_file_not_found_display() {
        let error = LingoError::ConfigFileNotFound {
            path: "/path/to/config.toml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found at /path/to/config.toml"
        );
    }

    #[test]
    fn test_config_invalid_value_display() {
        let error = LingoError::ConfigInvalidValue {
            key: "step_ms".to_string(),
            message: "must be positive".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for step_ms: must be positive"
        );
    }

    #[test]
    fn test_transient_engine_display() {
        let error = LingoError::TransientEngine {
            message: "inference queue full".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Transient engine failure: inference queue full"
        );
    }

    #[test]
    fn test_fatal_engine_display() {
        let error = LingoError::FatalEngine {
            message: "compute backend unavailable".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Fatal engine failure: compute backend unavailable"
        );
    }

    #[test]
    fn test_translation_display() {
        let error = LingoError::Translation {
            text: "hello".to_string(),
            message: "service unreachable".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Translation failed for \"hello\": service unreachable"
        );
    }

    #[test]
    fn test_shutdown_timeout_display() {
        let error = LingoError::ShutdownTimeout { timeout_ms: 2000 };
        assert_eq!(error.to_string(), "Shutdown timed out after 2000ms");
    }

    #[test]
    fn test_is_transient() {
        assert!(
            LingoError::TransientEngine {
                message: "x".to_string()
            }
            .is_transient()
        );
        assert!(
            !LingoError::FatalEngine {
                message: "x".to_string()
            }
            .is_transient()
        );
    }

    #[test]
    fn test_is_fatal() {
        assert!(
            LingoError::FatalEngine {
                message: "x".to_string()
            }
            .is_fatal()
        );
        assert!(!LingoError::SessionClosed.is_fatal());
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: LingoError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: LingoError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<LingoError>();
        assert_sync::<LingoError>();
    }
}
