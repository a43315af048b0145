//! Candidate transcript scrubbing.
//!
//! Transcription engines emit noise markers for non-speech audio. These
//! never belong in the transcript stream, so candidates are scrubbed before
//! the stabilizer compares them.

/// Common engine output markers to filter.
const MARKERS: &[&str] = &[
    "[BLANK_AUDIO]",
    "[INAUDIBLE]",
    "[MUSIC]",
    "[APPLAUSE]",
    "[LAUGHTER]",
    "(BLANK_AUDIO)",
    "(inaudible)",
];

/// Removes engine noise markers and trims the result.
pub fn scrub_candidate(text: &str) -> String {
    let mut cleaned = text.to_string();
    for marker in MARKERS {
        cleaned = cleaned.replace(marker, "");
    }
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrub_removes_blank_audio() {
        assert_eq!(scrub_candidate("[BLANK_AUDIO]"), "");
        assert_eq!(scrub_candidate("Hello [BLANK_AUDIO] world"), "Hello  world");
    }

    #[test]
    fn test_scrub_removes_multiple_markers() {
        assert_eq!(
            scrub_candidate("Hello [MUSIC] world [APPLAUSE]"),
            "Hello  world"
        );
    }

    #[test]
    fn test_scrub_preserves_normal_text() {
        assert_eq!(scrub_candidate("Hello world"), "Hello world");
    }

    #[test]
    fn test_scrub_trims_whitespace() {
        assert_eq!(scrub_candidate("  Hello world  "), "Hello world");
    }
}
