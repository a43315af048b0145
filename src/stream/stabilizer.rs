//! Transcript stabilizer.
//!
//! Re-running full-window inference every tick produces transcripts whose
//! tail is unreliable but whose prefix, once repeatedly confirmed, is
//! trustworthy. The stabilizer compares successive candidates with
//! longest-common-prefix streak counting and turns that repeated-but-noisy
//! recomputation into monotonically-improving output: committed text is
//! never retracted.
//!
//! The interface (`feed(candidate)`) is independent of how candidates are
//! produced, so an incremental decoder can replace the tick driver without
//! touching this module.

use crate::config::StabilizerConfig;
use crate::stream::frame::{Segment, TranscriptState};
use std::collections::VecDeque;

/// Result of feeding one candidate transcript.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedOutcome {
    /// The live suffix changed textually this tick.
    pub live_changed: bool,
    /// A segment was finalized this tick.
    pub promoted: Option<Segment>,
    /// The committed anchor scrolled out of the window and was reset.
    pub window_slid: bool,
}

/// LCP-based stabilizer holding the committed/live split.
pub struct Stabilizer {
    config: StabilizerConfig,
    /// Committed text still expected verbatim at the head of candidates.
    /// Resets when the window slides past it; never re-opened.
    anchor: String,
    /// Volatile tail, replaced on every tick.
    live_suffix: String,
    /// Consecutive ticks the live suffix did not shrink.
    stable_streak: u32,
    /// Recent deltas (anchor-relative), newest last, for word-level commits.
    history: VecDeque<String>,
    /// Finalized segments, append-only.
    segments: Vec<Segment>,
    /// Full committed transcript (segment texts joined).
    committed_text: String,
    next_segment_id: u64,
}

impl Stabilizer {
    pub fn new(config: StabilizerConfig) -> Self {
        Self {
            config,
            anchor: String::new(),
            live_suffix: String::new(),
            stable_streak: 0,
            history: VecDeque::new(),
            segments: Vec::new(),
            committed_text: String::new(),
            next_segment_id: 0,
        }
    }

    /// Feeds one candidate transcript for the given tick.
    ///
    /// `boundary` is the VAD utterance-boundary signal; it force-promotes
    /// the live suffix even below the stability-streak threshold.
    pub fn feed(&mut self, candidate: &str, tick: u64, boundary: bool) -> FeedOutcome {
        let mut outcome = FeedOutcome::default();

        // 1. Strip the committed anchor. If the window slid past it, the
        //    entire candidate is the new live region; committed text is
        //    immutable once promoted, so the anchor just resets.
        let delta: String = if self.anchor.is_empty() {
            candidate.trim_start().to_string()
        } else if let Some(rest) = candidate.strip_prefix(self.anchor.as_str()) {
            rest.trim_start().to_string()
        } else {
            outcome.window_slid = true;
            self.anchor.clear();
            self.history.clear();
            self.stable_streak = 0;
            candidate.trim_start().to_string()
        };

        // 2. Streak accounting against the previous live suffix. A freshly
        //    seeded (empty) suffix has no overlap to confirm, so it does not
        //    count toward the streak.
        let prev = std::mem::take(&mut self.live_suffix);
        let lcp = lcp_len(&prev, &delta);
        if !prev.is_empty() && lcp == prev.len() {
            self.stable_streak += 1;
        } else {
            self.stable_streak = 0;
        }

        // 3. Replace the live suffix.
        outcome.live_changed = prev != delta;
        self.live_suffix = delta;

        // 4. Promotion policy.
        let threshold = self.config.stability_streak_threshold;
        if boundary && !self.live_suffix.is_empty() {
            outcome.promoted = Some(self.promote_all(tick));
        } else if self.stable_streak >= threshold && !self.live_suffix.is_empty() {
            outcome.promoted = Some(self.promote_all(tick));
        } else if self.config.word_commit {
            outcome.promoted = self.try_word_commit(tick);
        }

        // Record this tick's delta (post-commit coordinates) for the
        // word-commit window.
        self.history.push_back(self.live_suffix.clone());
        while self.history.len() > threshold as usize {
            self.history.pop_front();
        }

        outcome
    }

    /// Force-promotes the current live suffix without a new candidate.
    ///
    /// Used when an utterance boundary fires on a tick that produced no
    /// candidate (empty or silent window).
    pub fn force_promote(&mut self, tick: u64) -> Option<Segment> {
        if self.live_suffix.is_empty() {
            return None;
        }
        Some(self.promote_all(tick))
    }

    /// Promotes the entire live suffix to a committed segment.
    fn promote_all(&mut self, tick: u64) -> Segment {
        let text = std::mem::take(&mut self.live_suffix);
        self.stable_streak = 0;
        self.history.clear();

        // The anchor now covers everything seen this tick.
        if self.anchor.is_empty() {
            self.anchor = text.clone();
        } else {
            // Candidates render committed text and suffix separated by the
            // whitespace the strip removed; one space is what engines emit.
            self.anchor.push(' ');
            self.anchor.push_str(&text);
        }

        self.append_segment(text, tick)
    }

    /// Commits the whitespace-bounded head of a long revising utterance.
    ///
    /// Runs only when neither the streak promotion nor a boundary fired.
    /// The head must be common to this tick's delta and the previous K
    /// deltas, so a tail that keeps being rewritten cannot hold back words
    /// that every recent candidate agrees on.
    fn try_word_commit(&mut self, tick: u64) -> Option<Segment> {
        let threshold = self.config.stability_streak_threshold as usize;
        if self.history.len() < threshold || self.live_suffix.is_empty() {
            return None;
        }

        let mut agreed = lcp_len(self.history.front()?, &self.live_suffix);
        for past in self.history.iter().skip(1) {
            agreed = agreed.min(lcp_len(past, &self.live_suffix));
            if agreed == 0 {
                return None;
            }
        }

        let head = &self.live_suffix[..agreed];
        let cut = head.rfind(char::is_whitespace)?;
        if cut == 0 {
            return None;
        }

        let text = self.live_suffix[..cut].to_string();
        let rest = self.live_suffix[cut..].trim_start().to_string();
        self.live_suffix = rest;
        self.stable_streak = 0;

        // Shift stored deltas into the new coordinate system. Every entry
        // shares the committed head, so stripping is well-defined.
        for past in self.history.iter_mut() {
            let stripped = past.get(cut..).unwrap_or("").trim_start().to_string();
            *past = stripped;
        }

        if self.anchor.is_empty() {
            self.anchor = text.clone();
        } else {
            self.anchor.push(' ');
            self.anchor.push_str(&text);
        }

        Some(self.append_segment(text, tick))
    }

    fn append_segment(&mut self, text: String, tick: u64) -> Segment {
        let segment = Segment {
            id: self.next_segment_id,
            text: text.trim().to_string(),
            finalized_at_tick: tick,
        };
        self.next_segment_id += 1;

        if !self.committed_text.is_empty() {
            self.committed_text.push(' ');
        }
        self.committed_text.push_str(&segment.text);

        self.segments.push(segment.clone());
        segment
    }

    /// Current transcript state (read-only view).
    pub fn state(&self) -> TranscriptState {
        TranscriptState {
            committed: self.committed_text.clone(),
            live_suffix: self.live_suffix.clone(),
            stable_streak: self.stable_streak,
        }
    }

    /// Finalized segments so far, append-only.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The volatile live suffix as of the last tick.
    pub fn live_suffix(&self) -> &str {
        &self.live_suffix
    }

    /// Full committed transcript.
    pub fn committed(&self) -> &str {
        &self.committed_text
    }
}

/// Byte length of the longest common prefix, aligned to char boundaries.
fn lcp_len(a: &str, b: &str) -> usize {
    let mut len = 0;
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            break;
        }
        len += ca.len_utf8();
    }
    len
}
