//! Duplicate-turn suppression for end-of-turn transcripts.
//!
//! Upstream turn detection can emit the same utterance more than once (a
//! `transcription` with `end_of_turn` followed by a `final` carrying identical
//! text, or repeated end-of-turn events while the speaker pauses). The filter
//! decides which transcripts are rendered; everything else is dropped before
//! it reaches the transcript log.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Tunables for [`TurnFilter`].
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Transcripts whose normalized form has this many characters or fewer
    /// are treated as noise ("mm", "uh") and rejected.
    pub min_chars: usize,
    /// Minimum time between two accepted transcripts, regardless of content.
    pub min_gap: Duration,
    /// How long a normalized transcript stays in the seen set. A genuine
    /// repeat ("yes" ... "yes") is accepted again once this expires.
    pub seen_ttl: Duration,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_chars: 3,
            min_gap: Duration::from_millis(2000),
            seen_ttl: Duration::from_millis(2000),
        }
    }
}

/// Stateful filter deciding which end-of-turn transcripts get rendered.
///
/// State is scoped to one streaming session. Create a fresh filter per
/// connection so an utterance from a previous session can never suppress
/// the first turn of the next one.
#[derive(Debug)]
pub struct TurnFilter {
    config: FilterConfig,
    seen: HashMap<String, Instant>,
    last_accept: Option<Instant>,
}

impl TurnFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            seen: HashMap::new(),
            last_accept: None,
        }
    }

    /// Collapse a transcript to its comparison key: lowercased, interior
    /// whitespace runs collapsed to single spaces, no leading or trailing
    /// whitespace.
    pub fn normalize(text: &str) -> String {
        text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Decide whether `text` should be rendered, using the current time.
    pub fn accept(&mut self, text: &str) -> bool {
        self.accept_at(text, Instant::now())
    }

    /// Clock-injected variant of [`accept`](Self::accept) so tests can step
    /// time deterministically.
    pub fn accept_at(&mut self, text: &str, now: Instant) -> bool {
        self.evict_expired(now);

        let key = Self::normalize(text);
        if key.chars().count() <= self.config.min_chars {
            return false;
        }
        if self.seen.contains_key(&key) {
            return false;
        }
        if let Some(last) = self.last_accept {
            if now.duration_since(last) <= self.config.min_gap {
                return false;
            }
        }

        self.seen.insert(key, now);
        self.last_accept = Some(now);
        true
    }

    /// Forget all history. Called when a session ends so the next session
    /// starts from a clean slate.
    pub fn reset(&mut self) {
        self.seen.clear();
        self.last_accept = None;
    }

    fn evict_expired(&mut self, now: Instant) {
        let ttl = self.config.seen_ttl;
        self.seen.retain(|_, inserted| now.duration_since(*inserted) <= ttl);
    }
}

impl Default for TurnFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}
