//! # Confidence Scoring
//!
//! Pure heuristic estimating how likely a resolver's candidate is the track
//! the user asked for. Resolvers with ground-truth certainty (exact catalog
//! id match) report their own confidence and skip the heuristic entirely.
//!
//! The tiering is asymmetric on purpose: title equality disambiguates covers
//! and remasters far better than duration proximity does, so a title-only
//! match outranks a duration-only match.

use crate::model::{SourceCandidate, TrackDescriptor};

/// Scores candidate matches against the requested track.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceScorer {
    duration_tolerance_secs: u64,
}

impl ConfidenceScorer {
    /// Title and duration both match.
    pub const TITLE_AND_DURATION: f64 = 0.95;
    /// Title matches, duration does not (or is unknown).
    pub const TITLE_ONLY: f64 = 0.85;
    /// Duration matches, title does not.
    pub const DURATION_ONLY: f64 = 0.70;
    /// Neither signal matches.
    pub const NO_SIGNAL: f64 = 0.50;

    /// Creates a scorer with the given duration tolerance in seconds.
    pub fn new(duration_tolerance_secs: u64) -> Self {
        Self {
            duration_tolerance_secs,
        }
    }

    /// Scores a candidate against the requested track, in `[0, 1]`.
    ///
    /// A resolver-supplied confidence is trusted verbatim, clamped only to
    /// keep the map invariant.
    pub fn score(&self, original: &TrackDescriptor, candidate: &SourceCandidate) -> f64 {
        if let Some(reported) = candidate.confidence {
            return reported.clamp(0.0, 1.0);
        }

        let title_match = candidate
            .title
            .as_deref()
            .map(|title| Self::normalize(title) == Self::normalize(&original.title))
            .unwrap_or(false);

        let duration_match = match (original.duration_secs, candidate.duration_secs) {
            (Some(wanted), Some(got)) => wanted.abs_diff(got) <= self.duration_tolerance_secs,
            _ => false,
        };

        match (title_match, duration_match) {
            (true, true) => Self::TITLE_AND_DURATION,
            (true, false) => Self::TITLE_ONLY,
            (false, true) => Self::DURATION_ONLY,
            (false, false) => Self::NO_SIGNAL,
        }
    }

    fn normalize(title: &str) -> String {
        title.trim().to_lowercase()
    }
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(10)
    }
}
