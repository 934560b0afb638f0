//! Scoring: per-level points, performance bands, percentile math.
//!
//! Band thresholds are data, not literals — the two historical game
//! variants (390-point and 1050-point scales) differ only in the numbers
//! they feed in here.

use serde::{Deserialize, Serialize};

/// Internal performance bracket derived from the total score.
/// Ordering matters: badges and colors are keyed off this, not the label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Beginner,
    Good,
    Excellent,
    Master,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Beginner => "Beginner",
            Tier::Good => "Good",
            Tier::Excellent => "Excellent",
            Tier::Master => "Master",
        }
    }
}

/// One step of the performance step-function: applies when
/// `total_score >= min_score`. Bands are kept sorted descending.
#[derive(Clone, Debug)]
pub struct ScoreBand {
    pub min_score: u32,
    pub tier: Tier,
    /// User-facing performance line. Distinct bands may carry the same
    /// label (the historical defaults do; see DESIGN.md).
    pub label: String,
}

/// Points for clearing level `n` (1-based).
pub fn level_score(level: u32) -> u32 {
    level * 5
}

/// Theoretical maximum total: `sum(level * 5)` over all levels.
/// Recomputed from `max_level` rather than baked in, so percentile
/// normalization stays correct when the level count is reconfigured.
pub fn max_possible_score(max_level: u32) -> u32 {
    5 * max_level * (max_level + 1) / 2
}

/// Percentile ranking, capped at 95 so the card never claims "Top 0%".
pub fn percentile(total_score: u32, max_level: u32) -> u32 {
    let max = max_possible_score(max_level).max(1);
    (total_score * 100 / max).min(95)
}

/// Find the band for a total score. Bands are scanned in order, so the
/// slice must be sorted by `min_score` descending; the last band acts as
/// the catch-all and its `min_score` should be 0.
pub fn band_for<'a>(bands: &'a [ScoreBand], total_score: u32) -> &'a ScoreBand {
    bands
        .iter()
        .find(|b| total_score >= b.min_score)
        .unwrap_or_else(|| bands.last().expect("band table must not be empty"))
}

/// The variant-A defaults (12 levels, run ends on first mistake).
///
/// The ≥250 and ≥150 bands intentionally share a label but carry
/// different tiers; the duplicate wording is long-shipped copy.
pub fn default_bands() -> Vec<ScoreBand> {
    vec![
        ScoreBand {
            min_score: 400,
            tier: Tier::Master,
            label: "Excellent! Outstanding memory!".into(),
        },
        ScoreBand {
            min_score: 250,
            tier: Tier::Excellent,
            label: "Good! Keep it up!".into(),
        },
        ScoreBand {
            min_score: 150,
            tier: Tier::Good,
            label: "Good! Keep it up!".into(),
        },
        ScoreBand {
            min_score: 0,
            tier: Tier::Beginner,
            label: "Normal! Practice more!".into(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_points() {
        assert_eq!(level_score(1), 5);
        assert_eq!(level_score(6), 30);
    }

    #[test]
    fn max_score_follows_level_count() {
        assert_eq!(max_possible_score(12), 390);
        assert_eq!(max_possible_score(20), 1050);
        assert_eq!(max_possible_score(1), 5);
    }

    #[test]
    fn percentile_capped_at_95() {
        assert_eq!(percentile(390, 12), 95);
        assert_eq!(percentile(0, 12), 0);
        // 75 / 390 ≈ 19%
        assert_eq!(percentile(75, 12), 19);
    }

    #[test]
    fn band_lookup() {
        let bands = default_bands();
        assert_eq!(band_for(&bands, 400).tier, Tier::Master);
        assert_eq!(band_for(&bands, 399).tier, Tier::Excellent);
        assert_eq!(band_for(&bands, 250).tier, Tier::Excellent);
        assert_eq!(band_for(&bands, 249).tier, Tier::Good);
        assert_eq!(band_for(&bands, 149).tier, Tier::Beginner);
        assert_eq!(band_for(&bands, 0).tier, Tier::Beginner);
    }

    #[test]
    fn duplicate_label_bands_stay_distinct() {
        let bands = default_bands();
        let upper = band_for(&bands, 300);
        let lower = band_for(&bands, 200);
        assert_eq!(upper.label, lower.label);
        assert_ne!(upper.tier, lower.tier);
    }
}
