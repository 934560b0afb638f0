//! Composing the immutable share record from a finished run.
//!
//! The record is the only thing the card renderer sees. Field order is
//! fixed by the struct definition, so its serde_json serialization is
//! deterministic and doubles as the render-cache fingerprint.

use serde::{Deserialize, Serialize};

use crate::domain::scoring::{self, ScoreBand, Tier};
use crate::game::state::GameSnapshot;

/// Radar chart axes, each on a 0..=100 scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartData {
    pub memory: u32,
    pub attention: u32,
    pub speed: u32,
}

/// Summary of one finished run, frozen for rendering and sharing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub score: u32,
    pub tier: Tier,
    /// 0..=95. Capped so the card never claims "top 0%".
    pub percentile: u32,
    /// 0..=100, rounded.
    pub error_rate: u32,
    /// "m:ss"
    pub completion_time: String,
    pub suggestions: Vec<String>,
    pub chart: ChartData,
}

pub const DEFAULT_SUGGESTIONS: [&str; 3] = [
    "Continue training to improve memory capacity",
    "Try longer digit sequences for better results",
    "Practice regularly to maintain progress",
];

/// Build the record for a finished run.
///
/// `elapsed_ms` comes from the machine's tick count, so the completion
/// time reflects the actual run rather than a placeholder.
pub fn compose(
    snapshot: &GameSnapshot,
    max_level: u32,
    bands: &[ScoreBand],
    elapsed_ms: u64,
) -> ShareRecord {
    let total = snapshot.total_score;
    let levels_played = snapshot.results.len() as u32;
    let correct = snapshot.results.iter().filter(|r| r.correct).count() as u32;

    let error_rate = if levels_played > 0 {
        let wrong = (levels_played - correct) as f64;
        (wrong / levels_played as f64 * 100.0).round() as u32
    } else {
        0
    };

    ShareRecord {
        score: total,
        tier: scoring::band_for(bands, total).tier,
        percentile: scoring::percentile(total, max_level),
        error_rate,
        completion_time: format_mmss(elapsed_ms),
        suggestions: DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        chart: ChartData {
            memory: (total / 5).min(100),
            attention: (total / 6).min(100),
            speed: (total / 4).min(100),
        },
    }
}

fn format_mmss(elapsed_ms: u64) -> String {
    let secs = elapsed_ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::LevelResult;

    fn snapshot(results: Vec<(bool, u32)>) -> GameSnapshot {
        let results: Vec<LevelResult> = results
            .into_iter()
            .enumerate()
            .map(|(i, (correct, score))| LevelResult { level: i as u32 + 1, correct, score })
            .collect();
        GameSnapshot {
            level: results.len() as u32,
            total_score: results.iter().filter(|r| r.correct).map(|r| r.score).sum(),
            active: false,
            target: String::new(),
            results,
        }
    }

    #[test]
    fn full_clear_run() {
        // All 12 levels correct: 5+10+...+60 = 390
        let snap = snapshot((1..=12).map(|l| (true, l * 5)).collect());
        let rec = compose(&snap, 12, &scoring::default_bands(), 260_000);

        assert_eq!(rec.score, 390);
        assert_eq!(rec.tier, Tier::Excellent); // 390 < 400, one band short of Master
        assert_eq!(rec.error_rate, 0);
        assert_eq!(rec.percentile, 95); // 390/390 capped at 95
        assert_eq!(rec.completion_time, "4:20");
        assert_eq!(rec.chart.memory, 78);
        assert_eq!(rec.chart.attention, 65);
        assert_eq!(rec.chart.speed, 97);
        assert_eq!(rec.suggestions.len(), 3);
    }

    #[test]
    fn error_rate_rounds() {
        // 1 wrong of 6 → 16.67 → 17
        let mut results: Vec<(bool, u32)> = (1..=5).map(|l| (true, l * 5)).collect();
        results.push((false, 0));
        let rec = compose(&snapshot(results), 12, &scoring::default_bands(), 0);
        assert_eq!(rec.error_rate, 17);
    }

    #[test]
    fn empty_run_is_all_zeroes() {
        let rec = compose(&snapshot(vec![]), 12, &scoring::default_bands(), 0);
        assert_eq!(rec.score, 0);
        assert_eq!(rec.error_rate, 0);
        assert_eq!(rec.percentile, 0);
        assert_eq!(rec.tier, Tier::Beginner);
        assert_eq!(rec.completion_time, "0:00");
    }

    #[test]
    fn chart_axes_cap_at_100() {
        // 20-level play-through variant can exceed the caps
        let snap = snapshot((1..=20).map(|l| (true, l * 5)).collect()); // 1050
        let rec = compose(&snap, 20, &scoring::default_bands(), 0);
        assert_eq!(rec.chart.memory, 100);
        assert_eq!(rec.chart.attention, 100);
        assert_eq!(rec.chart.speed, 100);
    }

    #[test]
    fn serialization_is_deterministic() {
        let snap = snapshot(vec![(true, 5), (true, 10)]);
        let a = compose(&snap, 12, &scoring::default_bands(), 30_000);
        let b = compose(&snap, 12, &scoring::default_bands(), 30_000);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
