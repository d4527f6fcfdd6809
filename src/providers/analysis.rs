use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::models::{Coaching, Pace, Report, VocalVariety};

const REPORT_NOTE: &str =
    "These are automated rehearsal indicators. They highlight patterns, not polish or credibility.";

/// Produces a report for a recorded session.
///
/// Any real backend must return the same [`Report`] shape.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(&self, session_id: &str) -> anyhow::Result<Report>;
}

/// Fabricates plausible numbers instead of analysing anything.
pub struct MockAnalysisProvider {
    rng: Mutex<StdRng>,
}

impl Default for MockAnalysisProvider {
    fn default() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

impl MockAnalysisProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn generate(&self) -> Report {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let eyeline: f64 = rng.gen_range(62.0..92.0);
        let confidence: f64 = rng.gen_range(5.8..8.3);

        Report {
            eyeline_percent: eyeline.round() as u8,
            pace: Pace::ALL[rng.gen_range(0..Pace::ALL.len())],
            vocal_variety: VocalVariety::ALL[rng.gen_range(0..VocalVariety::ALL.len())],
            filler_words: rng.gen_range(4..15),
            confidence_score: (confidence * 10.0).round() / 10.0,
            note: REPORT_NOTE.to_string(),
            coaching: default_coaching(),
        }
    }
}

fn default_coaching() -> Coaching {
    Coaching {
        headline: "What stood out most".into(),
        focus_label: "Opening clarity".into(),
        why_it_matters: "People decide very quickly whether to keep watching.".into(),
        quick_fix: "Open with one clear sentence about who you help and how.".into(),
        next_take_prompt: "Record a short 10-12 second version focusing only on clarity.".into(),
        bridge: "If you want help shaping this into a strong GTK, book a quick chat.".into(),
    }
}

#[async_trait]
impl AnalysisProvider for MockAnalysisProvider {
    async fn analyze(&self, _session_id: &str) -> anyhow::Result<Report> {
        Ok(self.generate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fabricated_values_stay_in_range() {
        let provider = MockAnalysisProvider::with_seed(42);
        for _ in 0..1_000 {
            let report = provider.analyze("test").await.unwrap();
            assert!((62..=92).contains(&report.eyeline_percent), "{report:?}");
            assert!((4..15).contains(&report.filler_words), "{report:?}");
            assert!(
                (5.8..=8.3).contains(&report.confidence_score),
                "{report:?}"
            );
            let tenths = report.confidence_score * 10.0;
            assert!((tenths - tenths.round()).abs() < 1e-9);
            assert_eq!(report.coaching.focus_label, "Opening clarity");
        }
    }

    #[tokio::test]
    async fn same_seed_same_report() {
        let a = MockAnalysisProvider::with_seed(9).analyze("x").await.unwrap();
        let b = MockAnalysisProvider::with_seed(9).analyze("y").await.unwrap();
        assert_eq!(a, b);
    }
}
