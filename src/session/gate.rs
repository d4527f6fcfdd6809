use serde::{Deserialize, Serialize};

pub const FREE_TAKE_LIMIT: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateDecision {
    pub allowed: bool,
    pub message: String,
}

/// Decides whether another take may be recorded.
///
/// The decision is a pure function of the take count; messaging varies with
/// the take about to be attempted but never changes the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TakeGate {
    limit: u32,
}

impl Default for TakeGate {
    fn default() -> Self {
        Self {
            limit: FREE_TAKE_LIMIT,
        }
    }
}

impl TakeGate {
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn evaluate(&self, take_count: u32) -> GateDecision {
        if take_count >= self.limit {
            return GateDecision {
                allowed: false,
                message: self.limit_notice(),
            };
        }

        GateDecision {
            allowed: true,
            message: Self::note_for_take(take_count.saturating_add(1)).to_string(),
        }
    }

    pub fn limit_notice(&self) -> String {
        format!(
            "You've used your {} free takes. Please book a quick review to keep going.",
            self.limit
        )
    }

    /// Note shown alongside take `take` (1-based).
    pub fn note_for_take(take: u32) -> &'static str {
        match take {
            0 | 1 => "First takes are about getting comfortable. Clarity comes next.",
            2 => "This is where most people start to sound more natural.",
            _ => "By now, you're refining rather than starting from scratch.",
        }
    }

    pub fn progress_label(&self, take: u32) -> String {
        format!("Take {take} of {}", self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_below_limit_and_blocks_at_or_above() {
        let gate = TakeGate::default();
        for n in 0..3 {
            assert!(gate.evaluate(n).allowed, "take count {n} should be allowed");
        }
        for n in [3, 4, 10, u32::MAX] {
            assert!(!gate.evaluate(n).allowed, "take count {n} should be blocked");
        }
    }

    #[test]
    fn message_tracks_upcoming_take() {
        let gate = TakeGate::default();
        assert!(gate.evaluate(0).message.starts_with("First takes"));
        assert!(gate.evaluate(1).message.contains("more natural"));
        assert!(gate.evaluate(2).message.contains("refining"));
        assert!(gate.evaluate(3).message.contains("book a quick review"));
    }

    #[test]
    fn custom_limit_moves_the_cutoff() {
        let gate = TakeGate::new(5);
        assert!(gate.evaluate(4).allowed);
        assert!(!gate.evaluate(5).allowed);
        assert!(gate.limit_notice().contains("5 free takes"));
        assert_eq!(gate.progress_label(2), "Take 2 of 5");
    }
}
