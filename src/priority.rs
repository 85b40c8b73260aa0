//! Sigil priority scoring
//!
//! A node's importance is the weighted count of marker sigils in its raw
//! text. Higher scores buy a longer seed snippet when the node collapses.

/// Marker sigils and their weights
pub const SIGIL_WEIGHTS: &[(&str, u32)] = &[("💠", 3), ("✨", 2), ("•", 1)];

/// Priority at or above which a node keeps the long seed snippet
pub const HIGH_PRIORITY: u32 = 3;

/// Pure scorer over [`SIGIL_WEIGHTS`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityScorer;

impl PriorityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Sum of `occurrences(sigil) * weight(sigil)` over all sigils.
    pub fn evaluate(&self, text: &str) -> u32 {
        SIGIL_WEIGHTS
            .iter()
            .map(|(sigil, weight)| text.matches(sigil).count() as u32 * weight)
            .sum()
    }

    /// Score optional content; absent content scores 0.
    pub fn evaluate_opt(&self, text: Option<&str>) -> u32 {
        text.map(|t| self.evaluate(t)).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_scores_zero() {
        let scorer = PriorityScorer::new();
        assert_eq!(scorer.evaluate("nothing special here"), 0);
        assert_eq!(scorer.evaluate(""), 0);
        assert_eq!(scorer.evaluate_opt(None), 0);
    }

    #[test]
    fn test_weights_are_summed() {
        let scorer = PriorityScorer::new();
        assert_eq!(scorer.evaluate("💠Hello"), 3);
        assert_eq!(scorer.evaluate("✨ and ✨"), 4);
        assert_eq!(scorer.evaluate("• one • two 💠 ✨"), 7);
    }

    #[test]
    fn test_single_high_marker_reaches_high_priority() {
        let scorer = PriorityScorer::new();
        assert!(scorer.evaluate("Cycle 3 insight: 💠 structured descent") >= HIGH_PRIORITY);
    }
}
