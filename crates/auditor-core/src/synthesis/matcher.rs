//! Pluggable matching between a success claim and contradicting evidence.

use crate::domain::{Evidence, Opinion, Presence};

/// Decides whether an evidence record contradicts an opinion's success claim.
///
/// The engine only asks this for opinions that claim success and for
/// evidence filed under the same criterion.
pub trait EvidenceMatcher: Send + Sync + std::fmt::Debug {
    fn contradicts(&self, opinion: &Opinion, evidence: &Evidence, min_confidence: f64) -> bool;
}

/// Any confident negative finding on the criterion contradicts the claim.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsenceMatcher;

impl EvidenceMatcher for AbsenceMatcher {
    fn contradicts(&self, _opinion: &Opinion, evidence: &Evidence, min_confidence: f64) -> bool {
        evidence.found == Presence::Absent && evidence.confidence > min_confidence
    }
}

/// Stricter variant: the negative finding's goal must also be named in the
/// opinion's argument (case-insensitive substring).
#[derive(Debug, Clone, Copy, Default)]
pub struct GoalMentionMatcher;

impl EvidenceMatcher for GoalMentionMatcher {
    fn contradicts(&self, opinion: &Opinion, evidence: &Evidence, min_confidence: f64) -> bool {
        AbsenceMatcher.contradicts(opinion, evidence, min_confidence)
            && opinion
                .argument
                .to_lowercase()
                .contains(&evidence.goal.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Judge;

    fn absent(goal: &str, confidence: f64) -> Evidence {
        Evidence::new(goal, Presence::Absent, "src/", "not there", confidence)
    }

    #[test]
    fn test_absence_matcher_requires_confidence_above_floor() {
        let op = Opinion::new(Judge::Defense, "d", 5, "great");
        assert!(AbsenceMatcher.contradicts(&op, &absent("g", 0.9), 0.8));
        assert!(!AbsenceMatcher.contradicts(&op, &absent("g", 0.8), 0.8));
    }

    #[test]
    fn test_absence_matcher_ignores_present_and_unknown() {
        let op = Opinion::new(Judge::Defense, "d", 5, "great");
        let present = Evidence::new("g", Presence::Present, "x", "ok", 1.0);
        let unknown = Evidence::new("g", Presence::Unknown, "x", "?", 1.0);
        assert!(!AbsenceMatcher.contradicts(&op, &present, 0.8));
        assert!(!AbsenceMatcher.contradicts(&op, &unknown, 0.8));
    }

    #[test]
    fn test_goal_mention_matcher_needs_goal_in_argument() {
        let ev = absent("Theoretical Depth", 0.9);
        let naming = Opinion::new(Judge::Defense, "d", 5, "The theoretical depth is superb");
        let silent = Opinion::new(Judge::Defense, "d", 5, "Great work overall");
        assert!(GoalMentionMatcher.contradicts(&naming, &ev, 0.8));
        assert!(!GoalMentionMatcher.contradicts(&silent, &ev, 0.8));
    }
}
