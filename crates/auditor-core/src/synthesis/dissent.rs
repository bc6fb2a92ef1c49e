//! Dissent detection and remediation text.

use crate::domain::evidence::truncate_chars;
use crate::domain::{Opinion, SynthesisRule};

use super::policy::SynthesisPolicy;

/// Highest and lowest raw scorers; ties go to the earlier opinion.
///
/// Callers pass opinions in canonical judge order and guarantee non-emptiness.
fn extremes(opinions: &[Opinion]) -> (&Opinion, &Opinion) {
    let mut high = &opinions[0];
    let mut low = &opinions[0];
    for op in &opinions[1..] {
        if op.score > high.score {
            high = op;
        }
        if op.score < low.score {
            low = op;
        }
    }
    (high, low)
}

/// Describe the disagreement when the raw score spread meets the threshold.
pub fn dissent_summary(
    policy: &SynthesisPolicy,
    opinions: &[Opinion],
    fired: &[SynthesisRule],
) -> Option<String> {
    if opinions.is_empty() {
        return None;
    }
    let (high, low) = extremes(opinions);
    let spread = high.score - low.score;
    if spread < policy.dissent_threshold {
        return None;
    }

    let mut summary = format!(
        "Score spread of {spread} between {} ({}) and {} ({}).",
        high.judge, high.score, low.judge, low.score
    );
    if fired.is_empty() {
        summary.push_str(" No arbitration rule fired.");
    } else {
        let names: Vec<String> = fired.iter().map(ToString::to_string).collect();
        summary.push_str(&format!(" Rules applied: {}.", names.join(", ")));
    }
    Some(summary)
}

/// Remediation guidance for a criterion.
///
/// When the lowest raw scorer is below the concern threshold its argument is
/// quoted; otherwise the criterion is closed out generically.
pub fn remediation(policy: &SynthesisPolicy, dimension_name: &str, opinions: &[Opinion]) -> String {
    if opinions.is_empty() {
        return format!("No opinions were rendered for {dimension_name}; re-run the evaluation.");
    }
    let (_, low) = extremes(opinions);
    if low.score < policy.remediation_concern_below {
        let quote = truncate_chars(low.argument.trim(), policy.remediation_quote_chars);
        format!(
            "Address the concerns raised by the {} for {dimension_name}: \"{quote}\"",
            low.judge
        )
    } else {
        format!(
            "{dimension_name} meets expectations; keep the current approach and guard it with regression checks."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Judge;

    fn ops(scores: [u8; 3]) -> Vec<Opinion> {
        Judge::ALL
            .iter()
            .zip(scores)
            .map(|(j, s)| Opinion::new(*j, "dim", s, format!("{j} argues {s}")))
            .collect()
    }

    #[test]
    fn test_dissent_absent_below_threshold() {
        let p = SynthesisPolicy::default();
        assert!(dissent_summary(&p, &ops([3, 4, 4]), &[]).is_none());
    }

    #[test]
    fn test_dissent_names_extremes_and_rules() {
        let p = SynthesisPolicy::default();
        let summary = dissent_summary(&p, &ops([1, 5, 4]), &[SynthesisRule::Security]).unwrap();
        assert!(summary.contains("spread of 4"));
        assert!(summary.contains("Defense (5)"));
        assert!(summary.contains("Prosecutor (1)"));
        assert!(summary.contains("Rule of Security"));
    }

    #[test]
    fn test_dissent_at_exact_threshold() {
        let p = SynthesisPolicy::default();
        let summary = dissent_summary(&p, &ops([2, 4, 3]), &[]).unwrap();
        assert!(summary.contains("No arbitration rule fired"));
    }

    #[test]
    fn test_remediation_quotes_lowest_scorer() {
        let p = SynthesisPolicy::default();
        let mut opinions = ops([4, 5, 2]);
        opinions[2].argument = "x".repeat(500);
        let text = remediation(&p, "Graph Orchestration", &opinions);
        assert!(text.contains("TechLead"));
        assert!(text.contains(&"x".repeat(200)));
        assert!(!text.contains(&"x".repeat(201)));
    }

    #[test]
    fn test_remediation_tie_prefers_canonical_order() {
        let p = SynthesisPolicy::default();
        let text = remediation(&p, "Dim", &ops([2, 5, 2]));
        assert!(text.contains("Prosecutor"));
    }

    #[test]
    fn test_remediation_generic_when_no_low_scorer() {
        let p = SynthesisPolicy::default();
        let text = remediation(&p, "State Management Rigor", &ops([3, 5, 4]));
        assert!(text.starts_with("State Management Rigor meets expectations"));
    }
}
