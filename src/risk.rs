use std::collections::BTreeMap;

use crate::models::{AnswerRecord, Status, StatusFilter, StudentMetrics, StudentSummary, Threshold};

/// Groups answers by student email, ordered by email. Rows without an
/// email belong to no student.
pub fn summarize(answers: &[AnswerRecord], threshold: Threshold) -> Vec<StudentSummary> {
    let mut groups: BTreeMap<&str, StudentSummary> = BTreeMap::new();

    for answer in answers.iter().filter(|a| !a.email.is_empty()) {
        let entry = groups
            .entry(answer.email.as_str())
            .or_insert_with(|| StudentSummary {
                email: answer.email.clone(),
                last_name: answer.last_name.clone(),
                first_name: answer.first_name.clone(),
                total_correct: 0,
                total_items: 0,
                percent_score: 0.0,
                status: Status::AtRisk,
            });

        entry.total_items += 1;
        if answer.is_correct {
            entry.total_correct += 1;
        }
    }

    groups
        .into_values()
        .map(|mut summary| {
            summary.percent_score = percent_score(summary.total_correct, summary.total_items);
            summary.status = classify(summary.percent_score, threshold);
            summary
        })
        .collect()
}

/// Percentage rounded to two decimals, exact ties to even.
pub fn percent_score(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = correct as f64 / total as f64 * 100.0;
    (raw * 100.0).round_ties_even() / 100.0
}

/// A score equal to the threshold passes.
pub fn classify(percent_score: f64, threshold: Threshold) -> Status {
    if percent_score < threshold.percent() {
        Status::AtRisk
    } else {
        Status::LikelyToPass
    }
}

pub fn metrics(summaries: &[StudentSummary]) -> StudentMetrics {
    let average_score = if summaries.is_empty() {
        None
    } else {
        let total: f64 = summaries.iter().map(|s| s.percent_score).sum();
        Some(total / summaries.len() as f64)
    };

    StudentMetrics {
        average_score,
        likely_to_pass: summaries
            .iter()
            .filter(|s| s.status == Status::LikelyToPass)
            .count(),
        at_risk: summaries
            .iter()
            .filter(|s| s.status == Status::AtRisk)
            .count(),
    }
}

pub fn filter_by_status(summaries: &[StudentSummary], filter: StatusFilter) -> Vec<StudentSummary> {
    summaries
        .iter()
        .filter(|s| filter.matches(s.status))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(email: &str, question_id: &str, is_correct: bool) -> AnswerRecord {
        AnswerRecord {
            email: email.to_string(),
            last_name: "Lee".to_string(),
            first_name: "Avery".to_string(),
            question_id: question_id.to_string(),
            answer: "A".to_string(),
            is_correct,
            text: String::new(),
            question: String::new(),
        }
    }

    fn two_students() -> Vec<AnswerRecord> {
        vec![
            answer("s1", "q1", true),
            answer("s1", "q2", false),
            answer("s2", "q1", true),
            answer("s2", "q2", true),
        ]
    }

    #[test]
    fn classifies_against_threshold() {
        let summaries = summarize(&two_students(), Threshold::P70);
        assert_eq!(summaries.len(), 2);

        assert_eq!(summaries[0].email, "s1");
        assert_eq!(summaries[0].total_correct, 1);
        assert_eq!(summaries[0].total_items, 2);
        assert_eq!(summaries[0].percent_score, 50.0);
        assert_eq!(summaries[0].status, Status::AtRisk);

        assert_eq!(summaries[1].percent_score, 100.0);
        assert_eq!(summaries[1].status, Status::LikelyToPass);

        let metrics = metrics(&summaries);
        assert_eq!(metrics.average_score, Some(75.0));
        assert_eq!(metrics.at_risk, 1);
        assert_eq!(metrics.likely_to_pass, 1);
    }

    #[test]
    fn boundary_score_passes() {
        for threshold in Threshold::ALL {
            assert_eq!(classify(threshold.percent(), threshold), Status::LikelyToPass);
            assert_eq!(classify(threshold.percent() - 0.01, threshold), Status::AtRisk);
        }

        let answers: Vec<AnswerRecord> = (0..20)
            .map(|i| answer("s1", &format!("q{i}"), i < 15))
            .collect();
        let summaries = summarize(&answers, Threshold::P75);
        assert_eq!(summaries[0].percent_score, 75.0);
        assert_eq!(summaries[0].status, Status::LikelyToPass);
    }

    #[test]
    fn scores_round_to_two_decimals() {
        assert_eq!(percent_score(2, 3), 66.67);
        assert_eq!(percent_score(1, 3), 33.33);
        assert_eq!(percent_score(0, 0), 0.0);
        assert_eq!(percent_score(1, 32), 3.12);
        assert_eq!(percent_score(3, 32), 9.38);
    }

    #[test]
    fn keeps_first_seen_name() {
        let mut renamed = answer("s1", "q2", true);
        renamed.first_name = "Ave".to_string();
        let summaries = summarize(&[answer("s1", "q1", true), renamed], Threshold::P70);
        assert_eq!(summaries[0].first_name, "Avery");
    }

    #[test]
    fn status_filter_is_post_aggregation() {
        let summaries = summarize(&two_students(), Threshold::P70);

        assert_eq!(filter_by_status(&summaries, StatusFilter::All), summaries);

        let at_risk = filter_by_status(&summaries, StatusFilter::AtRisk);
        let passing = filter_by_status(&summaries, StatusFilter::LikelyToPass);
        assert_eq!(at_risk.len(), 1);
        assert_eq!(at_risk[0].email, "s1");
        assert_eq!(at_risk.len() + passing.len(), summaries.len());
    }

    #[test]
    fn rows_without_email_form_no_student() {
        let answers = vec![answer("a@x.com", "q1", true), answer("", "q1", false)];
        let summaries = summarize(&answers, Threshold::P70);

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].email, "a@x.com");

        let metrics = metrics(&summaries);
        assert_eq!(metrics.average_score, Some(100.0));
        assert_eq!(metrics.at_risk, 0);
        assert_eq!(metrics.likely_to_pass, 1);
    }

    #[test]
    fn empty_input_has_no_average() {
        let metrics = metrics(&summarize(&[], Threshold::P70));
        assert_eq!(metrics.average_score, None);
        assert_eq!(metrics.at_risk + metrics.likely_to_pass, 0);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let answers = two_students();
        assert_eq!(
            summarize(&answers, Threshold::P80),
            summarize(&answers, Threshold::P80)
        );
    }
}
