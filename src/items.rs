use std::collections::BTreeMap;

use crate::models::{
    ItemSummary, JoinedRecord, MasteryCount, MasteryFilter, MasteryLevel, Prompt,
};

/// Per-question analysis, ordered by item order with unordered questions last.
/// Rows without a question id belong to no item.
pub fn summarize(joined: &[JoinedRecord]) -> Vec<ItemSummary> {
    let mut groups: BTreeMap<&str, ItemSummary> = BTreeMap::new();

    for record in joined.iter().filter(|r| !r.answer.question_id.is_empty()) {
        let answer = &record.answer;
        let entry = groups
            .entry(answer.question_id.as_str())
            .or_insert_with(|| ItemSummary {
                question_id: answer.question_id.clone(),
                item_order: None,
                question: String::new(),
                total_answers: 0,
                total_correct: 0,
                count_a: 0,
                count_b: 0,
                count_c: 0,
                count_d: 0,
                percent_correct: 0.0,
                percent_incorrect: 0.0,
                mastery_level: MasteryLevel::Low,
            });

        if entry.item_order.is_none() {
            entry.item_order = record.item_order;
        }
        if entry.question.is_empty() {
            entry.question = answer.question.clone();
        }

        entry.total_answers += 1;
        if answer.is_correct {
            entry.total_correct += 1;
        }
        match answer.answer.as_str() {
            "A" => entry.count_a += 1,
            "B" => entry.count_b += 1,
            "C" => entry.count_c += 1,
            "D" => entry.count_d += 1,
            _ => {}
        }
    }

    let mut items: Vec<ItemSummary> = groups
        .into_values()
        .map(|mut item| {
            item.percent_correct = item.total_correct as f64 * 100.0 / item.total_answers as f64;
            item.percent_incorrect = 100.0 - item.percent_correct;
            item.mastery_level = mastery_level(item.percent_correct);
            item
        })
        .collect();

    items.sort_by_key(|item| (item.item_order.is_none(), item.item_order));
    items
}

pub fn mastery_level(percent_correct: f64) -> MasteryLevel {
    match percent_correct {
        p if p < 60.0 => MasteryLevel::Low,
        p if p < 80.0 => MasteryLevel::Moderate,
        _ => MasteryLevel::High,
    }
}

pub fn filter_by_mastery(items: &[ItemSummary], filter: MasteryFilter) -> Vec<ItemSummary> {
    items
        .iter()
        .filter(|item| filter.matches(item.mastery_level))
        .cloned()
        .collect()
}

/// Count and share of items per mastery level; every level is listed, even
/// when no item falls in it.
pub fn mastery_distribution(items: &[ItemSummary]) -> Vec<MasteryCount> {
    let total = items.len();

    MasteryLevel::ALL
        .into_iter()
        .map(|level| {
            let count = items.iter().filter(|item| item.mastery_level == level).count();
            MasteryCount {
                mastery_level: level,
                count,
                percentage: if total == 0 {
                    0.0
                } else {
                    count as f64 * 100.0 / total as f64
                },
            }
        })
        .collect()
}

/// Most chosen letter for every low mastery item. Ties go to the earliest
/// letter in A, B, C, D order.
pub fn extract_prompts(items: &[ItemSummary]) -> Vec<Prompt> {
    items
        .iter()
        .filter(|item| item.mastery_level == MasteryLevel::Low)
        .map(|item| {
            let (letter, count) = item
                .choice_counts()
                .into_iter()
                .fold(('A', item.count_a), |best, candidate| {
                    if candidate.1 > best.1 {
                        candidate
                    } else {
                        best
                    }
                });

            Prompt {
                item_order: item.item_order,
                question_id: item.question_id.clone(),
                most_chosen_incorrect_answer: letter,
                count,
                question: item.question.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnswerRecord;

    fn joined(question_id: &str, answer: &str, is_correct: bool, order: Option<i64>) -> JoinedRecord {
        JoinedRecord {
            answer: AnswerRecord {
                email: format!("{answer}@example.com"),
                last_name: "Lee".to_string(),
                first_name: "Avery".to_string(),
                question_id: question_id.to_string(),
                answer: answer.to_string(),
                is_correct,
                text: String::new(),
                question: format!("Question {question_id}"),
            },
            item_order: order,
            notes: None,
        }
    }

    #[test]
    fn counts_choices_and_mastery() {
        let rows = vec![
            joined("q1", "A", true, Some(1)),
            joined("q1", "A", true, Some(1)),
            joined("q1", "B", true, Some(1)),
            joined("q1", "C", false, Some(1)),
        ];
        let items = summarize(&rows);
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item.count_a, 2);
        assert_eq!(item.count_b, 1);
        assert_eq!(item.count_c, 1);
        assert_eq!(item.count_d, 0);
        assert_eq!(item.percent_correct, 75.0);
        assert_eq!(item.percent_incorrect, 25.0);
        assert_eq!(item.mastery_level, MasteryLevel::Moderate);
        assert_eq!(item.question, "Question q1");
    }

    #[test]
    fn unknown_letters_count_only_toward_totals() {
        let rows = vec![
            joined("q1", "a", false, None),
            joined("q1", " B", false, None),
            joined("q1", "E", false, None),
            joined("q1", "D", true, None),
        ];
        let items = summarize(&rows);
        let item = &items[0];
        assert_eq!(item.total_answers, 4);
        assert_eq!(item.count_a + item.count_b + item.count_c + item.count_d, 1);
    }

    #[test]
    fn rows_without_question_id_form_no_item() {
        let rows = vec![
            joined("q1", "A", true, Some(1)),
            joined("", "B", false, None),
        ];
        let items = summarize(&rows);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].question_id, "q1");
        assert_eq!(items[0].total_answers, 1);
    }

    #[test]
    fn mastery_boundaries_are_half_open() {
        assert_eq!(mastery_level(59.99), MasteryLevel::Low);
        assert_eq!(mastery_level(60.0), MasteryLevel::Moderate);
        assert_eq!(mastery_level(79.99), MasteryLevel::Moderate);
        assert_eq!(mastery_level(80.0), MasteryLevel::High);
        assert_eq!(mastery_level(100.0), MasteryLevel::High);
    }

    #[test]
    fn percentages_always_sum_to_hundred() {
        let rows: Vec<JoinedRecord> = (0..7)
            .map(|i| joined("q1", "A", i % 3 == 0, None))
            .chain((0..3).map(|i| joined("q2", "B", i == 0, None)))
            .collect();
        for item in summarize(&rows) {
            assert!((item.percent_correct + item.percent_incorrect - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn orders_by_item_order_with_missing_last() {
        let rows = vec![
            joined("z-orphan", "A", true, None),
            joined("q3", "A", true, Some(3)),
            joined("a-orphan", "A", true, None),
            joined("q1", "A", true, Some(1)),
        ];
        let ids: Vec<String> = summarize(&rows).into_iter().map(|i| i.question_id).collect();
        assert_eq!(ids, vec!["q1", "q3", "a-orphan", "z-orphan"]);
    }

    #[test]
    fn low_items_prompt_the_majority_choice() {
        let mut rows: Vec<JoinedRecord> = Vec::new();
        rows.extend((0..2).map(|_| joined("q2", "A", true, Some(2))));
        rows.extend((0..4).map(|_| joined("q2", "C", false, Some(2))));
        rows.extend((0..4).map(|_| joined("q2", "D", false, Some(2))));
        rows.push(joined("q1", "A", true, Some(1)));

        let items = summarize(&rows);
        assert_eq!(items[1].percent_correct, 20.0);
        assert_eq!(items[1].mastery_level, MasteryLevel::Low);

        let prompts = extract_prompts(&items);
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].question_id, "q2");
        assert_eq!(prompts[0].most_chosen_incorrect_answer, 'C');
        assert_eq!(prompts[0].count, 4);
        assert_eq!(prompts[0].item_order, Some(2));
    }

    #[test]
    fn prompt_ties_break_toward_a() {
        let rows = vec![
            joined("q1", "B", false, None),
            joined("q1", "A", false, None),
            joined("q1", "D", false, None),
        ];
        let prompts = extract_prompts(&summarize(&rows));
        assert_eq!(prompts[0].most_chosen_incorrect_answer, 'A');
        assert_eq!(prompts[0].count, 1);
    }

    #[test]
    fn no_low_items_means_no_prompts() {
        let rows = vec![joined("q1", "A", true, Some(1))];
        assert!(extract_prompts(&summarize(&rows)).is_empty());
    }

    #[test]
    fn distribution_lists_every_level() {
        let rows = vec![
            joined("q1", "A", true, Some(1)),
            joined("q2", "A", false, Some(2)),
            joined("q3", "A", true, Some(3)),
            joined("q4", "A", true, Some(4)),
        ];
        let distribution = mastery_distribution(&summarize(&rows));
        let levels: Vec<MasteryLevel> = distribution.iter().map(|d| d.mastery_level).collect();
        assert_eq!(levels, MasteryLevel::ALL.to_vec());
        assert_eq!(distribution[0].count, 1);
        assert_eq!(distribution[0].percentage, 25.0);
        assert_eq!(distribution[1].count, 0);
        assert_eq!(distribution[1].percentage, 0.0);
        assert_eq!(distribution[2].count, 3);
        assert_eq!(distribution[2].percentage, 75.0);

        assert!(mastery_distribution(&[]).iter().all(|d| d.percentage == 0.0));
    }

    #[test]
    fn mastery_filter_all_is_identity() {
        let rows = vec![
            joined("q1", "A", true, Some(1)),
            joined("q2", "A", false, Some(2)),
        ];
        let items = summarize(&rows);
        assert_eq!(filter_by_mastery(&items, MasteryFilter::All), items);

        let low = filter_by_mastery(&items, MasteryFilter::Low);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].question_id, "q2");
        assert!(filter_by_mastery(&items, MasteryFilter::Moderate).is_empty());
    }
}
