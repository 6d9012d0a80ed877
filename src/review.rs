use crate::models::{JoinedRecord, ReviewEntry};

/// Incorrect answers of one student, in sheet order. An empty result means
/// every answer was correct.
pub fn review_for(joined: &[JoinedRecord], email: &str) -> Vec<ReviewEntry> {
    joined
        .iter()
        .filter(|record| record.answer.email == email && !record.answer.is_correct)
        .map(|record| ReviewEntry {
            last_name: record.answer.last_name.clone(),
            first_name: record.answer.first_name.clone(),
            question_id: record.answer.question_id.clone(),
            question: record.answer.question.clone(),
            answer: record.answer.answer.clone(),
            text: record.answer.text.clone(),
            notes: record.notes.clone(),
        })
        .collect()
}
