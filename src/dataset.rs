use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::items;
use crate::loader::LoadedWorkbook;
use crate::models::{
    AnswerRecord, ItemSummary, JoinedRecord, MasteryCount, MasteryFilter, Prompt,
    QuizDetailRecord, ReviewEntry, StatusFilter, StudentMetrics, StudentSummary, Threshold,
};
use crate::review;
use crate::risk;

/// Source rows of one uploaded workbook, immutable for the session.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source_name: String,
    pub loaded_at: DateTime<Utc>,
    pub answers: Vec<AnswerRecord>,
    pub details: Vec<QuizDetailRecord>,
    pub joined: Vec<JoinedRecord>,
}

impl Dataset {
    pub fn new(source_name: impl Into<String>, workbook: LoadedWorkbook) -> Self {
        let joined = join(&workbook.answers, &workbook.details);
        Self {
            source_name: source_name.into(),
            loaded_at: Utc::now(),
            answers: workbook.answers,
            details: workbook.details,
            joined,
        }
    }

    /// Distinct non-blank student emails in summary order.
    pub fn emails(&self) -> Vec<&str> {
        self.answers
            .iter()
            .map(|answer| answer.email.as_str())
            .filter(|email| !email.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Left join of answers onto quiz details by question id. Every answer yields
/// exactly one row; unmatched answers carry no order or notes.
pub fn join(answers: &[AnswerRecord], details: &[QuizDetailRecord]) -> Vec<JoinedRecord> {
    let by_question: HashMap<&str, &QuizDetailRecord> = details
        .iter()
        .map(|detail| (detail.question_id.as_str(), detail))
        .collect();

    answers
        .iter()
        .map(|answer| {
            let detail = by_question.get(answer.question_id.as_str());
            JoinedRecord {
                answer: answer.clone(),
                item_order: detail.and_then(|d| d.item_order),
                notes: detail.and_then(|d| d.notes.clone()),
            }
        })
        .collect()
}

/// User selections driving one dashboard render.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewParams {
    pub threshold: Threshold,
    pub status: StatusFilter,
    pub mastery: MasteryFilter,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
#[error("no student with email \"{0}\" in this workbook")]
pub struct UnknownStudent(pub String);

/// Every table and metric shown for one selection, recomputed from the
/// dataset's source rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub threshold: f64,
    pub threshold_label: &'static str,
    pub metrics: StudentMetrics,
    pub students: Vec<StudentSummary>,
    pub items: Vec<ItemSummary>,
    pub distribution: Vec<MasteryCount>,
    pub prompts: Vec<Prompt>,
    pub selected_email: Option<String>,
    pub review: Vec<ReviewEntry>,
}

impl Dashboard {
    pub fn build(dataset: &Dataset, params: &ViewParams) -> Result<Self, UnknownStudent> {
        let summaries = risk::summarize(&dataset.answers, params.threshold);
        let metrics = risk::metrics(&summaries);

        let all_items = items::summarize(&dataset.joined);
        let distribution = items::mastery_distribution(&all_items);
        let prompts = items::extract_prompts(&all_items);

        let selected_email = match params.email.as_deref().filter(|e| !e.is_empty()) {
            Some(email) if summaries.iter().any(|s| s.email == email) => Some(email.to_string()),
            Some(email) => return Err(UnknownStudent(email.to_string())),
            None => summaries.first().map(|s| s.email.clone()),
        };
        let review = selected_email
            .as_deref()
            .map(|email| review::review_for(&dataset.joined, email))
            .unwrap_or_default();

        tracing::debug!(
            threshold = %params.threshold,
            students = summaries.len(),
            items = all_items.len(),
            prompts = prompts.len(),
            review = review.len(),
            "recomputed dashboard"
        );

        Ok(Self {
            threshold: params.threshold.percent(),
            threshold_label: params.threshold.label(),
            metrics,
            students: risk::filter_by_status(&summaries, params.status),
            items: items::filter_by_mastery(&all_items, params.mastery),
            distribution,
            prompts,
            selected_email,
            review,
        })
    }
}
