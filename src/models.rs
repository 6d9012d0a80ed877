use std::fmt;

use serde::{Deserialize, Serialize};

/// One row of the "Student Answers Data" sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub email: String,
    pub last_name: String,
    pub first_name: String,
    pub question_id: String,
    pub answer: String,
    pub is_correct: bool,
    pub text: String,
    pub question: String,
}

/// One row of the "Quiz Details" sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizDetailRecord {
    pub question_id: String,
    pub item_order: Option<i64>,
    pub notes: Option<String>,
    pub question: Option<String>,
}

/// An answer enriched with its question's ordering and notes.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord {
    pub answer: AnswerRecord,
    pub item_order: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentSummary {
    pub email: String,
    pub last_name: String,
    pub first_name: String,
    pub total_correct: usize,
    pub total_items: usize,
    pub percent_score: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentMetrics {
    pub average_score: Option<f64>,
    pub likely_to_pass: usize,
    pub at_risk: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    pub question_id: String,
    pub item_order: Option<i64>,
    pub question: String,
    pub total_answers: usize,
    pub total_correct: usize,
    pub count_a: usize,
    pub count_b: usize,
    pub count_c: usize,
    pub count_d: usize,
    pub percent_correct: f64,
    pub percent_incorrect: f64,
    pub mastery_level: MasteryLevel,
}

impl ItemSummary {
    /// Choice counts in fixed A, B, C, D order.
    pub fn choice_counts(&self) -> [(char, usize); 4] {
        [
            ('A', self.count_a),
            ('B', self.count_b),
            ('C', self.count_c),
            ('D', self.count_d),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MasteryCount {
    pub mastery_level: MasteryLevel,
    pub count: usize,
    pub percentage: f64,
}

/// Instructor prompt for a low mastery question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prompt {
    pub item_order: Option<i64>,
    pub question_id: String,
    pub most_chosen_incorrect_answer: char,
    pub count: usize,
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewEntry {
    pub last_name: String,
    pub first_name: String,
    pub question_id: String,
    pub question: String,
    pub answer: String,
    pub text: String,
    pub notes: Option<String>,
}

/// Passing cutoff for student scores, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum Threshold {
    #[serde(rename = "65")]
    #[value(name = "65")]
    P65,
    #[default]
    #[serde(rename = "70")]
    #[value(name = "70")]
    P70,
    #[serde(rename = "75")]
    #[value(name = "75")]
    P75,
    #[serde(rename = "80")]
    #[value(name = "80")]
    P80,
}

impl Threshold {
    pub const ALL: [Threshold; 4] = [
        Threshold::P65,
        Threshold::P70,
        Threshold::P75,
        Threshold::P80,
    ];

    pub fn percent(self) -> f64 {
        match self {
            Threshold::P65 => 65.0,
            Threshold::P70 => 70.0,
            Threshold::P75 => 75.0,
            Threshold::P80 => 80.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Threshold::P65 => "Hard/Challenging exam",
            Threshold::P70 => "Standard (default)",
            Threshold::P75 => "Relatively manageable exam",
            Threshold::P80 => "Easy exam, mastery expected",
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.percent() as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    AtRisk,
    LikelyToPass,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::AtRisk => "At Risk",
            Status::LikelyToPass => "Likely to Pass",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFilter {
    #[default]
    All,
    AtRisk,
    LikelyToPass,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 3] = [
        StatusFilter::All,
        StatusFilter::LikelyToPass,
        StatusFilter::AtRisk,
    ];

    pub fn matches(self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::AtRisk => status == Status::AtRisk,
            StatusFilter::LikelyToPass => status == Status::LikelyToPass,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::AtRisk => "at-risk",
            StatusFilter::LikelyToPass => "likely-to-pass",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::AtRisk => Status::AtRisk.label(),
            StatusFilter::LikelyToPass => Status::LikelyToPass.label(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MasteryLevel {
    Low,
    Moderate,
    High,
}

impl MasteryLevel {
    pub const ALL: [MasteryLevel; 3] = [
        MasteryLevel::Low,
        MasteryLevel::Moderate,
        MasteryLevel::High,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MasteryLevel::Low => "Low Level Mastery",
            MasteryLevel::Moderate => "Moderate Level Mastery",
            MasteryLevel::High => "High Level Mastery",
        }
    }
}

impl fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MasteryFilter {
    #[default]
    All,
    Low,
    Moderate,
    High,
}

impl MasteryFilter {
    pub const ALL: [MasteryFilter; 4] = [
        MasteryFilter::All,
        MasteryFilter::Low,
        MasteryFilter::Moderate,
        MasteryFilter::High,
    ];

    pub fn matches(self, level: MasteryLevel) -> bool {
        match self {
            MasteryFilter::All => true,
            MasteryFilter::Low => level == MasteryLevel::Low,
            MasteryFilter::Moderate => level == MasteryLevel::Moderate,
            MasteryFilter::High => level == MasteryLevel::High,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            MasteryFilter::All => "all",
            MasteryFilter::Low => "low",
            MasteryFilter::Moderate => "moderate",
            MasteryFilter::High => "high",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MasteryFilter::All => "All",
            MasteryFilter::Low => MasteryLevel::Low.label(),
            MasteryFilter::Moderate => MasteryLevel::Moderate.label(),
            MasteryFilter::High => MasteryLevel::High.label(),
        }
    }
}
