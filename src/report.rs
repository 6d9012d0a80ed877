use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::dataset::Dashboard;
use crate::models::{ItemSummary, MasteryLevel};

/// Tables that can be exported as CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportTable {
    Students,
    Items,
    Distribution,
    Prompts,
    Review,
}

impl ExportTable {
    pub fn name(self) -> &'static str {
        match self {
            ExportTable::Students => "students",
            ExportTable::Items => "items",
            ExportTable::Distribution => "distribution",
            ExportTable::Prompts => "prompts",
            ExportTable::Review => "review",
        }
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.2}%"))
        .unwrap_or_else(|| "n/a".to_string())
}

pub fn format_order(order: Option<i64>) -> String {
    order.map(|o| o.to_string()).unwrap_or_default()
}

pub fn build_report(source: &str, generated_at: DateTime<Utc>, dashboard: &Dashboard) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Quiz Results Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        source,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Student Scores Summary");
    let _ = writeln!(
        output,
        "Threshold {}% ({})",
        dashboard.threshold, dashboard.threshold_label
    );
    let _ = writeln!(
        output,
        "- Average score: {}",
        format_percent(dashboard.metrics.average_score)
    );
    let _ = writeln!(output, "- Likely to pass: {}", dashboard.metrics.likely_to_pass);
    let _ = writeln!(output, "- At risk: {}", dashboard.metrics.at_risk);
    let _ = writeln!(output);

    if dashboard.students.is_empty() {
        let _ = writeln!(output, "No students match this filter.");
    } else {
        let _ = writeln!(output, "| Email | Name | Correct | Items | %Score | Status |");
        let _ = writeln!(output, "|---|---|---|---|---|---|");
        for student in &dashboard.students {
            let _ = writeln!(
                output,
                "| {} | {} {} | {} | {} | {:.2} | {} |",
                student.email,
                student.first_name,
                student.last_name,
                student.total_correct,
                student.total_items,
                student.percent_score,
                student.status
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Item Analysis");
    write_items(&mut output, &dashboard.items);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Mastery Distribution");
    for entry in &dashboard.distribution {
        let _ = writeln!(
            output,
            "- {}: {} items ({:.1}%)",
            entry.mastery_level, entry.count, entry.percentage
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## At-Risk Questions Summary");
    if dashboard.prompts.is_empty() {
        let _ = writeln!(output, "No low mastery questions detected.");
    } else {
        for prompt in &dashboard.prompts {
            let _ = writeln!(
                output,
                "- Item {} ({}): most chosen answer {} by {} students. {}",
                format_order(prompt.item_order),
                prompt.question_id,
                prompt.most_chosen_incorrect_answer,
                prompt.count,
                prompt.question
            );
        }
    }

    if let Some(email) = &dashboard.selected_email {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Pointers to Review for {}", email);
        if dashboard.review.is_empty() {
            let _ = writeln!(output, "All answers correct for this student!");
        } else {
            for entry in &dashboard.review {
                let _ = writeln!(
                    output,
                    "- {} {}: answered {} (\"{}\"). Notes: {}",
                    entry.question_id,
                    entry.question,
                    entry.answer,
                    entry.text,
                    entry.notes.as_deref().unwrap_or("none")
                );
            }
        }
    }

    output
}

fn write_items(output: &mut String, items: &[ItemSummary]) {
    if items.is_empty() {
        let _ = writeln!(output, "No items match this filter.");
        return;
    }

    let _ = writeln!(output, "| Order | QuestionID | A | B | C | D | %Correct | %Incorrect | Mastery |");
    let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|");
    for item in items {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {:.1} | {:.1} | {} |",
            format_order(item.item_order),
            item.question_id,
            item.count_a,
            item.count_b,
            item.count_c,
            item.count_d,
            item.percent_correct,
            item.percent_incorrect,
            item.mastery_level
        );
    }

    let low = items
        .iter()
        .filter(|item| item.mastery_level == MasteryLevel::Low)
        .count();
    if low > 0 {
        let _ = writeln!(output);
        let _ = writeln!(output, "{low} of {} listed items are low mastery.", items.len());
    }
}

/// Writes one dashboard table as CSV with the sheet-style column names.
pub fn export_csv<W: std::io::Write>(
    dashboard: &Dashboard,
    table: ExportTable,
    writer: W,
) -> Result<(), csv::Error> {
    let mut csv = csv::Writer::from_writer(writer);

    match table {
        ExportTable::Students => {
            csv.write_record([
                "Email", "LastName", "FirstName", "TotalCorrect", "TotalItems", "%Score", "Status",
            ])?;
            for s in &dashboard.students {
                csv.write_record([
                    s.email.clone(),
                    s.last_name.clone(),
                    s.first_name.clone(),
                    s.total_correct.to_string(),
                    s.total_items.to_string(),
                    format!("{:.2}", s.percent_score),
                    s.status.label().to_string(),
                ])?;
            }
        }
        ExportTable::Items => {
            csv.write_record([
                "ItemOrder", "QuestionID", "CountA", "CountB", "CountC", "CountD", "%Correct",
                "%Incorrect", "MasteryLevel",
            ])?;
            for i in &dashboard.items {
                csv.write_record([
                    format_order(i.item_order),
                    i.question_id.clone(),
                    i.count_a.to_string(),
                    i.count_b.to_string(),
                    i.count_c.to_string(),
                    i.count_d.to_string(),
                    i.percent_correct.to_string(),
                    i.percent_incorrect.to_string(),
                    i.mastery_level.label().to_string(),
                ])?;
            }
        }
        ExportTable::Distribution => {
            csv.write_record(["MasteryLevel", "Count", "Percentage"])?;
            for d in &dashboard.distribution {
                csv.write_record([
                    d.mastery_level.label().to_string(),
                    d.count.to_string(),
                    d.percentage.to_string(),
                ])?;
            }
        }
        ExportTable::Prompts => {
            csv.write_record([
                "ItemOrder", "QuestionID", "Most Chosen Incorrect Answer", "Count", "Question",
            ])?;
            for p in &dashboard.prompts {
                csv.write_record([
                    format_order(p.item_order),
                    p.question_id.clone(),
                    p.most_chosen_incorrect_answer.to_string(),
                    p.count.to_string(),
                    p.question.clone(),
                ])?;
            }
        }
        ExportTable::Review => {
            csv.write_record([
                "LastName", "FirstName", "QuestionID", "Question", "Answer", "Text", "Notes",
            ])?;
            for r in &dashboard.review {
                csv.write_record([
                    r.last_name.clone(),
                    r.first_name.clone(),
                    r.question_id.clone(),
                    r.question.clone(),
                    r.answer.clone(),
                    r.text.clone(),
                    r.notes.clone().unwrap_or_default(),
                ])?;
            }
        }
    }

    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, ViewParams};
    use crate::fixtures;
    use crate::loader;
    use chrono::TimeZone;

    fn dashboard() -> Dashboard {
        let dataset = Dataset::new(
            "sample.xlsx",
            loader::load_bytes(fixtures::sample_workbook()).unwrap(),
        );
        Dashboard::build(&dataset, &ViewParams::default()).unwrap()
    }

    #[test]
    fn report_includes_each_section() {
        let generated_at = Utc.with_ymd_and_hms(2026, 2, 2, 9, 30, 0).unwrap();
        let report = build_report("sample.xlsx", generated_at, &dashboard());

        assert!(report.contains("Generated for sample.xlsx on 2026-02-02 09:30 UTC"));
        assert!(report.contains("Threshold 70% (Standard (default))"));
        assert!(report.contains("- Average score: 83.3"));
        assert!(report.contains("| avery@example.com | Avery Lee | 2 | 3 | 66.67 | At Risk |"));
        assert!(report.contains("- Moderate Level Mastery: 0 items (0.0%)"));
        assert!(report.contains("most chosen answer A by 1 students"));
        assert!(report.contains("## Pointers to Review for avery@example.com"));
    }

    #[test]
    fn report_notes_empty_sections() {
        let mut dashboard = dashboard();
        dashboard.prompts.clear();
        dashboard.review.clear();
        let report = build_report("sample.xlsx", Utc::now(), &dashboard);
        assert!(report.contains("No low mastery questions detected."));
        assert!(report.contains("All answers correct for this student!"));
    }

    #[test]
    fn exports_students_as_csv() {
        let mut buffer = Vec::new();
        export_csv(&dashboard(), ExportTable::Students, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Email,LastName,FirstName,TotalCorrect,TotalItems,%Score,Status");
        assert_eq!(lines[1], "avery@example.com,Lee,Avery,2,3,66.67,At Risk");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn exports_distribution_with_zero_levels() {
        let mut buffer = Vec::new();
        export_csv(&dashboard(), ExportTable::Distribution, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Moderate Level Mastery,0,0"));
    }

    #[test]
    fn percent_formatting_handles_missing_average() {
        assert_eq!(format_percent(None), "n/a");
        assert_eq!(format_percent(Some(75.0)), "75.00%");
    }
}
