//! In-memory workbooks for tests.

use rust_xlsxwriter::Workbook;

use crate::loader::{ANSWERS_SHEET, QUIZ_DETAILS_SHEET};

/// Builds an xlsx buffer; cells that parse as numbers are written as numbers
/// and empty strings are left blank.
pub fn workbook(sheets: &[(&str, Vec<Vec<&str>>)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                match value.parse::<f64>() {
                    Ok(number) => worksheet.write_number(r as u32, c as u16, number).unwrap(),
                    Err(_) => worksheet.write_string(r as u32, c as u16, *value).unwrap(),
                };
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

/// Two students, three questions; question 102 is the only low mastery item.
pub fn sample_workbook() -> Vec<u8> {
    workbook(&[
        (
            QUIZ_DETAILS_SHEET,
            vec![
                vec!["QuestionID", "ItemOrder", "Notes", "Question"],
                vec!["101", "2", "Review fractions", "What is 1/2 + 1/4?"],
                vec!["102", "1", "Revisit photosynthesis", "Where does photosynthesis happen?"],
                vec!["103", "3", "", "Capital of France?"],
            ],
        ),
        (
            ANSWERS_SHEET,
            vec![
                vec![
                    "Email", "LastName", "FirstName", "QuestionID", "Answer", "isCorrect", "Text",
                    "Question",
                ],
                vec!["avery@example.com", "Lee", "Avery", "101", "A", "1", "3/4", "What is 1/2 + 1/4?"],
                vec!["avery@example.com", "Lee", "Avery", "102", "B", "0", "Mitochondria", "Where does photosynthesis happen?"],
                vec!["avery@example.com", "Lee", "Avery", "103", "C", "1", "Paris", "Capital of France?"],
                vec!["jules@example.com", "Moreno", "Jules", "101", "A", "1", "3/4", "What is 1/2 + 1/4?"],
                vec!["jules@example.com", "Moreno", "Jules", "102", "A", "1", "Chloroplast", "Where does photosynthesis happen?"],
                vec!["jules@example.com", "Moreno", "Jules", "103", "C", "1", "Paris", "Capital of France?"],
            ],
        ),
    ])
}
