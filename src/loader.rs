use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Range, Reader, Xlsx};

use crate::errors::LoadError;
use crate::models::{AnswerRecord, QuizDetailRecord};

pub const QUIZ_DETAILS_SHEET: &str = "Quiz Details";
pub const ANSWERS_SHEET: &str = "Student Answers Data";

const QUIZ_DETAIL_COLUMNS: [&str; 4] = ["QuestionID", "ItemOrder", "Notes", "Question"];
const ANSWER_COLUMNS: [&str; 8] = [
    "Email",
    "LastName",
    "FirstName",
    "QuestionID",
    "Answer",
    "isCorrect",
    "Text",
    "Question",
];

/// Rows read from both required sheets of one workbook.
#[derive(Debug, Clone)]
pub struct LoadedWorkbook {
    pub answers: Vec<AnswerRecord>,
    pub details: Vec<QuizDetailRecord>,
}

pub fn load_path(path: &Path) -> Result<LoadedWorkbook, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_bytes(bytes)
}

pub fn load_bytes(bytes: Vec<u8>) -> Result<LoadedWorkbook, LoadError> {
    let mut workbook = Xlsx::new(Cursor::new(bytes))?;
    let details = read_details(&sheet(&mut workbook, QUIZ_DETAILS_SHEET)?)?;
    let answers = read_answers(&sheet(&mut workbook, ANSWERS_SHEET)?)?;

    tracing::info!(
        answers = answers.len(),
        questions = details.len(),
        "loaded quiz workbook"
    );

    Ok(LoadedWorkbook { answers, details })
}

fn sheet(workbook: &mut Xlsx<Cursor<Vec<u8>>>, name: &str) -> Result<Range<Data>, LoadError> {
    if !workbook.sheet_names().iter().any(|sheet| sheet == name) {
        return Err(LoadError::MissingSheet {
            sheet: name.to_string(),
        });
    }
    Ok(workbook.worksheet_range(name)?)
}

/// Header lookup plus the spreadsheet row number of each data row.
struct Table<'a> {
    sheet: &'static str,
    columns: HashMap<&'static str, usize>,
    rows: Vec<(usize, &'a [Data])>,
}

impl<'a> Table<'a> {
    fn new(
        sheet: &'static str,
        range: &'a Range<Data>,
        required: &[&'static str],
    ) -> Result<Self, LoadError> {
        let first_row = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
        let mut rows = range.rows();
        let header: Vec<String> = rows
            .next()
            .map(|cells| cells.iter().map(|cell| cell.to_string().trim().to_string()).collect())
            .unwrap_or_default();

        let mut columns = HashMap::new();
        for &name in required {
            let index = header.iter().position(|h| h == name).ok_or_else(|| {
                LoadError::MissingColumn {
                    sheet: sheet.to_string(),
                    column: name.to_string(),
                }
            })?;
            columns.insert(name, index);
        }

        let rows = rows
            .enumerate()
            .map(|(offset, cells)| (first_row + 1 + offset, cells))
            .filter(|(_, cells)| cells.iter().any(|cell| !matches!(cell, Data::Empty)))
            .collect();

        Ok(Self {
            sheet,
            columns,
            rows,
        })
    }

    fn cell(&self, cells: &'a [Data], column: &str) -> &'a Data {
        self.columns
            .get(column)
            .and_then(|&index| cells.get(index))
            .unwrap_or(&Data::Empty)
    }

    fn invalid(&self, row: usize, column: &str, cell: &Data) -> LoadError {
        LoadError::InvalidCell {
            sheet: self.sheet.to_string(),
            row,
            column: column.to_string(),
            value: cell.to_string(),
        }
    }
}

fn read_details(range: &Range<Data>) -> Result<Vec<QuizDetailRecord>, LoadError> {
    let table = Table::new(QUIZ_DETAILS_SHEET, range, &QUIZ_DETAIL_COLUMNS)?;
    let mut seen = HashSet::new();
    let mut details = Vec::with_capacity(table.rows.len());

    for &(row, cells) in &table.rows {
        let Some(question_id) = text(table.cell(cells, "QuestionID")) else {
            continue;
        };
        if !seen.insert(question_id.clone()) {
            return Err(LoadError::DuplicateQuestion { question_id });
        }

        let order_cell = table.cell(cells, "ItemOrder");
        let item_order = integer(order_cell).map_err(|_| table.invalid(row, "ItemOrder", order_cell))?;

        details.push(QuizDetailRecord {
            question_id,
            item_order,
            notes: text(table.cell(cells, "Notes")),
            question: text(table.cell(cells, "Question")),
        });
    }

    Ok(details)
}

fn read_answers(range: &Range<Data>) -> Result<Vec<AnswerRecord>, LoadError> {
    let table = Table::new(ANSWERS_SHEET, range, &ANSWER_COLUMNS)?;
    let mut answers = Vec::with_capacity(table.rows.len());

    for &(row, cells) in &table.rows {
        let correct_cell = table.cell(cells, "isCorrect");
        let is_correct = flag(correct_cell).ok_or_else(|| table.invalid(row, "isCorrect", correct_cell))?;
        let key = |column: &str| text(table.cell(cells, column)).unwrap_or_default();
        let verbatim = |column: &str| raw(table.cell(cells, column));

        answers.push(AnswerRecord {
            email: key("Email"),
            last_name: verbatim("LastName"),
            first_name: verbatim("FirstName"),
            question_id: key("QuestionID"),
            answer: verbatim("Answer"),
            is_correct,
            text: verbatim("Text"),
            question: verbatim("Question"),
        });
    }

    Ok(answers)
}

/// Cell rendered as text; integral floats lose their fraction so numeric
/// question ids match across sheets.
fn text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(value) if value.trim().is_empty() => None,
        Data::String(value) => Some(value.trim().to_string()),
        Data::Float(value) if value.fract() == 0.0 => Some(format!("{}", *value as i64)),
        other => Some(other.to_string()),
    }
}

/// Cell as written. Answer letters rely on this: "a" or " A" never count as
/// choice A.
fn raw(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.clone(),
        other => other.to_string(),
    }
}

fn integer(cell: &Data) -> Result<Option<i64>, ()> {
    match cell {
        Data::Empty => Ok(None),
        Data::Int(value) => Ok(Some(*value)),
        Data::Float(value) if value.fract() == 0.0 => Ok(Some(*value as i64)),
        Data::String(value) if value.trim().is_empty() => Ok(None),
        Data::String(value) => value.trim().parse().map(Some).map_err(|_| ()),
        _ => Err(()),
    }
}

fn flag(cell: &Data) -> Option<bool> {
    match cell {
        Data::Bool(value) => Some(*value),
        Data::Int(0) => Some(false),
        Data::Int(1) => Some(true),
        Data::Float(value) if *value == 0.0 => Some(false),
        Data::Float(value) if *value == 1.0 => Some(true),
        Data::String(value) => match value.trim() {
            "0" => Some(false),
            "1" => Some(true),
            _ => None,
        },
        _ => None,
    }
}
