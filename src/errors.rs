use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

/// Failure to turn an uploaded workbook into answer and quiz rows.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),
    #[error("could not open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("workbook is missing the \"{sheet}\" sheet")]
    MissingSheet { sheet: String },
    #[error("sheet \"{sheet}\" is missing the \"{column}\" column")]
    MissingColumn { sheet: String, column: String },
    #[error("sheet \"{sheet}\" row {row}: invalid {column} value \"{value}\"")]
    InvalidCell {
        sheet: String,
        row: usize,
        column: String,
        value: String,
    },
    #[error("sheet \"Quiz Details\" lists QuestionID \"{question_id}\" more than once")]
    DuplicateQuestion { question_id: String },
}

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Load(err) => {
                tracing::warn!(error = %err, "rejected workbook");
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Html(crate::web::error_page(status, &message))).into_response()
    }
}

impl From<crate::dataset::UnknownStudent> for AppError {
    fn from(err: crate::dataset::UnknownStudent) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Internal(format!("csv export failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_errors_map_to_unprocessable() {
        let err = AppError::from(LoadError::MissingSheet {
            sheet: "Quiz Details".to_string(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn messages_name_the_missing_piece() {
        let err = LoadError::MissingColumn {
            sheet: "Student Answers Data".to_string(),
            column: "isCorrect".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "sheet \"Student Answers Data\" is missing the \"isCorrect\" column"
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = AppError::Internal("disk on fire".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
