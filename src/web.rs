use std::collections::HashMap;
use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::chart;
use crate::dataset::{Dashboard, Dataset, ViewParams};
use crate::errors::{AppError, Result};
use crate::loader;
use crate::models::{MasteryFilter, StatusFilter, Threshold};
use crate::report::{self, ExportTable};

/// Uploaded workbooks, one per session, held in memory only.
pub struct AppState {
    sessions: RwLock<HashMap<Uuid, Arc<Dataset>>>,
    max_upload_bytes: usize,
}

impl AppState {
    pub fn new(max_upload_bytes: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_upload_bytes,
        }
    }

    pub async fn insert(&self, dataset: Dataset) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.write().await.insert(id, Arc::new(dataset));
        id
    }

    async fn get(&self, id: Uuid) -> Result<Arc<Dataset>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("session {id} does not exist")))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/", get(serve_upload_form))
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/sessions/:id", get(serve_dashboard))
        .route("/sessions/:id/api/dashboard", get(dashboard_json))
        .route("/sessions/:id/export/:table", get(export_table))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn serve_upload_form() -> Html<String> {
    Html(page(
        "Quiz Dashboard",
        r#"<form action="/upload" method="post" enctype="multipart/form-data">
<p>Upload an Excel workbook with the "Quiz Details" and "Student Answers Data" sheets.</p>
<input type="file" name="file" accept=".xlsx" required>
<button type="submit">Analyze</button>
</form>"#,
    ))
}

async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Result<Response> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.xlsx").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("could not read upload: {e}")))?;
        tracing::info!(file = %file_name, bytes = bytes.len(), "received workbook");

        let workbook = tokio::task::spawn_blocking(move || loader::load_bytes(bytes.to_vec()))
            .await
            .map_err(|e| AppError::Internal(format!("workbook parser panicked: {e}")))??;

        let id = state.insert(Dataset::new(file_name, workbook)).await;
        tracing::info!(session = %id, "session created");
        return Ok(Redirect::to(&format!("/sessions/{id}")).into_response());
    }

    Err(AppError::BadRequest("missing \"file\" field".to_string()))
}

async fn serve_dashboard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<ViewParams>,
) -> Result<Html<String>> {
    let dataset = state.get(id).await?;
    let dashboard = Dashboard::build(&dataset, &params)?;
    let chart = chart::mastery_chart(&dashboard.distribution)
        .map_err(|e| AppError::Internal(format!("chart rendering failed: {e}")))?;
    Ok(Html(render_dashboard(id, &dataset, &params, &dashboard, &chart)))
}

async fn dashboard_json(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<ViewParams>,
) -> Result<Json<Dashboard>> {
    let dataset = state.get(id).await?;
    Ok(Json(Dashboard::build(&dataset, &params)?))
}

async fn export_table(
    State(state): State<Arc<AppState>>,
    Path((id, table)): Path<(Uuid, ExportTable)>,
    Query(params): Query<ViewParams>,
) -> Result<Response> {
    let dataset = state.get(id).await?;
    let dashboard = Dashboard::build(&dataset, &params)?;

    let mut buffer = Vec::new();
    report::export_csv(&dashboard, table, &mut buffer)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.csv\"", table.name()),
            ),
        ],
        buffer,
    )
        .into_response())
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    page(
        "Quiz Dashboard",
        &format!(
            "<div class=\"error\"><h2>{}</h2><p>{}</p></div><p><a href=\"/\">Upload another file</a></p>",
            status,
            escape(message)
        ),
    )
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title>\
<style>body{{font-family:sans-serif;margin:2rem}}table{{border-collapse:collapse;margin:1rem 0}}\
td,th{{border:1px solid #ccc;padding:4px 8px}}.metric{{display:inline-block;margin-right:2rem}}\
.metric b{{display:block;font-size:1.6rem}}.success{{color:#1a7f37}}.error{{color:#b42318}}</style>\
</head><body><h1>{title}</h1>\n{body}\n</body></html>"
    )
}

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn query_string(params: &ViewParams, email: Option<&str>) -> String {
    let mut query = format!(
        "threshold={}&status={}&mastery={}",
        params.threshold,
        params.status.key(),
        params.mastery.key()
    );
    if let Some(email) = email {
        let _ = write!(query, "&email={}", urlencoding::encode(email));
    }
    query
}

fn select(name: &str, options: &[(String, String)], selected: &str) -> String {
    let mut html = format!("<select name=\"{name}\" onchange=\"this.form.submit()\">");
    for (value, label) in options {
        let marker = if value == selected { " selected" } else { "" };
        let _ = write!(
            html,
            "<option value=\"{}\"{}>{}</option>",
            escape(value),
            marker,
            escape(label)
        );
    }
    html.push_str("</select>");
    html
}

fn table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut html = String::from("<table><tr>");
    for header in headers {
        let _ = write!(html, "<th>{}</th>", escape(header));
    }
    html.push_str("</tr>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape(&cell));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}

fn render_dashboard(
    id: Uuid,
    dataset: &Dataset,
    params: &ViewParams,
    dashboard: &Dashboard,
    chart: &str,
) -> String {
    let selected_email = dashboard.selected_email.as_deref();
    let query = query_string(params, selected_email);
    let mut body = String::new();

    let _ = write!(
        body,
        "<p>Workbook <b>{}</b> loaded {} ({} answers, {} questions). <a href=\"/\">Upload another file</a></p>",
        escape(&dataset.source_name),
        dataset.loaded_at.format("%Y-%m-%d %H:%M UTC"),
        dataset.answers.len(),
        dataset.details.len()
    );

    let thresholds: Vec<(String, String)> = Threshold::ALL
        .iter()
        .map(|t| (t.to_string(), format!("{t}%")))
        .collect();
    let statuses: Vec<(String, String)> = StatusFilter::ALL
        .iter()
        .map(|s| (s.key().to_string(), s.label().to_string()))
        .collect();
    let masteries: Vec<(String, String)> = MasteryFilter::ALL
        .iter()
        .map(|m| (m.key().to_string(), m.label().to_string()))
        .collect();
    let emails: Vec<(String, String)> = dataset
        .emails()
        .into_iter()
        .map(|e| (e.to_string(), e.to_string()))
        .collect();

    let _ = write!(body, "<form method=\"get\" action=\"/sessions/{id}\">");

    body.push_str("<h2>Student Scores Summary</h2>");
    let _ = write!(
        body,
        "<label>Score Threshold {}</label><p><i>Definition: {}% - {}</i></p>",
        select("threshold", &thresholds, &params.threshold.to_string()),
        params.threshold,
        escape(dashboard.threshold_label)
    );
    let _ = write!(
        body,
        "<div class=\"metric\">Average Score<b>{}</b></div>\
<div class=\"metric\">Likely to Pass Students<b>{}</b></div>\
<div class=\"metric\">At-Risk Students<b>{}</b></div>",
        report::format_percent(dashboard.metrics.average_score),
        dashboard.metrics.likely_to_pass,
        dashboard.metrics.at_risk
    );
    let _ = write!(
        body,
        "<p><label>Filter by Status {}</label> <a href=\"/sessions/{id}/export/students?{query}\">CSV</a></p>",
        select("status", &statuses, params.status.key())
    );
    body.push_str(&table(
        &["Email", "LastName", "FirstName", "TotalCorrect", "TotalItems", "%Score", "Status"],
        dashboard
            .students
            .iter()
            .map(|s| {
                vec![
                    s.email.clone(),
                    s.last_name.clone(),
                    s.first_name.clone(),
                    s.total_correct.to_string(),
                    s.total_items.to_string(),
                    format!("{:.2}", s.percent_score),
                    s.status.to_string(),
                ]
            })
            .collect(),
    ));

    body.push_str("<h2>Item Analysis</h2>");
    body.push_str(
        "<details><summary>Mastery Level Legend</summary><ul>\
<li><b>Low:</b> If &lt;60% of the class is correct</li>\
<li><b>Moderate:</b> If 60-79% of the class is correct</li>\
<li><b>High:</b> If 80-100% of the class is correct</li></ul></details>",
    );
    let _ = write!(
        body,
        "<p><label>Filter by Mastery Level {}</label> <a href=\"/sessions/{id}/export/items?{query}\">CSV</a></p>",
        select("mastery", &masteries, params.mastery.key())
    );
    body.push_str(&table(
        &[
            "ItemOrder", "QuestionID", "CountA", "CountB", "CountC", "CountD", "%Correct",
            "%Incorrect", "MasteryLevel",
        ],
        dashboard
            .items
            .iter()
            .map(|i| {
                vec![
                    report::format_order(i.item_order),
                    i.question_id.clone(),
                    i.count_a.to_string(),
                    i.count_b.to_string(),
                    i.count_c.to_string(),
                    i.count_d.to_string(),
                    format!("{:.2}", i.percent_correct),
                    format!("{:.2}", i.percent_incorrect),
                    i.mastery_level.to_string(),
                ]
            })
            .collect(),
    ));

    body.push_str("<h3>Distribution of Mastery Levels</h3>");
    body.push_str(chart);

    body.push_str("<h3>At-Risk Questions Summary</h3>");
    if dashboard.prompts.is_empty() {
        body.push_str("<p class=\"success\">No low mastery questions detected.</p>");
    } else {
        body.push_str(&table(
            &["ItemOrder", "QuestionID", "Most Chosen Incorrect Answer", "Count", "Question"],
            dashboard
                .prompts
                .iter()
                .map(|p| {
                    vec![
                        report::format_order(p.item_order),
                        p.question_id.clone(),
                        p.most_chosen_incorrect_answer.to_string(),
                        p.count.to_string(),
                        p.question.clone(),
                    ]
                })
                .collect(),
        ));
    }

    body.push_str("<h2>Pointers to Review (Per Student)</h2>");
    let _ = write!(
        body,
        "<p><label>Select a student email: {}</label></p>",
        select("email", &emails, selected_email.unwrap_or_default())
    );
    body.push_str("<noscript><button type=\"submit\">Apply</button></noscript></form>");

    if selected_email.is_some() {
        if dashboard.review.is_empty() {
            body.push_str("<p class=\"success\">All answers correct for this student!</p>");
        } else {
            let _ = write!(
                body,
                "<p>These are system-generated review prompts based on individual incorrect responses. \
<a href=\"/sessions/{id}/export/review?{query}\">CSV</a></p>"
            );
            body.push_str(&table(
                &["LastName", "FirstName", "QuestionID", "Question", "Answer", "Text", "Notes"],
                dashboard
                    .review
                    .iter()
                    .map(|r| {
                        vec![
                            r.last_name.clone(),
                            r.first_name.clone(),
                            r.question_id.clone(),
                            r.question.clone(),
                            r.answer.clone(),
                            r.text.clone(),
                            r.notes.clone().unwrap_or_default(),
                        ]
                    })
                    .collect(),
            ));
        }
    }

    page("Quiz Dashboard", &body)
}
