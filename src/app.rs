use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, HeaderName, StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::backend::ReportBackend;
use crate::config::Config;
use crate::daterange::{DateRange, QuickRange, custom_range, parse_date};
use crate::error::{DateRangeError, ExportError, GenerateError};
use crate::export::XLSX_CONTENT_TYPE;
use crate::payload::{ReportMeta, ReportRequest};
use crate::report::ReportView;

const NOT_FOUND_PAGE: &str = include_str!("./static/not_found.html");

/// Opened report views, least recently used first.
struct ReportStore {
    capacity: usize,
    views: HashMap<Uuid, Arc<ReportView>>,
    order: VecDeque<Uuid>,
}

impl ReportStore {
    fn new(capacity: usize) -> Self {
        ReportStore {
            capacity: capacity.max(1),
            views: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn touch(&mut self, id: &Uuid) {
        if let Some(pos) = self.order.iter().position(|x| x == id) {
            self.order.remove(pos);
        }
        self.order.push_back(*id);
    }

    fn insert(&mut self, id: Uuid, view: ReportView) {
        while self.views.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.views.remove(&oldest);
            log::debug!("dropped report view {}", oldest);
        }
        self.views.insert(id, Arc::new(view));
        self.touch(&id);
    }

    fn get(&mut self, id: &Uuid) -> Option<Arc<ReportView>> {
        let view = self.views.get(id).cloned()?;
        self.touch(id);
        Some(view)
    }

    fn remove(&mut self, id: &Uuid) -> bool {
        self.order.retain(|x| x != id);
        self.views.remove(id).is_some()
    }
}

/// Shared server state: the opened report views and the backend client.
pub struct AppState {
    reports: Mutex<ReportStore>,
    backend: ReportBackend,
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new(&Config::default())
    }
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        AppState {
            reports: Mutex::new(ReportStore::new(config.max_reports)),
            backend: ReportBackend::new(config.api_base_url.clone()),
        }
    }

    fn insert(&self, view: ReportView) -> Uuid {
        let id = Uuid::new_v4();
        let mut reports = self.reports.lock().unwrap_or_else(|e| e.into_inner());
        reports.insert(id, view);
        id
    }

    fn get(&self, id: &Uuid) -> Option<Arc<ReportView>> {
        let mut reports = self.reports.lock().unwrap_or_else(|e| e.into_inner());
        reports.get(id)
    }

    fn remove(&self, id: &Uuid) -> bool {
        let mut reports = self.reports.lock().unwrap_or_else(|e| e.into_inner());
        reports.remove(id)
    }

    /// Number of views currently held.
    pub fn open_reports(&self) -> usize {
        let reports = self.reports.lock().unwrap_or_else(|e| e.into_inner());
        reports.views.len()
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

#[derive(Serialize)]
struct OpenedReport {
    id: Uuid,
    rows: usize,
    cols: usize,
}

/// Generate a report from the backend for a quick or custom period.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(default)]
    report_data: Option<ReportMeta>,
    #[serde(default)]
    preset: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
}

#[derive(Deserialize, Default)]
struct DateQuery {
    preset: Option<String>,
    from: Option<String>,
    to: Option<String>,
    #[serde(default)]
    single: bool,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(StatusResponse {
            status: "error".to_string(),
            message: Some(message.into()),
        }),
    )
        .into_response()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/reports", post(open_report))
        .route("/api/reports/generate", post(generate_report))
        .route("/api/reports/:id", delete(close_report))
        .route("/reports/:id", get(report_page))
        .route("/api/reports/:id/grid", get(report_grid))
        .route("/api/reports/:id/export", get(export_report))
        .route("/api/date-range", get(date_range))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(Arc::new(AppState::new(&config)));

    let listener = TcpListener::bind(config.bind_addr()).await?;
    log::info!("Listening on http://{}", config.bind_addr());
    axum::serve(listener, app).await?;

    Ok(())
}

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;
    log::info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

async fn health() -> &'static str {
    "OK"
}

fn opened(state: &AppState, view: ReportView) -> Response {
    let (rows, cols) = (view.grid.height(), view.grid.width());
    let id = state.insert(view);
    (StatusCode::CREATED, Json(OpenedReport { id, rows, cols })).into_response()
}

async fn open_report(State(state): State<Arc<AppState>>, Json(request): Json<ReportRequest>) -> Response {
    match ReportView::open(request) {
        Ok(view) => opened(&state, view),
        Err(e) => {
            log::warn!("rejected report request: {}", e);
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

async fn generate_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> Response {
    match generate(&state, &headers, request).await {
        Ok(view) => opened(&state, view),
        Err(e) => {
            log::warn!("report generation failed: {}", e);
            error_response(generate_status(&e), e.to_string())
        }
    }
}

async fn generate(state: &AppState, headers: &HeaderMap, request: GenerateRequest) -> Result<ReportView, GenerateError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or(GenerateError::SessionExpired)?;
    let meta = request.report_data.ok_or(GenerateError::MissingEndpoint)?;

    let range = resolve_date_query(DateQuery {
        preset: request.preset,
        from: request.from,
        to: request.to,
        single: meta.single_date(),
    })?;

    state.backend.generate(meta, range, token).await
}

fn generate_status(error: &GenerateError) -> StatusCode {
    match error {
        GenerateError::SessionExpired => StatusCode::UNAUTHORIZED,
        GenerateError::NotFound => StatusCode::NOT_FOUND,
        GenerateError::MissingEndpoint | GenerateError::DateRange(_) | GenerateError::Report(_) => {
            StatusCode::BAD_REQUEST
        }
        GenerateError::Backend(_) | GenerateError::Http(_) => StatusCode::BAD_GATEWAY,
    }
}

async fn close_report(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>) -> Response {
    if state.remove(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "Report data missing!")
    }
}

async fn report_page(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>) -> Response {
    let Some(view) = state.get(&id) else {
        return (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE)).into_response();
    };

    let export_url = format!("/api/reports/{}/export", id);
    match view.page(&export_url).render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            log::error!("failed to render report {}: {}", id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to render report")
        }
    }
}

async fn report_grid(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>) -> Response {
    match state.get(&id) {
        Some(view) => Json(view.grid.clone()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Report data missing!"),
    }
}

async fn export_report(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>) -> Response {
    let Some(view) = state.get(&id) else {
        return error_response(StatusCode::NOT_FOUND, "Report data missing!");
    };

    // Workbook serialisation is CPU-bound; keep it off the async workers.
    let result = match tokio::task::spawn_blocking(move || view.export()).await {
        Ok(result) => result,
        Err(e) => {
            log::error!("export task for report {} failed: {}", id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to download Excel");
        }
    };

    match result {
        Ok(outcome) => {
            for warning in &outcome.warnings {
                log::warn!("report {}: {}", id, warning);
            }
            let disposition = format!("attachment; filename=\"{}\"", outcome.file_name.replace('"', "'"));
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                    (HeaderName::from_static("x-export-warnings"), outcome.warnings.len().to_string()),
                ],
                outcome.bytes,
            )
                .into_response()
        }
        Err(ExportError::Empty) => error_response(StatusCode::UNPROCESSABLE_ENTITY, ExportError::Empty.to_string()),
        Err(ExportError::InProgress) => {
            error_response(StatusCode::CONFLICT, ExportError::InProgress.to_string())
        }
        Err(e) => {
            log::error!("Excel Download Error: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to download Excel")
        }
    }
}

async fn date_range(Query(query): Query<DateQuery>) -> Response {
    match resolve_date_query(query) {
        Ok(range) => Json(range).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

fn resolve_date_query(query: DateQuery) -> Result<DateRange, DateRangeError> {
    if let Some(preset) = query.preset {
        let today = Local::now().date_naive();
        return Ok(preset.parse::<QuickRange>()?.range(today));
    }

    let from = query.from.as_deref().filter(|s| !s.is_empty()).map(parse_date).transpose()?;
    let to = query.to.as_deref().filter(|s| !s.is_empty()).map(parse_date).transpose()?;
    custom_range(from, to, query.single)
}
