use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use sait_sched_core::{
    enumerator,
    ics::{DateRange, IcsExporter},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Raw header paste from the browser's network inspector
#[derive(Deserialize)]
struct SessionRequest {
    headers_text: String,
}

#[derive(Deserialize)]
struct TermsRequest {
    session: BannerSession,
}

#[derive(Deserialize)]
struct SearchRequest {
    session: BannerSession,
    term: String,
    query: String,
}

/// Course fetch parameters; also usable inline in a schedule request
#[derive(Deserialize)]
struct FetchRequest {
    session: BannerSession,
    term: String,
    course_codes: Vec<String>,
    #[serde(default = "default_open_only")]
    open_only: bool,
}

fn default_open_only() -> bool {
    true
}

#[derive(Deserialize)]
struct SchedulesRequest {
    /// Catalog supplied inline (e.g. previously fetched or hand-edited)
    courses: Option<Vec<Course>>,
    /// Or fetched live from Banner as part of this request
    fetch: Option<FetchRequest>,
    #[serde(default)]
    preferences: SchedulePreferences,
    /// Cap on how many ranked candidates to return
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SchedulesResponse {
    total: usize,
    candidates: Vec<ScheduleCandidate>,
}

#[derive(Deserialize)]
struct IcsRequest {
    sections: Vec<Section>,
    range: DateRange,
    #[serde(default)]
    options: IcsOptions,
}

#[derive(Deserialize)]
struct RegistrationsRequest {
    session: BannerSession,
    term: String,
}

#[derive(Deserialize)]
struct RegisterRequest {
    session: BannerSession,
    term: String,
    /// Chosen sections, usually a candidate's `sections` array
    sections: Vec<Section>,
}

#[derive(Deserialize)]
struct DropRequest {
    session: BannerSession,
    crns: Vec<String>,
}

pub fn create_app() -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/session", post(session_handler))
        .route("/terms", post(terms_handler))
        .route("/search", post(search_handler))
        .route("/courses", post(courses_handler))
        .route("/schedules", post(schedules_handler))
        .route("/schedules/ics", post(ics_handler))
        .route("/registrations", post(registrations_handler))
        .route("/register", post(register_handler))
        .route("/drop", post(drop_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "SAIT Schedule Builder",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Conflict-free class schedules over the Banner registration system",
        "endpoints": {
            "health": "/health",
            "session": "/session",
            "terms": "/terms",
            "search": "/search",
            "courses": "/courses",
            "schedules": "/schedules",
            "schedules_ics": "/schedules/ics",
            "registrations": "/registrations",
            "register": "/register",
            "drop": "/drop"
        }
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Parse a pasted header block and echo the session it captures, so the
/// client can hold onto it and send it with later requests
async fn session_handler(
    Json(params): Json<SessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = parse_session(&params.headers_text)?;
    tracing::info!("captured session for {}", session.base_url);
    Ok(Json(session))
}

async fn terms_handler(Json(params): Json<TermsRequest>) -> Result<impl IntoResponse, AppError> {
    let client = BannerClient::new(params.session)?;
    let terms = client.terms().await?;
    Ok(Json(terms))
}

async fn search_handler(Json(params): Json<SearchRequest>) -> Result<impl IntoResponse, AppError> {
    let client = BannerClient::new(params.session)?;
    let matches = client.search_subjects(&params.query, &params.term).await?;
    Ok(Json(matches))
}

async fn courses_handler(Json(params): Json<FetchRequest>) -> Result<impl IntoResponse, AppError> {
    let catalog = fetch_catalog(params).await?;
    Ok(Json(catalog))
}

async fn fetch_catalog(params: FetchRequest) -> Result<CourseCatalog, AppError> {
    let client = BannerClient::new(params.session)?;
    let catalog = client
        .fetch_courses(&params.term, &params.course_codes, params.open_only)
        .await?;
    Ok(catalog)
}

/// Enumerate and rank conflict-free schedules from an inline catalog or a
/// live fetch
async fn schedules_handler(
    Json(params): Json<SchedulesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let courses = match (params.courses, params.fetch) {
        (Some(courses), _) => courses,
        (None, Some(fetch)) => fetch_catalog(fetch).await?.courses,
        (None, None) => {
            return Err(sait_sched_core::Error::Config(
                "provide either 'courses' or 'fetch'".to_string(),
            )
            .into());
        }
    };

    let mut candidates = enumerator::enumerate(&courses, &params.preferences)?;
    let total = candidates.len();
    if let Some(limit) = params.limit {
        candidates.truncate(limit);
    }

    tracing::info!("enumerated {} candidate schedule(s)", total);
    Ok(Json(SchedulesResponse { total, candidates }))
}

async fn ics_handler(Json(params): Json<IcsRequest>) -> Result<impl IntoResponse, AppError> {
    let exporter = IcsExporter::new(params.options);
    let ics_content = exporter.generate(&params.sections, params.range)?;

    Ok((
        StatusCode::OK,
        [("Content-Type", "text/calendar; charset=utf-8")],
        ics_content,
    ))
}

async fn registrations_handler(
    Json(params): Json<RegistrationsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = BannerClient::new(params.session)?;
    let events = client.current_registrations(&params.term).await?;
    Ok(Json(events))
}

/// Apply a chosen schedule: drop current registrations, register each
/// chosen section, report per-section outcomes
async fn register_handler(
    Json(params): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = BannerClient::new(params.session)?;
    let report = client.apply_schedule(&params.term, &params.sections).await?;
    Ok(Json(report))
}

async fn drop_handler(Json(params): Json<DropRequest>) -> Result<impl IntoResponse, AppError> {
    let client = BannerClient::new(params.session)?;
    let report = client.drop_sections(&params.crns).await?;
    Ok(Json(report))
}

/// Application error type
#[derive(Debug)]
struct AppError(sait_sched_core::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self.0 {
            sait_sched_core::Error::Config(_) => (StatusCode::BAD_REQUEST, "configuration error"),
            sait_sched_core::Error::Authentication(_) => {
                (StatusCode::UNAUTHORIZED, "authentication failed")
            }
            sait_sched_core::Error::NoValidSchedule => {
                (StatusCode::UNPROCESSABLE_ENTITY, "no valid schedule")
            }
            sait_sched_core::Error::Upstream { .. } => (StatusCode::BAD_GATEWAY, "upstream error"),
            sait_sched_core::Error::Timeout => (StatusCode::GATEWAY_TIMEOUT, "request timeout"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal server error"),
        };

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
            message: self.0.to_string(),
        });

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<sait_sched_core::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
