// Study Review - Web Server
// REST API over the card store with Axum

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{Local, NaiveDate};
use clap::Parser;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use study_review::{
    categories, get_all_cards, get_card, get_review_events, mastery_overview, record_review,
    CardFilter, Config, Flashcard, MasteryOverview, Rating, ReviewError, ReviewEvent,
    ReviewScheduler,
};

/// Command-line arguments for the server
#[derive(Parser, Debug)]
#[command(name = "study-review-server", version, about = "REST API over the flashcard store")]
struct ServerArgs {
    /// Config file (default: ./study-review.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    actor: String,
}

impl AppState {
    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::internal("database lock poisoned"))
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Error mapped onto an HTTP status
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        let status = match err {
            ReviewError::InvalidRating(_) | ReviewError::DateOutOfRange(_) => StatusCode::BAD_REQUEST,
            ReviewError::CardNotFound(_) => StatusCode::NOT_FOUND,
            ReviewError::SessionNotActive => StatusCode::CONFLICT,
            ReviewError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("request failed: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

/// Malformed or incomplete JSON bodies keep the `ApiResponse` shape
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Deserialize)]
struct DueQuery {
    /// Override "today" (YYYY-MM-DD)
    today: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct RateRequest {
    /// Kept as text so an unknown value is a 400 with a useful message
    rating: String,
    today: Option<NaiveDate>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RateResponse {
    card: Flashcard,
    previous_mastery: u8,
    event: ReviewEvent,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    total_cards: usize,
    due_today: usize,
    overview: MasteryOverview,
}

fn today_or(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/cards?search=&category= - Browse cards
async fn list_cards(State(state): State<AppState>, Query(filter): Query<CardFilter>) -> ApiResult<Vec<Flashcard>> {
    let conn = state.conn()?;
    let cards = get_all_cards(&conn)?;
    let matching = filter.apply(&cards).into_iter().cloned().collect();
    Ok(Json(ApiResponse::ok(matching)))
}

/// GET /api/cards/due - Cards due for review
async fn due_cards(State(state): State<AppState>, Query(query): Query<DueQuery>) -> ApiResult<Vec<Flashcard>> {
    let conn = state.conn()?;
    let scheduler = ReviewScheduler::from_cards(get_all_cards(&conn)?);
    let due = scheduler
        .due_cards(today_or(query.today))
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(ApiResponse::ok(due)))
}

/// GET /api/categories - "All" plus each category
async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let conn = state.conn()?;
    let cards = get_all_cards(&conn)?;
    Ok(Json(ApiResponse::ok(categories(&cards))))
}

/// GET /api/stats - Mastery overview and due count
async fn get_stats(State(state): State<AppState>, Query(query): Query<DueQuery>) -> ApiResult<StatsResponse> {
    let conn = state.conn()?;
    let scheduler = ReviewScheduler::from_cards(get_all_cards(&conn)?);

    Ok(Json(ApiResponse::ok(StatsResponse {
        total_cards: scheduler.len(),
        due_today: scheduler.due_count(today_or(query.today)),
        overview: mastery_overview(scheduler.cards()),
    })))
}

/// POST /api/cards/:id/rate - Apply a rating and persist it
async fn rate_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<RateRequest>, JsonRejection>,
) -> ApiResult<RateResponse> {
    let Json(request) = payload?;
    let rating: Rating = request.rating.parse()?;
    let today = today_or(request.today);
    let conn = state.conn()?;

    let card = get_card(&conn, &id)?.ok_or_else(|| ReviewError::CardNotFound(id.clone()))?;
    let mut scheduler = ReviewScheduler::from_cards(vec![card]);
    let outcome = scheduler.rate_card(&id, rating, today)?;
    let event = record_review(&conn, &outcome, &state.actor)?;

    log::info!("card {} rated {} -> next review {}", id, rating, outcome.card.next_review);

    Ok(Json(ApiResponse::ok(RateResponse {
        previous_mastery: outcome.previous_mastery.value(),
        card: outcome.card,
        event,
    })))
}

/// GET /api/cards/:id/history - Review events, newest first
async fn card_history(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<ReviewEvent>> {
    let conn = state.conn()?;
    if get_card(&conn, &id)?.is_none() {
        return Err(ReviewError::CardNotFound(id).into());
    }
    Ok(Json(ApiResponse::ok(get_review_events(&conn, &id)?)))
}

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/cards", get(list_cards))
        .route("/cards/due", get(due_cards))
        .route("/cards/:id/rate", post(rate_card))
        .route("/cards/:id/history", get(card_history))
        .route("/categories", get(list_categories))
        .route("/stats", get(get_stats))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new("web"))
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("🌐 Study Review - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = Config::load(args.config.as_deref())?;
    let db_path = &config.database_path;

    if !db_path.exists() {
        eprintln!("❌ Database not found at {:?}", db_path);
        eprintln!("   Run: study-review init");
        eprintln!("   to create it first.");
        std::process::exit(1);
    }

    let conn = Connection::open(db_path)?;
    println!("✓ Database opened: {:?}", db_path);

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        actor: config.actor.clone(),
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;

    println!("\n🚀 Server running on http://{}", config.server_addr);
    println!("   API: http://{}/api/cards/due", config.server_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await?;

    Ok(())
}
