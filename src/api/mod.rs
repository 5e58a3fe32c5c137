mod error;

pub use self::error::ApiError;

use crate::config::Config;
use crate::engine::{catalog, Collector, QueryService};
use crate::error::TrackerError;
use crate::stats::StatsCollector;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

pub struct ApiState {
    pub collector: Arc<Collector>,
    pub queries: Arc<QueryService>,
    pub stats: Arc<StatsCollector>,
    pub config: Config,
}

pub fn router(state: Arc<ApiState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    Router::new()
        .route("/api/games/search", get(search_games))
        .route("/api/games/tracked", get(tracked_games))
        .route("/api/games/collect", post(collect_all))
        .route("/api/games/add-by-id", post(add_by_id))
        .route("/api/games/{app_id}/track", post(track_game))
        .route("/api/games/{app_id}/history", get(history))
        .route("/api/games/{app_id}/untrack", delete(untrack_game))
        .route("/api/games/{app_id}/is-tracked", get(is_tracked))
        .route("/api/stats", get(get_stats))
        .route("/api/config", get(get_config))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
}

/// Serves the API on `listener` until `token` is cancelled.
pub async fn start_api_server(
    listener: TcpListener,
    state: Arc<ApiState>,
    token: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("API Server listening on http://{}", addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
}

#[derive(Deserialize)]
struct SearchParams {
    query: Option<String>,
}

#[derive(Deserialize)]
struct TrackParams {
    #[serde(rename = "gameName")]
    game_name: Option<String>,
}

#[derive(Deserialize)]
struct AddByIdParams {
    #[serde(rename = "appId")]
    app_id: u64,
    #[serde(rename = "gameName")]
    game_name: Option<String>,
}

#[derive(Deserialize)]
struct HistoryParams {
    days: Option<u32>,
}

/// The supplied name, or the catalog name for `app_id` when none was given.
fn resolve_game_name(app_id: u64, game_name: Option<String>) -> Result<String, TrackerError> {
    game_name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| catalog::lookup(app_id).map(|e| e.name.to_string()))
        .ok_or_else(|| TrackerError::Validation("gameName is required".to_string()))
}

async fn search_games(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params.query.unwrap_or_default();
    info!("Searching for games with query: {}", query);

    let results = state
        .queries
        .search(&query)
        .await
        .map_err(|e| ApiError::new("Error searching games", e))?;
    Ok(Json(results))
}

async fn track_game(
    State(state): State<Arc<ApiState>>,
    Path(app_id): Path<u64>,
    Query(params): Query<TrackParams>,
) -> Result<impl IntoResponse, ApiError> {
    let context = "Error starting game tracking";
    let name = resolve_game_name(app_id, params.game_name).map_err(|e| ApiError::new(context, e))?;
    info!("Request to start tracking game: {} (ID: {})", name, app_id);

    state
        .collector
        .start_tracking(app_id, &name)
        .await
        .map_err(|e| ApiError::new(context, e))?;
    Ok("Game tracking started successfully")
}

async fn add_by_id(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<AddByIdParams>,
) -> Result<impl IntoResponse, ApiError> {
    let context = "Error adding game";
    let name = resolve_game_name(params.app_id, params.game_name)
        .map_err(|e| ApiError::new(context, e))?;
    info!("Request to add game by ID: {} ({})", params.app_id, name);

    state
        .collector
        .start_tracking(params.app_id, &name)
        .await
        .map_err(|e| ApiError::new(context, e))?;
    Ok("Game added successfully")
}

async fn history(
    State(state): State<Arc<ApiState>>,
    Path(app_id): Path<u64>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Getting player count history for app ID: {}", app_id);

    let points = state
        .queries
        .history(app_id, params.days)
        .await
        .map_err(|e| ApiError::new("Error getting player count history", e))?;
    Ok(Json(points))
}

async fn tracked_games(State(state): State<Arc<ApiState>>) -> Result<impl IntoResponse, ApiError> {
    info!("Getting all tracked games");

    let games = state
        .queries
        .tracked_games()
        .await
        .map_err(|e| ApiError::new("Error getting tracked games", e))?;
    info!("Found {} tracked games", games.len());
    Ok(Json(games))
}

async fn collect_all(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    info!("Manual player count collection triggered");

    let summary = state.collector.collect_all().await;
    format!(
        "Player counts collected successfully ({} games, {} recorded, {} failed)",
        summary.processed, summary.recorded, summary.failed
    )
}

async fn untrack_game(
    State(state): State<Arc<ApiState>>,
    Path(app_id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Request to stop tracking game with app ID: {}", app_id);

    state
        .collector
        .stop_tracking(app_id)
        .await
        .map_err(|e| ApiError::new("Error stopping game tracking", e))?;
    Ok("Game untracked successfully")
}

async fn is_tracked(
    State(state): State<Arc<ApiState>>,
    Path(app_id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let tracked = state
        .queries
        .is_tracked(app_id)
        .await
        .map_err(|e| ApiError::new("Error checking if game is tracked", e))?;
    Ok(Json(tracked))
}

async fn get_stats(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.stats.get_snapshot())
}

async fn get_config(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.config.clone())
}
