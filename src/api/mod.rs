//! Public API Surface (C8) — the endpoints in spec.md §6, wired through
//! axum handler functions in the style of `ozone_studio::grpc`'s
//! `health`/`authenticate` handlers: `State<Arc<AppState>>` extraction,
//! `Json<Req>` in, `Json<Resp>` or the error's own `IntoResponse` out.

use crate::auth::RequirePrincipal;
use crate::classifier::Classifier;
use crate::feed::{AnalyticsFeedClient, FeedScheduler};
use crate::fusion::FusionService;
use crate::orchestrator::Orchestrator;
use crate::registry::ModelRegistry;
use crate::types::{ModelProfile, ModelType, RecommendationRequest, RouterError};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub fusion: Arc<FusionService>,
    pub classifier: Arc<Classifier>,
    pub orchestrator: Arc<Orchestrator>,
    pub feed_client: Arc<AnalyticsFeedClient>,
    pub feed_scheduler: Arc<FeedScheduler>,
    pub start_time: std::time::Instant,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/v1/recommend", post(recommend))
        .route("/v1/classify", post(classify))
        .route("/v1/models", get(list_models))
        .route("/v1/models/:id", get(get_model))
        .route("/admin/classifier/reload", post(reload_classifier))
        .route("/admin/classifier/explain", post(explain_classifier))
        .route("/admin/refresh", post(force_refresh))
        .route("/health", get(health))
        .route("/status", get(status))
        .layer(cors)
        .with_state(state)
}

struct ApiError(RouterError);

impl From<RouterError> for ApiError {
    fn from(e: RouterError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

async fn recommend(State(state): State<Arc<AppState>>, Json(request): Json<RecommendationRequest>) -> Result<impl IntoResponse, ApiError> {
    let response = state.orchestrator.recommend(&request)?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct ClassifyRequest {
    prompt: String,
}

async fn classify(State(state): State<Arc<AppState>>, Json(request): Json<ClassifyRequest>) -> Result<impl IntoResponse, ApiError> {
    if request.prompt.trim().is_empty() {
        return Err(RouterError::InvalidRequest("prompt must not be empty".into()).into());
    }
    Ok(Json(state.classifier.classify(&request.prompt)))
}

#[derive(Debug, Deserialize)]
struct ListModelsQuery {
    #[serde(rename = "type")]
    model_type: Option<ModelType>,
    provider: Option<String>,
    capability: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ModelListResponse {
    models: Vec<ModelProfile>,
    total: usize,
}

async fn list_models(State(state): State<Arc<AppState>>, Query(query): Query<ListModelsQuery>) -> Json<ModelListResponse> {
    let snapshot = state.fusion.snapshot();
    let filtered: Vec<ModelProfile> = snapshot
        .models
        .iter()
        .filter(|m| query.model_type.map_or(true, |t| m.model_type == t))
        .filter(|m| query.provider.as_ref().map_or(true, |p| m.provider.eq_ignore_ascii_case(p)))
        .filter(|m| query.capability.as_ref().map_or(true, |c| m.capabilities.contains_key(c)))
        .cloned()
        .collect();

    let total = filtered.len();
    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(total);
    let page = filtered.into_iter().skip(offset).take(limit).collect();

    Json(ModelListResponse { models: page, total })
}

async fn get_model(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<ModelProfile>, ApiError> {
    state
        .fusion
        .snapshot()
        .models
        .iter()
        .find(|m| m.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| RouterError::NotFound(format!("model '{id}' not found")).into())
}

#[derive(Debug, Deserialize)]
struct ReloadQuery {
    path: String,
}

#[derive(Debug, Serialize)]
struct ReloadResponse {
    success: bool,
    error: Option<String>,
}

async fn reload_classifier(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(_principal): RequirePrincipal,
    Query(query): Query<ReloadQuery>,
) -> Json<ReloadResponse> {
    match state.classifier.reload(std::path::Path::new(&query.path)) {
        Ok(()) => Json(ReloadResponse { success: true, error: None }),
        Err(e) => Json(ReloadResponse { success: false, error: Some(e) }),
    }
}

async fn explain_classifier(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(_principal): RequirePrincipal,
    Json(request): Json<ClassifyRequest>,
) -> Json<HashMap<String, f64>> {
    Json(state.classifier.explain(&request.prompt))
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    refreshed: bool,
}

async fn force_refresh(State(state): State<Arc<AppState>>, RequirePrincipal(_principal): RequirePrincipal) -> Result<Json<RefreshResponse>, ApiError> {
    let outcome = match state.feed_scheduler.force_refresh().await {
        Ok(outcome) => outcome,
        Err(e) => {
            state.fusion.note_feed_failure();
            return Err(e.into());
        }
    };

    let refreshed = match outcome {
        Some((rows, etag)) => {
            state.fusion.refresh(rows, etag);
            true
        }
        None => false,
    };
    Ok(Json(RefreshResponse { refreshed }))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    healthy: bool,
    version: String,
    uptime_secs: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse { healthy: true, version: env!("CARGO_PKG_VERSION").to_string(), uptime_secs: state.start_time.elapsed().as_secs() })
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    uptime_secs: u64,
    total_models: usize,
    feed_success_count: u64,
    feed_fallback_count: u64,
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let snapshot = state.fusion.snapshot();
    Json(StatusResponse {
        uptime_secs: state.start_time.elapsed().as_secs(),
        total_models: snapshot.models.len(),
        feed_success_count: state.feed_client.feed_success_count.load(std::sync::atomic::Ordering::Relaxed),
        feed_fallback_count: state.fusion.feed_fallback_count.load(std::sync::atomic::Ordering::Relaxed),
    })
}
