// REST API with Axum
//
// Maps HTTP onto registry and planner calls. Success bodies and errors share
// the ApiResponse envelope: {success, data, error?}.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::entities::{Behavior, Child, Location, NewChild, NewLocation};
use crate::error::RegistryError;
use crate::registry::{CounterDrift, EntityRegistry};
use crate::route::{Route, RoutePlanner};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: EntityRegistry,
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Serialize)]
pub struct Created {
    pub id: String,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Registry(RegistryError),
    MalformedBody(String),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::Registry(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MalformedBody(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Registry(err) => {
                let status = match &err {
                    RegistryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                    RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
                    RegistryError::DuplicateName { .. } => StatusCode::CONFLICT,
                    RegistryError::StoreUnavailable(_) => {
                        error!("Store error: {}", err);
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                };
                (status, err.to_string())
            }
        };

        if status.is_client_error() {
            warn!("Rejected request ({}): {}", status, message);
        }

        (status, Json(ApiResponse::err(message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /locations - Create a location
async fn create_location(
    State(state): State<AppState>,
    payload: Result<Json<NewLocation>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Created>>), ApiError> {
    let Json(input) = payload?;
    let id = state.registry.create_location(input)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(Created { id }))))
}

/// GET /locations - All locations in storage order
async fn list_locations(State(state): State<AppState>) -> ApiResult<Vec<Location>> {
    Ok(Json(ApiResponse::ok(state.registry.list_locations()?)))
}

/// GET /locations/:id
async fn get_location(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Location> {
    Ok(Json(ApiResponse::ok(state.registry.get_location(&id)?)))
}

/// POST /children - Create a child
async fn create_child(
    State(state): State<AppState>,
    payload: Result<Json<NewChild>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Created>>), ApiError> {
    let Json(input) = payload?;
    let id = state.registry.create_child(input)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(Created { id }))))
}

/// GET /children/:behavior - Children filtered by behavior (good|bad)
async fn list_children(
    State(state): State<AppState>,
    Path(behavior): Path<String>,
) -> ApiResult<Vec<Child>> {
    let behavior = behavior
        .parse::<Behavior>()
        .map_err(|e| RegistryError::InvalidInput(e.to_string()))?;

    Ok(Json(ApiResponse::ok(state.registry.list_children(behavior)?)))
}

/// GET /deliveries - Locations ranked by good children
async fn deliveries(State(state): State<AppState>) -> ApiResult<Vec<Location>> {
    let ranked = RoutePlanner::new(&state.registry).ranked_locations()?;
    Ok(Json(ApiResponse::ok(ranked)))
}

/// GET /route - Route over the delivery ranking
async fn compute_route(State(state): State<AppState>) -> ApiResult<Route> {
    let route = RoutePlanner::new(&state.registry).compute_route()?;
    Ok(Json(ApiResponse::ok(route)))
}

/// GET /audit - Locations whose counter disagrees with their children
async fn audit(State(state): State<AppState>) -> ApiResult<Vec<CounterDrift>> {
    Ok(Json(ApiResponse::ok(state.registry.audit_counters()?)))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/locations", post(create_location).get(list_locations))
        .route("/locations/:id", get(get_location))
        .route("/children", post(create_child))
        .route("/children/:behavior", get(list_children))
        .route("/deliveries", get(deliveries))
        .route("/route", get(compute_route))
        .route("/audit", get(audit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
