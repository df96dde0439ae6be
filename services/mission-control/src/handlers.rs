use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use skydrop_link::DroneStatus;
use skydrop_mission::{LaunchAck, LaunchRequest, MissionId, MissionRecord};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_MISSION_LIMIT: usize = 50;
const MAX_MISSION_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneRequest {
    pub drone_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub drone_id: String,
    pub connection_string: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneList {
    pub connected_drones: Vec<String>,
    pub total_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct MissionQuery {
    pub limit: Option<usize>,
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "name": "skydrop mission control",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "launch": "POST /api/launch",
            "status": "POST /api/status",
            "connect": "POST /api/connect",
            "drones": "GET /api/drones",
            "disconnect": "DELETE /api/drones/{id}",
            "returnHome": "POST /api/return-home",
            "missions": "GET /api/missions",
            "mission": "GET /api/missions/{id}",
            "health": "GET /health",
            "websocket": "WS /ws"
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "mission-control",
        "timestamp": Utc::now().to_rfc3339(),
        "startedAt": state.started_at.to_rfc3339(),
        "drones": state.registry().len().await,
        "activeMissions": state.runner.active_missions().len(),
        "subscribers": state.broadcaster().subscriber_count()
    }))
}

pub async fn launch(
    State(state): State<AppState>,
    payload: Result<Json<LaunchRequest>, JsonRejection>,
) -> Result<Json<LaunchAck>, ApiError> {
    let Json(request) = payload?;
    info!(drone_id = %request.drone_id, block = %request.block, "launch requested");
    Ok(Json(state.runner.launch(request).await?))
}

pub async fn status(
    State(state): State<AppState>,
    payload: Result<Json<DroneRequest>, JsonRejection>,
) -> Result<Json<DroneStatus>, ApiError> {
    let Json(request) = payload?;
    let link = state.registry().get(&request.drone_id).await.ok_or_else(|| {
        ApiError::NotFound("Drone not connected. Please provide connection string.".to_string())
    })?;
    Ok(Json(link.status().await))
}

pub async fn connect(
    State(state): State<AppState>,
    payload: Result<Json<ConnectRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    if request.drone_id.trim().is_empty() || request.connection_string.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "droneId and connectionString are required".to_string(),
        ));
    }

    state
        .registry()
        .replace(&request.drone_id, &request.connection_string)
        .await?;
    info!(drone_id = %request.drone_id, "drone connected");
    Ok(Json(json!({
        "status": format!("Successfully connected to drone {}", request.drone_id),
        "droneId": request.drone_id
    })))
}

pub async fn list_drones(State(state): State<AppState>) -> Json<DroneList> {
    let connected_drones = state.registry().list().await;
    Json(DroneList {
        total_count: connected_drones.len(),
        connected_drones,
    })
}

pub async fn disconnect_drone(
    State(state): State<AppState>,
    Path(drone_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.registry().remove(&drone_id).await?;
    Ok(Json(json!({ "message": format!("Drone {} disconnected", drone_id) })))
}

pub async fn return_home(
    State(state): State<AppState>,
    payload: Result<Json<DroneRequest>, JsonRejection>,
) -> Result<Json<LaunchAck>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(state.runner.return_home(&request.drone_id).await?))
}

pub async fn list_missions(
    State(state): State<AppState>,
    Query(query): Query<MissionQuery>,
) -> Result<Json<Vec<MissionRecord>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_MISSION_LIMIT)
        .min(MAX_MISSION_LIMIT);
    Ok(Json(state.store().list(limit)?))
}

pub async fn get_mission(
    State(state): State<AppState>,
    Path(mission_id): Path<MissionId>,
) -> Result<Json<MissionRecord>, ApiError> {
    Ok(Json(state.store().get(mission_id)?))
}
