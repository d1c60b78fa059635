//! HTTP and WebSocket surface
//!
//! Thin glue over the store, the scheduler and the hub.
//!
//! | Method | Path                              | Operation                    |
//! |--------|-----------------------------------|------------------------------|
//! | GET    | `/health`                         | liveness and observer count  |
//! | GET    | `/ws`                             | observer stream              |
//! | GET    | `/api/vessels`                    | fleet snapshot               |
//! | GET    | `/api/vessels/unassigned`         | vessels with no reservation  |
//! | POST   | `/api/vessels/{id}/route`         | assign a route               |
//! | POST   | `/api/vessels/{id}/refuel`        | fill the tanks               |
//! | POST   | `/api/components/{id}/maintain`   | restore a component          |
//! | POST   | `/api/allocations`                | reserve a berth              |
//! | GET    | `/api/ports/{id}/schedule`        | reservations at a port       |

use anyhow::Context;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_graceful_shutdown::SubsystemHandle;

use neptune_core::berth::interval_from_hours;
use neptune_core::{
    BerthAllocation, BerthId, Component, ComponentId, PortId, RouteId, StreamMessage, Vessel,
    VesselId,
};

use crate::config::HubConfig;
use crate::hub::{self, HubHandle};
use crate::scheduler::{AllocationRequest, BerthScheduler, ScheduleError};
use crate::store::{FleetStore, StoreError};

/// Default look-ahead of a port schedule query
const SCHEDULE_WINDOW_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FleetStore>,
    pub hub: HubHandle,
    pub scheduler: Arc<BerthScheduler>,
    pub hub_config: HubConfig,
    /// Speed given to a vessel on route assignment
    pub assigned_route_speed_kn: f64,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(e) | ApiError::Schedule(ScheduleError::Store(e)) => match e {
                StoreError::InvalidTransition { .. } | StoreError::BerthOccupied { .. } => {
                    StatusCode::CONFLICT
                }
                StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::NOT_FOUND,
            },
            ApiError::Schedule(ScheduleError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Schedule(ScheduleError::Interval(_)) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            log::debug!("web: {} {}", status, self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(observe))
        .route("/api/vessels", get(vessels))
        .route("/api/vessels/unassigned", get(unassigned_vessels))
        .route("/api/vessels/{id}/route", post(assign_route))
        .route("/api/vessels/{id}/refuel", post(refuel))
        .route("/api/components/{id}/maintain", post(maintain))
        .route("/api/allocations", post(create_allocation))
        .route("/api/ports/{id}/schedule", get(port_schedule))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "clients": state.hub.client_count() }))
}

async fn observe(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let snapshot = StreamMessage::FleetUpdate(state.store.vessels().await?);
    let handle = state.hub.clone();
    let config = state.hub_config.clone();
    Ok(ws.on_upgrade(move |socket| hub::serve(socket, handle, snapshot, config)))
}

async fn vessels(State(state): State<AppState>) -> Result<Json<Vec<Vessel>>, ApiError> {
    Ok(Json(state.store.vessels().await?))
}

/// Vessels holding no reservation that is still to end
async fn unassigned_vessels(State(state): State<AppState>) -> Result<Json<Vec<Vessel>>, ApiError> {
    Ok(Json(state.store.unassigned_vessels(Utc::now()).await?))
}

#[derive(Deserialize)]
struct RouteAssignment {
    route_id: RouteId,
}

async fn assign_route(
    State(state): State<AppState>,
    Path(id): Path<VesselId>,
    Json(body): Json<RouteAssignment>,
) -> Result<Json<Vessel>, ApiError> {
    let vessel = state
        .store
        .assign_route(&id, &body.route_id, state.assigned_route_speed_kn)
        .await?;
    log::info!("{}: assigned route {}", vessel.name, body.route_id);
    Ok(Json(vessel))
}

async fn refuel(
    State(state): State<AppState>,
    Path(id): Path<VesselId>,
) -> Result<Json<Vessel>, ApiError> {
    let vessel = state.store.refuel(&id).await?;
    log::info!("{}: refuelled to {:.1}", vessel.name, vessel.fuel_level);
    Ok(Json(vessel))
}

async fn maintain(
    State(state): State<AppState>,
    Path(id): Path<ComponentId>,
) -> Result<Json<Component>, ApiError> {
    let component = state.store.maintain_component(&id).await?;
    log::info!("{}: component {} serviced", component.vessel_id, component.name);
    Ok(Json(component))
}

#[derive(Deserialize)]
struct NewAllocation {
    vessel_id: VesselId,
    berth_id: BerthId,
    start_time: DateTime<Utc>,
    duration_hours: i64,
    #[serde(default)]
    notes: String,
}

async fn create_allocation(
    State(state): State<AppState>,
    Json(body): Json<NewAllocation>,
) -> Result<(StatusCode, Json<BerthAllocation>), ApiError> {
    let end_time =
        interval_from_hours(body.start_time, body.duration_hours).map_err(ScheduleError::from)?;
    let allocation = state
        .scheduler
        .create(AllocationRequest {
            vessel_id: body.vessel_id,
            berth_id: body.berth_id,
            start_time: body.start_time,
            end_time,
            notes: body.notes,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(allocation)))
}

#[derive(Deserialize)]
struct ScheduleWindow {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

async fn port_schedule(
    State(state): State<AppState>,
    Path(id): Path<PortId>,
    Query(window): Query<ScheduleWindow>,
) -> Result<Json<Vec<BerthAllocation>>, ApiError> {
    let start = window.start.unwrap_or_else(Utc::now);
    let end = window
        .end
        .unwrap_or(start + Duration::days(SCHEDULE_WINDOW_DAYS));
    state.store.port(&id).await?;
    Ok(Json(state.store.allocations_for_port(&id, start, end).await?))
}

/// The HTTP server subsystem
pub struct Web {
    bind: SocketAddr,
    state: AppState,
}

impl Web {
    pub fn new(bind: SocketAddr, state: AppState) -> Self {
        Web { bind, state }
    }

    pub async fn run(self, subsys: SubsystemHandle) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind)
            .await
            .with_context(|| format!("cannot listen on {}", self.bind))?;
        log::info!("web: listening on {}", listener.local_addr()?);

        let shutdown = subsys.create_cancellation_token().cancelled_owned();
        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .context("web server failed")?;
        log::debug!("web: stopped");
        Ok(())
    }
}
