//! HTTP+JSON front end: convert, save, history.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use converters::{handle_convert, ConvertRequest, ConvertResponse, SaveRequest};
use history_store::{HistoryRecord, HistoryStore};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use unit_table::{Category, Unit};

pub mod config;
pub mod error;

pub use config::{ApiConfig, ConfigError};
pub use error::ApiError;

pub struct AppState {
    pub store: HistoryStore,
}

pub fn router(store: HistoryStore) -> Router {
    let state = Arc::new(AppState { store });
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/convert", post(convert))
        .route("/api/save", post(save))
        .route("/api/history", get(history))
        .route("/api/units", get(units))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn convert(payload: Result<Json<ConvertRequest>, JsonRejection>) -> Result<Json<ConvertResponse>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(handle_convert(req)?))
}

#[derive(Debug, Serialize)]
pub struct SaveResponse { pub saved: bool }

async fn save(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError> {
    let Json(req) = payload?;
    let record = req.validate()?;
    let id = state.store.save(&record).await?;
    tracing::info!(id, category = %record.category, from = %record.from_unit, to = %record.to_unit, "saved conversion");
    Ok(Json(SaveResponse { saved: true }))
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse { pub history: Vec<HistoryRecord> }

async fn history(State(state): State<Arc<AppState>>) -> Result<Json<HistoryResponse>, ApiError> {
    let history = state.store.recent().await?;
    Ok(Json(HistoryResponse { history }))
}

#[derive(Debug, Serialize)]
pub struct UnitsResponse { pub units: BTreeMap<&'static str, Vec<Unit>> }

async fn units() -> Json<UnitsResponse> {
    let units = Category::ALL.iter().map(|c| (c.as_str(), unit_table::units(*c))).collect();
    Json(UnitsResponse { units })
}
