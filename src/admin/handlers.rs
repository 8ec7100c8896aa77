use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::engine::{CorrelationEngine, EngineStats};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn get_status(State(engine): State<Arc<CorrelationEngine>>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if engine.is_shut_down() { "shut_down" } else { "operational" },
    })
}

pub async fn get_correlations(State(engine): State<Arc<CorrelationEngine>>) -> Json<EngineStats> {
    Json(engine.stats())
}
