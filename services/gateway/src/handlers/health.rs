use crate::state::AppState;
use axum::{Json, extract::State};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub window_size: usize,
    pub metrics: BTreeMap<String, u64>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        window_size: state.window.len(),
        metrics: state.metrics.export(),
    })
}
