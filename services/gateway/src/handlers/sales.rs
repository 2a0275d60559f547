use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use sale_window::{EventRecord, QueryParams};

/// `GET /skinport-live`: retained sales matching every given filter,
/// oldest first.
///
/// The query string is taken as raw pairs so a repeated key narrows the
/// result instead of failing the request.
pub async fn live_sales(
    State(state): State<AppState>,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Vec<EventRecord>>, AppError> {
    let Query(pairs) = pairs.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let params = QueryParams::from_pairs(pairs);

    Ok(Json(state.query_engine.query(&params)))
}
