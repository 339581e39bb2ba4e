//! Product catalog handler.

use crate::startup::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ListProductsParams {
    pub query: Option<String>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListProductsParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(10).max(1).min(50);
    let page = params.page.unwrap_or(1).max(1);

    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty());

    let page = state.db.list_products(query, limit, page).await?;

    Ok(Json(page))
}
