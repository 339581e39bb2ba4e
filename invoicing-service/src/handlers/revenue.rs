//! Revenue aggregation handler.

use crate::models::{RevenueBucket, RevenuePoint};
use crate::startup::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

#[derive(Debug, Deserialize)]
pub struct RevenueParams {
    pub bucket: Option<String>,
    pub limit: Option<i64>,
}

/// Revenue report, oldest period first.
#[derive(Debug, Serialize)]
pub struct RevenueReport {
    pub data: Vec<RevenuePoint>,
    pub bucket: &'static str,
    pub total: usize,
}

pub async fn revenue(
    State(state): State<AppState>,
    Query(params): Query<RevenueParams>,
) -> Result<impl IntoResponse, AppError> {
    let bucket = params
        .bucket
        .as_deref()
        .map(RevenueBucket::from_string)
        .unwrap_or(RevenueBucket::Daily);
    let limit = params.limit.unwrap_or(30).min(100).max(1);

    let data = state.db.revenue(bucket, limit).await?;

    Ok(Json(RevenueReport {
        total: data.len(),
        bucket: bucket.as_str(),
        data,
    }))
}
