//! Dashboard endpoints: headline counters and chart data.

use axum::extract::State;
use axum::Json;

use super::today;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::reports::{self, DashboardAnalytics, DashboardStats};

/// `GET /api/dashboard/stats`
pub async fn stats(State(ctx): State<ApiContext>) -> Result<Json<DashboardStats>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(reports::dashboard_stats(&conn, today())?))
}

/// `GET /api/dashboard/analytics`
pub async fn analytics(
    State(ctx): State<ApiContext>,
) -> Result<Json<DashboardAnalytics>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(reports::dashboard_analytics(&conn, today())?))
}
