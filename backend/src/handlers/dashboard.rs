//! Dashboard HTTP handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::dashboard::{DashboardService, DashboardStats, RecentTransactions};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecentTransactionsQuery {
    pub limit: Option<u32>,
}

pub async fn get_dashboard_stats(State(state): State<AppState>) -> AppResult<Json<DashboardStats>> {
    let window_days = state.config.inventory.report_window_days;
    let service = DashboardService::new(state.db);
    Ok(Json(service.stats(window_days).await?))
}

pub async fn get_recent_transactions(
    State(state): State<AppState>,
    Query(query): Query<RecentTransactionsQuery>,
) -> AppResult<Json<RecentTransactions>> {
    let inventory = &state.config.inventory;
    let limit = query
        .limit
        .unwrap_or(inventory.default_page_size)
        .clamp(1, inventory.max_page_size.max(1));

    let service = DashboardService::new(state.db);
    Ok(Json(service.recent_transactions(i64::from(limit)).await?))
}
