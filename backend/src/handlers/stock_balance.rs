//! Stock balance ledger HTTP handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{BalanceStatus, ItemCategory, Pagination};
use crate::services::balance::{BalanceFilter, BalanceListResponse, BalanceService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListBalancesQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub status: Option<BalanceStatus>,
    pub location: Option<String>,
    pub category: Option<ItemCategory>,
}

#[derive(Debug, Serialize)]
pub struct RecalculateResponse {
    pub message: String,
    pub total_records: usize,
}

/// List ledger rows, alerts first, with a per-status summary
pub async fn list_balances(
    State(state): State<AppState>,
    Query(query): Query<ListBalancesQuery>,
) -> AppResult<Json<BalanceListResponse>> {
    let inventory = &state.config.inventory;
    let pagination = Pagination::from_query(
        query.page,
        query.per_page,
        inventory.balance_page_size,
        inventory.max_page_size,
    );
    let filter = BalanceFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        status: query.status,
        location: query.location.filter(|l| !l.trim().is_empty()),
        category: query.category.map(|c| c.as_str().to_string()),
    };

    let service = BalanceService::new(state.db);
    Ok(Json(service.list_balances(&filter, &pagination).await?))
}

/// Rebuild the whole ledger from confirmed receipts and approved issues (ADMIN only)
pub async fn recalculate_balances(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<RecalculateResponse>> {
    current_user.0.require_admin()?;

    tracing::info!(user_id = %current_user.0.user_id, "Ledger recalculation requested");

    let service = BalanceService::new(state.db);
    let summary = service.recalculate_all().await?;

    Ok(Json(RecalculateResponse {
        message: format!("คำนวณยอดคงเหลือใหม่สำเร็จ {} รายการ", summary.total_records),
        total_records: summary.total_records,
    }))
}
