//! Report HTTP handlers

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::reporting::{
    BalanceReport, BalanceReportFilter, LowStockReport, LowStockReportFilter, MovementReport,
    MovementReportFilter, ReportingService,
};
use crate::AppState;

/// Stock movements in a date window (default: the configured report window)
pub async fn get_movement_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<MovementReportFilter>,
) -> AppResult<Json<MovementReport>> {
    let window_days = state.config.inventory.report_window_days;
    let service = ReportingService::new(state.db);
    let report = service
        .movement_report(&filter, window_days, current_user.0.display_name())
        .await?;
    Ok(Json(report))
}

pub async fn get_balance_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<BalanceReportFilter>,
) -> AppResult<Json<BalanceReport>> {
    let service = ReportingService::new(state.db);
    let report = service
        .balance_report(&filter, current_user.0.display_name())
        .await?;
    Ok(Json(report))
}

pub async fn get_low_stock_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<LowStockReportFilter>,
) -> AppResult<Json<LowStockReport>> {
    let factor = state.config.inventory.low_stock_reorder_factor;
    let service = ReportingService::new(state.db);
    let report = service
        .low_stock_report(&filter, factor, current_user.0.display_name())
        .await?;
    Ok(Json(report))
}
