//! Stock-out HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::page_params;
use crate::middleware::CurrentUser;
use crate::models::{PaginatedResponse, StockOutStatus};
use crate::services::stock_out::{
    LotAvailability, StockOut, StockOutFilter, StockOutInput, StockOutService, StockOutView,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListStockOutsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub item_id: Option<Uuid>,
    pub request_dept: Option<String>,
    pub status: Option<StockOutStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Query parameters for the FEFO lot picker
#[derive(Debug, Deserialize)]
pub struct AvailableLotsQuery {
    pub item_id: Uuid,
    pub quantity: Option<Decimal>,
}

pub async fn list_stock_outs(
    State(state): State<AppState>,
    Query(query): Query<ListStockOutsQuery>,
) -> AppResult<Json<PaginatedResponse<StockOutView>>> {
    let pagination = page_params(&state, query.page, query.per_page);
    let filter = StockOutFilter {
        item_id: query.item_id,
        request_dept: query.request_dept.filter(|d| !d.trim().is_empty()),
        status: query.status,
        date_from: query.date_from,
        date_to: query.date_to,
    };

    let service = StockOutService::new(state.db);
    Ok(Json(service.list_stock_outs(&filter, &pagination).await?))
}

pub async fn get_stock_out(
    State(state): State<AppState>,
    Path(stock_out_id): Path<Uuid>,
) -> AppResult<Json<StockOutView>> {
    let service = StockOutService::new(state.db);
    Ok(Json(service.get_stock_out(stock_out_id).await?))
}

/// Lots of an item that can be issued, soonest expiry first
pub async fn get_available_lots(
    State(state): State<AppState>,
    Query(query): Query<AvailableLotsQuery>,
) -> AppResult<Json<LotAvailability>> {
    let service = StockOutService::new(state.db);
    Ok(Json(service.available_lots(query.item_id, query.quantity).await?))
}

/// Create a DRAFT issue request
pub async fn create_stock_out(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<StockOutInput>,
) -> AppResult<(StatusCode, Json<StockOut>)> {
    let service = StockOutService::new(state.db);
    let stock_out = service.create_stock_out(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(stock_out)))
}

pub async fn update_stock_out(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_out_id): Path<Uuid>,
    Json(input): Json<StockOutInput>,
) -> AppResult<Json<StockOut>> {
    let service = StockOutService::new(state.db);
    let stock_out = service
        .update_stock_out(stock_out_id, &current_user.0, input)
        .await?;
    Ok(Json(stock_out))
}

/// Approve an issue and deduct it from the ledger
pub async fn approve_stock_out(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_out_id): Path<Uuid>,
) -> AppResult<Json<StockOut>> {
    let service = StockOutService::new(state.db);
    let stock_out = service.approve_stock_out(stock_out_id, &current_user.0).await?;
    Ok(Json(stock_out))
}

pub async fn cancel_stock_out(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_out_id): Path<Uuid>,
) -> AppResult<Json<StockOut>> {
    let service = StockOutService::new(state.db);
    let stock_out = service.cancel_stock_out(stock_out_id, &current_user.0).await?;
    Ok(Json(stock_out))
}
