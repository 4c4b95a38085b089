//! Stock-in HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::page_params;
use crate::middleware::CurrentUser;
use crate::models::{PaginatedResponse, StockInStatus};
use crate::services::stock_in::{StockIn, StockInFilter, StockInInput, StockInService, StockInView};
use crate::AppState;

/// Query parameters for listing receipts
#[derive(Debug, Deserialize)]
pub struct ListStockInsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub item_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub status: Option<StockInStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

pub async fn list_stock_ins(
    State(state): State<AppState>,
    Query(query): Query<ListStockInsQuery>,
) -> AppResult<Json<PaginatedResponse<StockInView>>> {
    let pagination = page_params(&state, query.page, query.per_page);
    let filter = StockInFilter {
        item_id: query.item_id,
        supplier_id: query.supplier_id,
        status: query.status,
        date_from: query.date_from,
        date_to: query.date_to,
    };

    let service = StockInService::new(state.db);
    Ok(Json(service.list_stock_ins(&filter, &pagination).await?))
}

pub async fn get_stock_in(
    State(state): State<AppState>,
    Path(stock_in_id): Path<Uuid>,
) -> AppResult<Json<StockInView>> {
    let service = StockInService::new(state.db);
    Ok(Json(service.get_stock_in(stock_in_id).await?))
}

/// Create a DRAFT receipt
pub async fn create_stock_in(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<StockInInput>,
) -> AppResult<(StatusCode, Json<StockIn>)> {
    let service = StockInService::new(state.db);
    let stock_in = service.create_stock_in(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(stock_in)))
}

/// Edit a receipt
pub async fn update_stock_in(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_in_id): Path<Uuid>,
    Json(input): Json<StockInInput>,
) -> AppResult<Json<StockIn>> {
    let service = StockInService::new(state.db);
    let stock_in = service
        .update_stock_in(stock_in_id, &current_user.0, input)
        .await?;
    Ok(Json(stock_in))
}

/// Confirm a receipt and add it to the ledger
pub async fn confirm_stock_in(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_in_id): Path<Uuid>,
) -> AppResult<Json<StockIn>> {
    let service = StockInService::new(state.db);
    let stock_in = service.confirm_stock_in(stock_in_id, &current_user.0).await?;
    Ok(Json(stock_in))
}

/// Cancel a receipt
pub async fn cancel_stock_in(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_in_id): Path<Uuid>,
) -> AppResult<Json<StockIn>> {
    let service = StockInService::new(state.db);
    let stock_in = service.cancel_stock_in(stock_in_id, &current_user.0).await?;
    Ok(Json(stock_in))
}
