//! Supplier HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::page_params;
use crate::middleware::CurrentUser;
use crate::models::{PaginatedResponse, RecordStatus};
use crate::services::supplier::{
    Supplier, SupplierDetail, SupplierFilter, SupplierInput, SupplierService, SupplierSummary,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListSuppliersQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub status: Option<RecordStatus>,
}

pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(query): Query<ListSuppliersQuery>,
) -> AppResult<Json<PaginatedResponse<SupplierSummary>>> {
    let pagination = page_params(&state, query.page, query.per_page);
    let filter = SupplierFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        status: query.status,
    };

    let service = SupplierService::new(state.db);
    Ok(Json(service.list_suppliers(&filter, &pagination).await?))
}

/// Get a supplier with its recent receipts
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<SupplierDetail>> {
    let service = SupplierService::new(state.db);
    Ok(Json(service.get_supplier_detail(supplier_id).await?))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<SupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    let service = SupplierService::new(state.db);
    let supplier = service.create_supplier(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
    Json(input): Json<SupplierInput>,
) -> AppResult<Json<Supplier>> {
    let service = SupplierService::new(state.db);
    let supplier = service
        .update_supplier(supplier_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(supplier))
}

/// Deactivate a supplier
pub async fn delete_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Supplier>> {
    let service = SupplierService::new(state.db);
    let supplier = service
        .deactivate_supplier(supplier_id, current_user.0.user_id)
        .await?;
    Ok(Json(supplier))
}
