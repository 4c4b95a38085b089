//! Item master HTTP handlers

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
use crate::models::{ItemCategory, PaginatedResponse, RecordStatus};
use crate::services::item::{Item, ItemDetail, ItemFilter, ItemInput, ItemService, ItemSummary};
use crate::AppState;

/// Query parameters for listing items
#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub category: Option<ItemCategory>,
    pub status: Option<RecordStatus>,
}

/// List items
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ListItemsQuery>,
) -> AppResult<Json<PaginatedResponse<ItemSummary>>> {
    let pagination = page_params(&state, query.page, query.per_page);
    let filter = ItemFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        category: query.category,
        status: query.status,
    };

    let service = ItemService::new(state.db);
    let items = service.list_items(&filter, &pagination).await?;
    Ok(Json(items))
}

/// Get an item with its stock balances
pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<ItemDetail>> {
    let service = ItemService::new(state.db);
    let item = service.get_item_detail(item_id).await?;
    Ok(Json(item))
}

/// Create an item
pub async fn create_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ItemInput>,
) -> AppResult<(StatusCode, Json<Item>)> {
    let service = ItemService::new(state.db);
    let item = service.create_item(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Update an item
pub async fn update_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<ItemInput>,
) -> AppResult<Json<Item>> {
    let service = ItemService::new(state.db);
    let item = service.update_item(item_id, current_user.0.user_id, input).await?;
    Ok(Json(item))
}

/// Deactivate an item
pub async fn delete_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<Item>> {
    let service = ItemService::new(state.db);
    let item = service.deactivate_item(item_id, current_user.0.user_id).await?;
    Ok(Json(item))
}
