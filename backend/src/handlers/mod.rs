//! HTTP handlers for the Clinic Stock Management Platform

pub mod dashboard;
pub mod health;
pub mod items;
pub mod reports;
pub mod stock_balance;
pub mod stock_in;
pub mod stock_out;
pub mod suppliers;

pub use dashboard::*;
pub use health::*;
pub use items::*;
pub use reports::*;
pub use stock_balance::*;
pub use stock_in::*;
pub use stock_out::*;
pub use suppliers::*;

use crate::models::Pagination;
use crate::AppState;

/// Pagination from query values using the configured page sizes
pub(crate) fn page_params(state: &AppState, page: Option<u32>, per_page: Option<u32>) -> Pagination {
    let inventory = &state.config.inventory;
    Pagination::from_query(page, per_page, inventory.default_page_size, inventory.max_page_size)
}
