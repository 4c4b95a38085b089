//! Business logic services for the Clinic Stock Management Platform

pub mod balance;
pub mod dashboard;
pub mod item;
pub mod reporting;
pub mod stock_in;
pub mod stock_out;
pub mod supplier;

pub use balance::BalanceService;
pub use dashboard::DashboardService;
pub use item::ItemService;
pub use reporting::ReportingService;
pub use stock_in::StockInService;
pub use stock_out::StockOutService;
pub use supplier::SupplierService;
