//! Domain models for the Clinic Stock Management Platform
//!
//! Re-exports the shared crate's models, ledger rules and common types

pub use shared::codes::*;
pub use shared::ledger::*;
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;
