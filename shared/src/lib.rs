//! Shared types and ledger rules for the Clinic Stock Management Platform
//!
//! This crate contains the pure parts of the system: domain enums, the
//! balance status classifier, FEFO lot selection, the ledger rebuild fold and
//! document-number generation. It is used by the backend server and by the
//! WASM helpers that power the browser lot picker.

pub mod codes;
pub mod ledger;
pub mod models;
pub mod types;
pub mod validation;

pub use codes::*;
pub use ledger::*;
pub use models::*;
pub use types::*;
pub use validation::*;
