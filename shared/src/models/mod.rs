//! Domain models for the Clinic Stock Management Platform

mod balance;
mod item;
mod stock_in;
mod stock_out;
mod supplier;
mod user;

pub use balance::*;
pub use item::*;
pub use stock_in::*;
pub use stock_out::*;
pub use supplier::*;
pub use user::*;
