//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and complex operations.

pub mod alerts;
pub mod budget;
pub mod classify;
pub mod csv_import;
pub mod forecast;
pub mod periods;
pub mod recurring;
pub mod surplus;
