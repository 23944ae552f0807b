//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the API request/response types derived from them.

/// User account and session models
pub mod user;
/// Income record model
pub mod income;
/// Expense record model
pub mod expense;
/// Recurring income/expense models
pub mod recurring;
/// Budget and category allocation models
pub mod budget;
/// Savings goal and surplus tracker models
pub mod goal;
/// Budget alert endpoint models
pub mod alert;
