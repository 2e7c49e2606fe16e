//! API endpoint handlers, one module per route group.

pub mod analyze;
pub mod extract;
pub mod health;
pub mod reports;
