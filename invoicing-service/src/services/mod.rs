//! Services module for invoicing-service.

pub mod database;

pub use database::Database;
