//! invoicing-service: invoice CRUD over HTTP with cursor-paginated listing
//! and bucketed revenue aggregation.
pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
