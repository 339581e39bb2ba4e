//! Typed client for the invoicing service: wire models, an async API
//! client, and a synchronous state store for UI frontends.

pub mod api;
pub mod models;
pub mod store;

pub use api::{ApiClient, ClientError};
pub use store::{Action, InvoiceStore};
