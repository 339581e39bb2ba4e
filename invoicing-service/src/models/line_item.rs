//! Line item model for invoicing-service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Line item on an invoice, as stored and as read off the wire.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceItem {
    pub id: i64,
    pub product_id: Option<i64>,
    pub name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Input for one invoice item. `name` may be omitted when a product is
/// referenced; it is resolved from the product inside the write transaction.
#[derive(Debug, Clone)]
pub struct NewInvoiceItem {
    pub product_id: Option<i64>,
    pub name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl NewInvoiceItem {
    /// line total = quantity × unit price, recomputed on every write.
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }

    /// Items with missing or blank names are discarded on item replacement.
    pub fn has_blank_name(&self) -> bool {
        self.name.as_deref().map_or(true, |n| n.trim().is_empty())
    }
}
