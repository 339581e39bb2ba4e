//! Invoice model for invoicing-service.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::line_item::{InvoiceItem, NewInvoiceItem};

/// Invoice status vocabulary. Stored status strings are not constrained to
/// these values; the enum names the ones with server-side meaning (revenue
/// aggregates `Paid` invoices only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
        }
    }
}

/// Invoice row. Serialized with snake_case field names, which is the read
/// side of the wire contract.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: i64,
    pub code: String,
    pub date: NaiveDate,
    pub payment_terms: i32,
    pub customer_name: String,
    pub client_email: Option<String>,
    pub client_street: Option<String>,
    pub client_city: Option<String>,
    pub client_post_code: Option<String>,
    pub client_country: Option<String>,
    pub sender_street: Option<String>,
    pub sender_city: Option<String>,
    pub sender_post_code: Option<String>,
    pub sender_country: Option<String>,
    pub salesperson: String,
    pub status: String,
    pub notes: Option<String>,
    pub description: Option<String>,
    pub total: Decimal,
}

/// Invoice with its line items attached, as returned by the read service.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceWithItems {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

/// Validated input for creating an invoice together with its items.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub code: String,
    pub date: NaiveDate,
    pub payment_terms: i32,
    pub customer_name: String,
    pub client_email: Option<String>,
    pub client_street: Option<String>,
    pub client_city: Option<String>,
    pub client_post_code: Option<String>,
    pub client_country: Option<String>,
    pub sender_street: Option<String>,
    pub sender_city: Option<String>,
    pub sender_post_code: Option<String>,
    pub sender_country: Option<String>,
    pub salesperson: String,
    pub status: String,
    pub notes: Option<String>,
    pub description: Option<String>,
    pub items: Vec<NewInvoiceItem>,
}

impl CreateInvoice {
    /// Invoice total is always the sum of line totals, never taken from input.
    pub fn total(&self) -> Decimal {
        self.items.iter().map(NewInvoiceItem::line_total).sum()
    }
}

/// Sparse patch for an invoice. Only `Some` fields produce a SQL assignment;
/// `items` replaces the entire item set when present.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoice {
    pub customer_name: Option<String>,
    pub client_email: Option<String>,
    pub salesperson: Option<String>,
    pub notes: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub payment_terms: Option<i32>,
    pub date: Option<NaiveDate>,
    pub client_street: Option<String>,
    pub client_city: Option<String>,
    pub client_post_code: Option<String>,
    pub client_country: Option<String>,
    pub sender_street: Option<String>,
    pub sender_city: Option<String>,
    pub sender_post_code: Option<String>,
    pub sender_country: Option<String>,
    pub items: Option<Vec<NewInvoiceItem>>,
}

impl UpdateInvoice {
    /// Whether any scalar (non-item) field is present.
    pub fn has_scalar_fields(&self) -> bool {
        self.customer_name.is_some()
            || self.client_email.is_some()
            || self.salesperson.is_some()
            || self.notes.is_some()
            || self.description.is_some()
            || self.status.is_some()
            || self.payment_terms.is_some()
            || self.date.is_some()
            || self.client_street.is_some()
            || self.client_city.is_some()
            || self.client_post_code.is_some()
            || self.client_country.is_some()
            || self.sender_street.is_some()
            || self.sender_city.is_some()
            || self.sender_post_code.is_some()
            || self.sender_country.is_some()
    }

    /// A patch with nothing to change is rejected before any store access.
    pub fn is_noop(&self) -> bool {
        !self.has_scalar_fields() && self.items.is_none()
    }
}

/// Identity fields returned to the caller as delete confirmation.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DeletedInvoice {
    pub id: i64,
    pub code: String,
    pub date: NaiveDate,
}
