//! Wire models. Reads use the server's snake_case entity encoding; write
//! payloads serialize camelCase.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Invoice as returned by the server, items eagerly attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: i64,
    pub product_id: Option<i64>,
    pub name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// One page of invoices with the continuation cursor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePage {
    pub items: Vec<Invoice>,
    pub next_cursor: Option<i64>,
}

/// Address block for write payloads.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Create payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoice {
    pub code: String,
    pub date: String,
    pub customer_name: String,
    pub salesperson: String,
    pub status: String,
    pub items: Vec<NewInvoiceItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_terms: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoiceItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
}

/// Sparse patch payload; absent fields are left untouched by the server.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salesperson: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_terms: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<NewInvoiceItem>>,
}

/// Delete confirmation.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteConfirmation {
    pub deleted: bool,
    pub invoice: DeletedInvoice,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeletedInvoice {
    pub id: i64,
    pub code: String,
    pub date: NaiveDate,
}

/// Revenue report, oldest period first.
#[derive(Debug, Clone, Deserialize)]
pub struct RevenueReport {
    pub data: Vec<RevenuePoint>,
    pub bucket: String,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenuePoint {
    pub period: String,
    pub revenue: Decimal,
    pub invoice_count: i64,
    pub avg_invoice_value: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
}
