//! Invoice CRUD handlers.
//!
//! Write payloads arrive camelCase; responses use the snake_case entity
//! encoding. Validation happens here so the database service only ever sees
//! well-formed input.

use crate::models::{
    CreateInvoice, DeletedInvoice, InvoiceWithItems, NewInvoiceItem, UpdateInvoice,
};
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

/// Nested address block, camelCase on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub street: Option<String>,
    pub city: Option<String>,
    pub post_code: Option<String>,
    pub country: Option<String>,
}

/// One item in a create or update payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    pub product_id: Option<i64>,
    pub name: Option<String>,
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
}

impl From<ItemInput> for NewInvoiceItem {
    fn from(input: ItemInput) -> Self {
        NewInvoiceItem {
            product_id: input.product_id,
            name: input.name,
            quantity: input.quantity.unwrap_or(1),
            unit_price: input.unit_price.unwrap_or(Decimal::ZERO),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub code: Option<String>,
    pub date: Option<String>,
    pub payment_terms: Option<i32>,
    pub customer_name: Option<String>,
    pub client_email: Option<String>,
    pub client_address: Option<AddressInput>,
    pub sender_address: Option<AddressInput>,
    pub client_street: Option<String>,
    pub client_city: Option<String>,
    pub client_post_code: Option<String>,
    pub client_country: Option<String>,
    pub sender_street: Option<String>,
    pub sender_city: Option<String>,
    pub sender_post_code: Option<String>,
    pub sender_country: Option<String>,
    pub salesperson: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemInput>,
}

impl CreateInvoiceRequest {
    /// Required fields absent from the payload, reported by their wire names.
    fn missing_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if self.code.is_none() {
            fields.push("code".to_string());
        }
        if self.date.is_none() {
            fields.push("date".to_string());
        }
        if self.customer_name.is_none() {
            fields.push("customerName".to_string());
        }
        if self.salesperson.is_none() {
            fields.push("salesperson".to_string());
        }
        if self.status.is_none() {
            fields.push("status".to_string());
        }
        if self.items.is_empty() {
            fields.push("items".to_string());
        }
        fields
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    pub customer_name: Option<String>,
    pub client_email: Option<String>,
    pub salesperson: Option<String>,
    pub notes: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub payment_terms: Option<i32>,
    pub date: Option<String>,
    pub client_address: Option<AddressInput>,
    pub sender_address: Option<AddressInput>,
    pub client_street: Option<String>,
    pub client_city: Option<String>,
    pub client_post_code: Option<String>,
    pub client_country: Option<String>,
    pub sender_street: Option<String>,
    pub sender_city: Option<String>,
    pub sender_post_code: Option<String>,
    pub sender_country: Option<String>,
    pub items: Option<Vec<ItemInput>>,
}

#[derive(Debug, Deserialize)]
pub struct ListInvoicesParams {
    pub cursor: Option<i64>,
    pub limit: Option<i64>,
}

/// One page of invoices with the continuation cursor.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePage {
    pub items: Vec<InvoiceWithItems>,
    pub next_cursor: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub invoice: DeletedInvoice,
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp, keeping the date part.
/// Malformed dates share the missing-field wire code but carry a detail
/// saying what was wrong.
fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.date_naive());
    }
    Err(AppError::MissingFields {
        fields: vec!["date".to_string()],
        detail: Some(format!("date '{}' is not YYYY-MM-DD or RFC 3339", raw)),
    })
}

/// Path ids must parse as positive integers.
fn parse_id(raw: &str) -> Result<i64, AppError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::InvalidArgument(anyhow::anyhow!(
            "invalid invoice id: {}",
            raw
        ))),
    }
}

/// The nested address block wins over flat fields when both are present.
fn resolve_address(
    nested: Option<AddressInput>,
    street: Option<String>,
    city: Option<String>,
    post_code: Option<String>,
    country: Option<String>,
) -> (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
) {
    match nested {
        Some(address) => (
            address.street.or(street),
            address.city.or(city),
            address.post_code.or(post_code),
            address.country.or(country),
        ),
        None => (street, city, post_code, country),
    }
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(params): Query<ListInvoicesParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(10).max(1).min(50);

    let (items, next_cursor) = state.db.list_invoices(params.cursor, limit).await?;

    Ok(Json(InvoicePage { items, next_cursor }))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;

    let invoice = state
        .db
        .get_invoice(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("invoice {} not found", id)))?;

    Ok(Json(invoice))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let missing = request.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::missing_fields(missing));
    }

    // missing_fields() checked these are present
    let Some(code) = request.code else {
        return Err(AppError::missing_fields(vec!["code".to_string()]));
    };
    let Some(raw_date) = request.date else {
        return Err(AppError::missing_fields(vec!["date".to_string()]));
    };
    let Some(customer_name) = request.customer_name else {
        return Err(AppError::missing_fields(vec!["customerName".to_string()]));
    };
    let Some(salesperson) = request.salesperson else {
        return Err(AppError::missing_fields(vec!["salesperson".to_string()]));
    };
    let Some(status) = request.status else {
        return Err(AppError::missing_fields(vec!["status".to_string()]));
    };

    let date = parse_date(&raw_date)?;

    let (client_street, client_city, client_post_code, client_country) = resolve_address(
        request.client_address,
        request.client_street,
        request.client_city,
        request.client_post_code,
        request.client_country,
    );
    let (sender_street, sender_city, sender_post_code, sender_country) = resolve_address(
        request.sender_address,
        request.sender_street,
        request.sender_city,
        request.sender_post_code,
        request.sender_country,
    );

    let input = CreateInvoice {
        code,
        date,
        payment_terms: request.payment_terms.unwrap_or(30),
        customer_name,
        client_email: request.client_email,
        client_street,
        client_city,
        client_post_code,
        client_country,
        sender_street,
        sender_city,
        sender_post_code,
        sender_country,
        salesperson,
        status,
        notes: request.notes,
        description: request.description,
        items: request.items.into_iter().map(NewInvoiceItem::from).collect(),
    };

    let invoice = state.db.create_invoice(&input).await?;

    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;

    let date = match request.date {
        Some(raw) => Some(parse_date(&raw)?),
        None => None,
    };

    let (client_street, client_city, client_post_code, client_country) = resolve_address(
        request.client_address,
        request.client_street,
        request.client_city,
        request.client_post_code,
        request.client_country,
    );
    let (sender_street, sender_city, sender_post_code, sender_country) = resolve_address(
        request.sender_address,
        request.sender_street,
        request.sender_city,
        request.sender_post_code,
        request.sender_country,
    );

    let patch = UpdateInvoice {
        customer_name: request.customer_name,
        client_email: request.client_email,
        salesperson: request.salesperson,
        notes: request.notes,
        description: request.description,
        status: request.status,
        payment_terms: request.payment_terms,
        date,
        client_street,
        client_city,
        client_post_code,
        client_country,
        sender_street,
        sender_city,
        sender_post_code,
        sender_country,
        items: request
            .items
            .map(|items| items.into_iter().map(NewInvoiceItem::from).collect()),
    };

    if patch.is_noop() {
        return Err(AppError::NoFieldsToUpdate);
    }

    let invoice = state
        .db
        .update_invoice(id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("invoice {} not found", id)))?;

    Ok(Json(invoice))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;

    let deleted = state
        .db
        .delete_invoice(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("invoice {} not found", id)))?;

    Ok(Json(DeleteResponse {
        deleted: true,
        invoice: deleted,
    }))
}
