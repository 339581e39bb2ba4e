//! Async HTTP client for the invoicing service.

use crate::models::{
    DeleteConfirmation, Invoice, InvoicePage, InvoicePatch, NewInvoice, ProductPage, RevenueReport,
};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("missing required fields: {fields:?}")]
    MissingFields { fields: Vec<String> },
    #[error("invalid invoice id")]
    InvalidId,
    #[error("invoice not found")]
    NotFound,
    #[error("no fields to update")]
    NoFieldsToUpdate,
    #[error("server error {status}: {code}")]
    Server { status: u16, code: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Typed client over the service's wire contract.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map error responses to typed errors by wire code; pass success through.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let code = body["error"].as_str().unwrap_or("unknown").to_string();

        Err(match (status, code.as_str()) {
            (StatusCode::BAD_REQUEST, "missing_fields") => {
                let fields = body["fields"]
                    .as_array()
                    .map(|fields| {
                        fields
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                ClientError::MissingFields { fields }
            }
            (StatusCode::BAD_REQUEST, "invalid_id") => ClientError::InvalidId,
            (StatusCode::BAD_REQUEST, "no_fields_to_update") => ClientError::NoFieldsToUpdate,
            (StatusCode::NOT_FOUND, _) => ClientError::NotFound,
            _ => ClientError::Server {
                status: status.as_u16(),
                code,
            },
        })
    }

    pub async fn list_invoices(
        &self,
        cursor: Option<i64>,
        limit: Option<i64>,
    ) -> Result<InvoicePage, ClientError> {
        let mut request = self.http.get(self.url("/invoices"));
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn get_invoice(&self, id: i64) -> Result<Invoice, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/invoices/{}", id)))
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    pub async fn create_invoice(&self, invoice: &NewInvoice) -> Result<Invoice, ClientError> {
        let response = self
            .http
            .post(self.url("/invoices"))
            .json(invoice)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    pub async fn update_invoice(
        &self,
        id: i64,
        patch: &InvoicePatch,
    ) -> Result<Invoice, ClientError> {
        let response = self
            .http
            .patch(self.url(&format!("/invoices/{}", id)))
            .json(patch)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    /// Convenience wrapper for the most common patch.
    pub async fn update_status(&self, id: i64, status: &str) -> Result<Invoice, ClientError> {
        let patch = InvoicePatch {
            status: Some(status.to_string()),
            ..Default::default()
        };
        self.update_invoice(id, &patch).await
    }

    pub async fn delete_invoice(&self, id: i64) -> Result<DeleteConfirmation, ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/invoices/{}", id)))
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    pub async fn list_products(
        &self,
        query: Option<&str>,
        limit: Option<i64>,
        page: Option<i64>,
    ) -> Result<ProductPage, ClientError> {
        let mut request = self.http.get(self.url("/products"));
        if let Some(query) = query {
            request = request.query(&[("query", query)]);
        }
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        if let Some(page) = page {
            request = request.query(&[("page", page)]);
        }
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn revenue(
        &self,
        bucket: Option<&str>,
        limit: Option<i64>,
    ) -> Result<RevenueReport, ClientError> {
        let mut request = self.http.get(self.url("/revenue"));
        if let Some(bucket) = bucket {
            request = request.query(&[("bucket", bucket)]);
        }
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }
}
