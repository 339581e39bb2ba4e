//! Revenue aggregation model for invoicing-service.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// Bucket width for revenue aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevenueBucket {
    Daily,
    Weekly,
    Monthly,
}

impl RevenueBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevenueBucket::Daily => "daily",
            RevenueBucket::Weekly => "weekly",
            RevenueBucket::Monthly => "monthly",
        }
    }

    /// DATE_TRUNC unit for this bucket.
    pub fn trunc_unit(&self) -> &'static str {
        match self {
            RevenueBucket::Daily => "day",
            RevenueBucket::Weekly => "week",
            RevenueBucket::Monthly => "month",
        }
    }

    /// Unknown bucket names fall back to daily.
    pub fn from_string(s: &str) -> Self {
        match s {
            "weekly" => RevenueBucket::Weekly,
            "monthly" => RevenueBucket::Monthly,
            _ => RevenueBucket::Daily,
        }
    }
}

/// Aggregation row as produced by the store query, newest period first.
#[derive(Debug, Clone, FromRow)]
pub struct RevenueRow {
    pub period: NaiveDate,
    pub revenue: Decimal,
    pub invoice_count: i64,
    pub avg_invoice_value: Decimal,
}

/// One period in the revenue report, emitted in chronological order with a
/// date-only period key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenuePoint {
    pub period: String,
    pub revenue: Decimal,
    pub invoice_count: i64,
    pub avg_invoice_value: Decimal,
}

impl From<RevenueRow> for RevenuePoint {
    fn from(row: RevenueRow) -> Self {
        RevenuePoint {
            period: row.period.format("%Y-%m-%d").to_string(),
            revenue: row.revenue,
            invoice_count: row.invoice_count,
            avg_invoice_value: row.avg_invoice_value,
        }
    }
}

/// The query orders period descending so the cap keeps the newest buckets;
/// callers always receive ascending chronological order.
pub fn chronological(rows: Vec<RevenueRow>) -> Vec<RevenuePoint> {
    rows.into_iter().rev().map(RevenuePoint::from).collect()
}
