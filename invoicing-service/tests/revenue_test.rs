//! Revenue aggregation over paid invoices.

mod common;

use common::{minimal_invoice, TestApp};
use serde_json::{json, Value};

async fn seed_invoice(app: &TestApp, code: &str, date: &str, status: &str, amount: f64) {
    let mut payload = minimal_invoice(code);
    payload["date"] = json!(date);
    payload["status"] = json!(status);
    payload["items"] = json!([{"name": "Service", "quantity": 1, "unitPrice": amount}]);

    let response = app
        .client
        .post(app.url("/invoices"))
        .json(&payload)
        .send()
        .await
        .expect("request failed");
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn daily_revenue_counts_only_paid_invoices_in_chronological_order() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    seed_invoice(&app, "INV-R1", "2025-06-01", "paid", 100.0).await;
    seed_invoice(&app, "INV-R2", "2025-06-01", "paid", 50.0).await;
    seed_invoice(&app, "INV-R3", "2025-06-03", "paid", 200.0).await;
    seed_invoice(&app, "INV-R4", "2025-06-02", "pending", 999.0).await;

    let report: Value = app
        .client
        .get(app.url("/revenue"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");

    assert_eq!(report["bucket"], "daily");
    assert_eq!(report["total"].as_i64(), Some(2));

    let data = report["data"].as_array().expect("data array");
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["period"], "2025-06-01");
    assert_eq!(data[0]["revenue"].as_f64(), Some(150.0));
    assert_eq!(data[0]["invoiceCount"].as_i64(), Some(2));
    assert_eq!(data[0]["avgInvoiceValue"].as_f64(), Some(75.0));
    assert_eq!(data[1]["period"], "2025-06-03");
    assert_eq!(data[1]["revenue"].as_f64(), Some(200.0));

    app.cleanup().await;
}

#[tokio::test]
async fn monthly_bucket_groups_across_days() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    seed_invoice(&app, "INV-M1", "2025-05-01", "paid", 10.0).await;
    seed_invoice(&app, "INV-M2", "2025-05-20", "paid", 30.0).await;
    seed_invoice(&app, "INV-M3", "2025-06-05", "paid", 5.0).await;

    let report: Value = app
        .client
        .get(app.url("/revenue?bucket=monthly"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");

    assert_eq!(report["bucket"], "monthly");
    let data = report["data"].as_array().expect("data array");
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["period"], "2025-05-01");
    assert_eq!(data[0]["revenue"].as_f64(), Some(40.0));
    assert_eq!(data[1]["period"], "2025-06-01");

    app.cleanup().await;
}

#[tokio::test]
async fn unknown_bucket_falls_back_to_daily() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    seed_invoice(&app, "INV-B1", "2025-06-01", "paid", 10.0).await;

    let report: Value = app
        .client
        .get(app.url("/revenue?bucket=hourly"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");

    assert_eq!(report["bucket"], "daily");
    assert_eq!(report["total"].as_i64(), Some(1));

    app.cleanup().await;
}

#[tokio::test]
async fn limit_keeps_the_newest_periods() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    seed_invoice(&app, "INV-L1", "2025-06-01", "paid", 1.0).await;
    seed_invoice(&app, "INV-L2", "2025-06-02", "paid", 2.0).await;
    seed_invoice(&app, "INV-L3", "2025-06-03", "paid", 3.0).await;

    let report: Value = app
        .client
        .get(app.url("/revenue?limit=2"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");

    // The two newest buckets survive the cap, still ascending
    let data = report["data"].as_array().expect("data array");
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["period"], "2025-06-02");
    assert_eq!(data[1]["period"], "2025-06-03");

    app.cleanup().await;
}

#[tokio::test]
async fn empty_store_yields_empty_report() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let report: Value = app
        .client
        .get(app.url("/revenue"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");

    assert_eq!(report["total"].as_i64(), Some(0));
    assert_eq!(report["data"].as_array().map(Vec::len), Some(0));

    app.cleanup().await;
}
