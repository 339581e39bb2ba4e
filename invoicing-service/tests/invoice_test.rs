//! Integration tests for invoice CRUD against a real PostgreSQL instance.
//!
//! Suites skip cleanly when TEST_DATABASE_URL is unset.

mod common;

use common::{minimal_invoice, TestApp};
use serde_json::{json, Value};

#[tokio::test]
async fn create_invoice_computes_total_from_items() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let mut payload = minimal_invoice("INV-001");
    payload["items"] = json!([
        {"name": "Widget", "quantity": 3, "unitPrice": 1000.0},
        {"name": "Gadget", "quantity": 2, "unitPrice": 250.0}
    ]);

    let response = app
        .client
        .post(app.url("/invoices"))
        .json(&payload)
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("invalid json");
    assert_eq!(body["total"].as_f64(), Some(3500.0));
    assert_eq!(body["code"], "INV-001");
    assert_eq!(body["payment_terms"].as_i64(), Some(30));
    assert_eq!(body["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["items"][0]["line_total"].as_f64(), Some(3000.0));

    app.cleanup().await;
}

#[tokio::test]
async fn create_resolves_product_name_and_decrements_stock() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let product_id = app.seed_product("Anvil", "45.50", 10).await;

    let mut payload = minimal_invoice("INV-002");
    payload["items"] = json!([
        {"productId": product_id, "quantity": 4, "unitPrice": 45.5}
    ]);

    let response = app
        .client
        .post(app.url("/invoices"))
        .json(&payload)
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("invalid json");
    assert_eq!(body["items"][0]["name"], "Anvil");
    assert_eq!(app.product_stock(product_id).await, 6);

    app.cleanup().await;
}

#[tokio::test]
async fn stock_never_goes_negative() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let product_id = app.seed_product("Rare Part", "99.99", 2).await;

    let mut payload = minimal_invoice("INV-003");
    payload["items"] = json!([
        {"productId": product_id, "name": "Rare Part", "quantity": 5, "unitPrice": 99.99}
    ]);

    let response = app
        .client
        .post(app.url("/invoices"))
        .json(&payload)
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 201);
    assert_eq!(app.product_stock(product_id).await, 0);

    app.cleanup().await;
}

#[tokio::test]
async fn dangling_product_reference_leaves_name_null() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let mut payload = minimal_invoice("INV-004");
    payload["items"] = json!([
        {"productId": 999999, "quantity": 1, "unitPrice": 5.0}
    ]);

    let response = app
        .client
        .post(app.url("/invoices"))
        .json(&payload)
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("invalid json");
    assert!(body["items"][0]["name"].is_null());

    app.cleanup().await;
}

#[tokio::test]
async fn missing_required_fields_are_listed() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let response = app
        .client
        .post(app.url("/invoices"))
        .json(&json!({"code": "INV-005", "date": "2025-06-01"}))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("invalid json");
    assert_eq!(body["error"], "missing_fields");
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .expect("fields array")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(fields, vec!["customerName", "salesperson", "status", "items"]);

    app.cleanup().await;
}

#[tokio::test]
async fn get_invoice_validates_id_and_reports_not_found() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let response = app
        .client
        .get(app.url("/invoices/abc"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("invalid json");
    assert_eq!(body["error"], "invalid_id");

    let response = app
        .client
        .get(app.url("/invoices/999999"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.expect("invalid json");
    assert_eq!(body["error"], "not_found");

    app.cleanup().await;
}

#[tokio::test]
async fn status_only_patch_leaves_items_and_total_untouched() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let created: Value = app
        .client
        .post(app.url("/invoices"))
        .json(&minimal_invoice("INV-006"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");
    let id = created["id"].as_i64().expect("invoice id");

    let response = app
        .client
        .patch(app.url(&format!("/invoices/{}", id)))
        .json(&json!({"status": "paid"}))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("invalid json");
    assert_eq!(body["status"], "paid");
    assert_eq!(body["total"], created["total"]);
    assert_eq!(body["items"], created["items"]);
    assert_eq!(body["customer_name"], created["customer_name"]);

    app.cleanup().await;
}

#[tokio::test]
async fn item_patch_replaces_items_and_recomputes_total() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let created: Value = app
        .client
        .post(app.url("/invoices"))
        .json(&minimal_invoice("INV-007"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");
    let id = created["id"].as_i64().expect("invoice id");

    // The blank-name entry is discarded, not stored
    let response = app
        .client
        .patch(app.url(&format!("/invoices/{}", id)))
        .json(&json!({"items": [
            {"name": "Replacement", "quantity": 4, "unitPrice": 25.0},
            {"name": "  ", "quantity": 9, "unitPrice": 100.0}
        ]}))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("invalid json");
    assert_eq!(body["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["items"][0]["name"], "Replacement");
    assert_eq!(body["total"].as_f64(), Some(100.0));
    assert_eq!(app.item_count(id).await, 1);

    app.cleanup().await;
}

#[tokio::test]
async fn empty_patch_is_rejected_before_touching_the_store() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let created: Value = app
        .client
        .post(app.url("/invoices"))
        .json(&minimal_invoice("INV-008"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");
    let id = created["id"].as_i64().expect("invoice id");

    let response = app
        .client
        .patch(app.url(&format!("/invoices/{}", id)))
        .json(&json!({}))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("invalid json");
    assert_eq!(body["error"], "no_fields_to_update");

    app.cleanup().await;
}

#[tokio::test]
async fn patch_unknown_invoice_returns_not_found() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let response = app
        .client
        .patch(app.url("/invoices/424242"))
        .json(&json!({"status": "paid"}))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn delete_returns_confirmation_and_removes_items() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let created: Value = app
        .client
        .post(app.url("/invoices"))
        .json(&minimal_invoice("INV-009"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");
    let id = created["id"].as_i64().expect("invoice id");

    // A bystander invoice that must survive everything below
    app.client
        .post(app.url("/invoices"))
        .json(&minimal_invoice("INV-009B"))
        .send()
        .await
        .expect("request failed");

    let response = app
        .client
        .delete(app.url(&format!("/invoices/{}", id)))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("invalid json");
    assert_eq!(body["deleted"], true);
    assert_eq!(body["invoice"]["id"].as_i64(), Some(id));
    assert_eq!(body["invoice"]["code"], "INV-009");
    assert_eq!(app.item_count(id).await, 0);
    assert_eq!(app.invoice_count().await, 1);

    // Second delete finds nothing and leaves the store unchanged
    let response = app
        .client
        .delete(app.url(&format!("/invoices/{}", id)))
        .send()
        .await
        .expect("request failed");
    assert_eq!(response.status(), 404);
    assert_eq!(app.invoice_count().await, 1);

    app.cleanup().await;
}

#[tokio::test]
async fn nested_client_address_is_stored_flat() {
    let Some(app) = TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let mut payload = minimal_invoice("INV-010");
    payload["clientAddress"] = json!({
        "street": "1 Main St",
        "city": "Springfield",
        "postCode": "12345",
        "country": "US"
    });

    let response = app
        .client
        .post(app.url("/invoices"))
        .json(&payload)
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("invalid json");
    assert_eq!(body["client_street"], "1 Main St");
    assert_eq!(body["client_city"], "Springfield");
    assert_eq!(body["client_post_code"], "12345");
    assert_eq!(body["client_country"], "US");

    app.cleanup().await;
}
