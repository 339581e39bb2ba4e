//! Test helper module for invoicing-service integration tests.
//!
//! Provides common setup utilities for PostgreSQL-based tests. Each TestApp
//! gets its own schema so suites can run in parallel against one database.

#![allow(dead_code)]

use invoicing_service::config::{DatabaseConfig, InvoicingConfig};
use invoicing_service::services::Database;
use invoicing_service::startup::Application;
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Once;

static INIT: Once = Once::new();

// Counter for unique schema names
static SCHEMA_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Initialize tracing for tests (only once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("warn,invoicing_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Generate a unique schema name for test isolation.
fn unique_schema_name() -> String {
    let counter = SCHEMA_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("test_invoicing_{}_{}", std::process::id(), counter)
}

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: Database,
    pub client: reqwest::Client,
    base_url: String,
    schema_name: String,
}

impl TestApp {
    /// Spawn a new test application on a random port, or None when
    /// TEST_DATABASE_URL is unset so suites skip cleanly without Postgres.
    pub async fn try_spawn() -> Option<Self> {
        let base_url = std::env::var("TEST_DATABASE_URL").ok()?;
        init_tracing();
        let schema_name = unique_schema_name();

        // Create schema for test isolation
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&base_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema_name))
            .execute(&pool)
            .await
            .ok();
        sqlx::query(&format!("CREATE SCHEMA {}", schema_name))
            .execute(&pool)
            .await
            .expect("Failed to create test schema");

        pool.close().await;

        // Use ? or & depending on whether the URL already has query parameters
        let separator = if base_url.contains('?') { "&" } else { "?" };
        let db_url_with_schema = format!(
            "{}{}options=-c search_path%3D{}",
            base_url, separator, schema_name
        );

        let config = InvoicingConfig {
            common: CoreConfig { port: 0 }, // Random port
            service_name: "invoicing-service-test".to_string(),
            log_level: "warn".to_string(),
            database: DatabaseConfig {
                url: db_url_with_schema.clone(),
                max_connections: 5,
                min_connections: 1,
            },
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let db = Database::new(&db_url_with_schema, 5, 1)
            .await
            .expect("Failed to create test database handle");

        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        Some(TestApp {
            address,
            port,
            db,
            client,
            base_url,
            schema_name,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Insert a product directly and return its id.
    pub async fn seed_product(&self, name: &str, price: &str, stock: i32) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO products (name, price, stock) VALUES ($1, $2::numeric, $3) RETURNING id",
        )
        .bind(name)
        .bind(price)
        .bind(stock)
        .fetch_one(self.db.pool())
        .await
        .expect("Failed to seed product")
    }

    /// Read a product's stock directly.
    pub async fn product_stock(&self, id: i64) -> i32 {
        sqlx::query_scalar::<_, i32>("SELECT stock FROM products WHERE id = $1")
            .bind(id)
            .fetch_one(self.db.pool())
            .await
            .expect("Failed to read product stock")
    }

    /// Count all invoice rows.
    pub async fn invoice_count(&self) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices")
            .fetch_one(self.db.pool())
            .await
            .expect("Failed to count invoices")
    }

    /// Count the item rows belonging to an invoice.
    pub async fn item_count(&self, invoice_id: i64) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM invoice_items WHERE invoice_id = $1",
        )
        .bind(invoice_id)
        .fetch_one(self.db.pool())
        .await
        .expect("Failed to count invoice items")
    }

    /// Cleanup test resources (schema).
    pub async fn cleanup(&self) {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.base_url)
            .await
            .ok();

        if let Some(pool) = pool {
            let _ = sqlx::query(&format!(
                "DROP SCHEMA IF EXISTS {} CASCADE",
                self.schema_name
            ))
            .execute(&pool)
            .await;
            pool.close().await;
        }
    }
}

/// A valid create payload with the given code; tests tweak it from here.
pub fn minimal_invoice(code: &str) -> Value {
    json!({
        "code": code,
        "date": "2025-06-01",
        "customerName": "Acme Corp",
        "salesperson": "Jo March",
        "status": "pending",
        "items": [
            {"name": "Widget", "quantity": 2, "unitPrice": 10.0}
        ]
    })
}
