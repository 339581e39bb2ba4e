//! Database service for invoicing-service.
//!
//! All writes run inside a single explicit transaction; readers never observe
//! partial state. There is no optimistic version check on invoices, so
//! concurrent edits to the same row are last-writer-wins.

use crate::models::{
    chronological, CreateInvoice, DeletedInvoice, Invoice, InvoiceItem, InvoiceStatus,
    InvoiceWithItems, Product, ProductPage, RevenueBucket, RevenuePoint, RevenueRow, UpdateInvoice,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::time::Duration;
use tracing::{info, instrument};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "invoicing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Product Operations
    // -------------------------------------------------------------------------

    /// List products matching an optional name query, offset-paginated.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: Option<&str>,
        limit: i64,
        page: i64,
    ) -> Result<ProductPage, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM products
            WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')
            "#,
        )
        .bind(query)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count products: {}", e)))?;

        let offset = (page - 1) * limit;
        let items = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price, stock, image_url
            FROM products
            WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')
            ORDER BY name ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(query)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list products: {}", e)))?;

        let total_pages = std::cmp::max(1, (count + limit - 1) / limit);

        Ok(ProductPage {
            items,
            page,
            total_pages,
        })
    }

    // -------------------------------------------------------------------------
    // Invoice Read Operations
    // -------------------------------------------------------------------------

    /// List invoices after the cursor, ordered by id ascending, with items
    /// attached. Fetches one extra row to detect continuation; the second
    /// element of the result is the next cursor, None when exhausted.
    #[instrument(skip(self))]
    pub async fn list_invoices(
        &self,
        cursor: Option<i64>,
        limit: i64,
    ) -> Result<(Vec<InvoiceWithItems>, Option<i64>), AppError> {
        let fetch = limit + 1;

        let mut rows = if let Some(cursor) = cursor {
            sqlx::query_as::<_, Invoice>(
                r#"
                SELECT id, code, date, payment_terms, customer_name, client_email,
                    client_street, client_city, client_post_code, client_country,
                    sender_street, sender_city, sender_post_code, sender_country,
                    salesperson, status, notes, description, total
                FROM invoices
                WHERE id > $1
                ORDER BY id ASC
                LIMIT $2
                "#,
            )
            .bind(cursor)
            .bind(fetch)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, Invoice>(
                r#"
                SELECT id, code, date, payment_terms, customer_name, client_email,
                    client_street, client_city, client_post_code, client_country,
                    sender_street, sender_city, sender_post_code, sender_country,
                    salesperson, status, notes, description, total
                FROM invoices
                ORDER BY id ASC
                LIMIT $1
                "#,
            )
            .bind(fetch)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        let has_more = rows.len() as i64 > limit;
        if has_more {
            rows.truncate(limit as usize);
        }
        let next_cursor = if has_more {
            rows.last().map(|inv| inv.id)
        } else {
            None
        };

        let mut invoices = Vec::with_capacity(rows.len());
        for invoice in rows {
            let items = self.get_invoice_items(invoice.id).await?;
            invoices.push(InvoiceWithItems { invoice, items });
        }

        Ok((invoices, next_cursor))
    }

    /// Get an invoice by id with its items, ordered by item id ascending.
    #[instrument(skip(self))]
    pub async fn get_invoice(&self, id: i64) -> Result<Option<InvoiceWithItems>, AppError> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, code, date, payment_terms, customer_name, client_email,
                client_street, client_city, client_post_code, client_country,
                sender_street, sender_city, sender_post_code, sender_country,
                salesperson, status, notes, description, total
            FROM invoices
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        match invoice {
            Some(invoice) => {
                let items = self.get_invoice_items(invoice.id).await?;
                Ok(Some(InvoiceWithItems { invoice, items }))
            }
            None => Ok(None),
        }
    }

    /// Get the line items for an invoice, ordered by item id ascending.
    #[instrument(skip(self))]
    pub async fn get_invoice_items(&self, invoice_id: i64) -> Result<Vec<InvoiceItem>, AppError> {
        sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT id, product_id, name, quantity, unit_price, line_total
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice items: {}", e)))
    }

    // -------------------------------------------------------------------------
    // Invoice Write Operations
    // -------------------------------------------------------------------------

    /// Create an invoice with its items atomically.
    ///
    /// Resolves missing item names from the referenced product (a dangling
    /// product id leaves the name NULL), recomputes every line total, and
    /// decrements referenced product stock clamped at zero. Any failure rolls
    /// the whole transaction back.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_invoice(
        &self,
        input: &CreateInvoice,
    ) -> Result<InvoiceWithItems, AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let total = input.total();

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                code, date, payment_terms, customer_name, client_email,
                client_street, client_city, client_post_code, client_country,
                sender_street, sender_city, sender_post_code, sender_country,
                salesperson, status, notes, description, total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING id, code, date, payment_terms, customer_name, client_email,
                client_street, client_city, client_post_code, client_country,
                sender_street, sender_city, sender_post_code, sender_country,
                salesperson, status, notes, description, total
            "#,
        )
        .bind(&input.code)
        .bind(input.date)
        .bind(input.payment_terms)
        .bind(&input.customer_name)
        .bind(&input.client_email)
        .bind(&input.client_street)
        .bind(&input.client_city)
        .bind(&input.client_post_code)
        .bind(&input.client_country)
        .bind(&input.sender_street)
        .bind(&input.sender_city)
        .bind(&input.sender_post_code)
        .bind(&input.sender_country)
        .bind(&input.salesperson)
        .bind(&input.status)
        .bind(&input.notes)
        .bind(&input.description)
        .bind(total)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e)))?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let mut name = item.name.clone();
            if name.is_none() {
                if let Some(product_id) = item.product_id {
                    // A dangling product reference leaves the name NULL.
                    name = sqlx::query_scalar::<_, String>(
                        "SELECT name FROM products WHERE id = $1",
                    )
                    .bind(product_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| {
                        AppError::DatabaseError(anyhow::anyhow!(
                            "Failed to resolve product name: {}",
                            e
                        ))
                    })?;
                }
            }

            let inserted = sqlx::query_as::<_, InvoiceItem>(
                r#"
                INSERT INTO invoice_items (invoice_id, product_id, name, quantity, unit_price, line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, product_id, name, quantity, unit_price, line_total
                "#,
            )
            .bind(invoice.id)
            .bind(item.product_id)
            .bind(&name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.line_total())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert invoice item: {}", e))
            })?;
            items.push(inserted);

            // Stock never goes negative; rides the same transaction as the
            // item insert so the two cannot diverge.
            if let Some(product_id) = item.product_id {
                sqlx::query("UPDATE products SET stock = GREATEST(0, stock - $1) WHERE id = $2")
                    .bind(item.quantity)
                    .bind(product_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        AppError::DatabaseError(anyhow::anyhow!(
                            "Failed to decrement product stock: {}",
                            e
                        ))
                    })?;
            }
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        info!(invoice_id = invoice.id, total = %invoice.total, "Invoice created");

        Ok(InvoiceWithItems { invoice, items })
    }

    /// Apply a sparse patch to an invoice.
    ///
    /// Two phases inside one transaction: a scalar field patch that only
    /// assigns fields present in the input, then, when an item list is
    /// supplied, full replacement of the item set with the invoice total
    /// recomputed as the sum of the new line totals. Returns None when the
    /// invoice does not exist; nothing is modified in that case.
    #[instrument(skip(self, input))]
    pub async fn update_invoice(
        &self,
        id: i64,
        input: &UpdateInvoice,
    ) -> Result<Option<InvoiceWithItems>, AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice = if input.has_scalar_fields() {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE invoices SET ");
            {
                let mut assignments = builder.separated(", ");
                if let Some(v) = &input.customer_name {
                    assignments.push("customer_name = ").push_bind_unseparated(v);
                }
                if let Some(v) = &input.client_email {
                    assignments.push("client_email = ").push_bind_unseparated(v);
                }
                if let Some(v) = &input.salesperson {
                    assignments.push("salesperson = ").push_bind_unseparated(v);
                }
                if let Some(v) = &input.notes {
                    assignments.push("notes = ").push_bind_unseparated(v);
                }
                if let Some(v) = &input.description {
                    assignments.push("description = ").push_bind_unseparated(v);
                }
                if let Some(v) = &input.status {
                    assignments.push("status = ").push_bind_unseparated(v);
                }
                if let Some(v) = input.payment_terms {
                    assignments.push("payment_terms = ").push_bind_unseparated(v);
                }
                if let Some(v) = input.date {
                    assignments.push("date = ").push_bind_unseparated(v);
                }
                if let Some(v) = &input.client_street {
                    assignments.push("client_street = ").push_bind_unseparated(v);
                }
                if let Some(v) = &input.client_city {
                    assignments.push("client_city = ").push_bind_unseparated(v);
                }
                if let Some(v) = &input.client_post_code {
                    assignments
                        .push("client_post_code = ")
                        .push_bind_unseparated(v);
                }
                if let Some(v) = &input.client_country {
                    assignments.push("client_country = ").push_bind_unseparated(v);
                }
                if let Some(v) = &input.sender_street {
                    assignments.push("sender_street = ").push_bind_unseparated(v);
                }
                if let Some(v) = &input.sender_city {
                    assignments.push("sender_city = ").push_bind_unseparated(v);
                }
                if let Some(v) = &input.sender_post_code {
                    assignments
                        .push("sender_post_code = ")
                        .push_bind_unseparated(v);
                }
                if let Some(v) = &input.sender_country {
                    assignments.push("sender_country = ").push_bind_unseparated(v);
                }
            }
            builder.push(" WHERE id = ");
            builder.push_bind(id);
            builder.push(
                r#" RETURNING id, code, date, payment_terms, customer_name, client_email,
                    client_street, client_city, client_post_code, client_country,
                    sender_street, sender_city, sender_post_code, sender_country,
                    salesperson, status, notes, description, total"#,
            );

            builder
                .build_query_as::<Invoice>()
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e))
                })?
        } else {
            // Items-only patch still needs the header row to exist.
            sqlx::query_as::<_, Invoice>(
                r#"
                SELECT id, code, date, payment_terms, customer_name, client_email,
                    client_street, client_city, client_post_code, client_country,
                    sender_street, sender_city, sender_post_code, sender_country,
                    salesperson, status, notes, description, total
                FROM invoices
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e))
            })?
        };

        let Some(mut invoice) = invoice else {
            tx.rollback().await.ok();
            return Ok(None);
        };

        if let Some(items) = &input.items {
            sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!(
                        "Failed to delete invoice items: {}",
                        e
                    ))
                })?;

            let mut total = Decimal::ZERO;
            for item in items {
                if item.has_blank_name() {
                    continue;
                }
                let line_total = item.line_total();
                total += line_total;

                sqlx::query(
                    r#"
                    INSERT INTO invoice_items (invoice_id, product_id, name, quantity, unit_price, line_total)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(id)
                .bind(item.product_id)
                .bind(&item.name)
                .bind(item.quantity)
                .bind(item.unit_price)
                .bind(line_total)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!(
                        "Failed to insert invoice item: {}",
                        e
                    ))
                })?;
            }

            invoice = sqlx::query_as::<_, Invoice>(
                r#"
                UPDATE invoices SET total = $2
                WHERE id = $1
                RETURNING id, code, date, payment_terms, customer_name, client_email,
                    client_street, client_city, client_post_code, client_country,
                    sender_street, sender_city, sender_post_code, sender_country,
                    salesperson, status, notes, description, total
                "#,
            )
            .bind(id)
            .bind(total)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice total: {}", e))
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        info!(invoice_id = invoice.id, "Invoice updated");

        let items = self.get_invoice_items(invoice.id).await?;
        Ok(Some(InvoiceWithItems { invoice, items }))
    }

    /// Delete an invoice and its items atomically. Returns the identity
    /// fields of the deleted invoice, or None when the id did not exist.
    #[instrument(skip(self))]
    pub async fn delete_invoice(&self, id: i64) -> Result<Option<DeletedInvoice>, AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete invoice items: {}", e))
            })?;

        let deleted = sqlx::query_as::<_, DeletedInvoice>(
            "DELETE FROM invoices WHERE id = $1 RETURNING id, code, date",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete invoice: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        if let Some(ref deleted) = deleted {
            info!(invoice_id = deleted.id, code = %deleted.code, "Invoice deleted");
        }

        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Revenue Aggregation
    // -------------------------------------------------------------------------

    /// Aggregate paid-invoice revenue per bucket. The query keeps the newest
    /// `limit` periods; the returned points are in chronological order.
    #[instrument(skip(self))]
    pub async fn revenue(
        &self,
        bucket: RevenueBucket,
        limit: i64,
    ) -> Result<Vec<RevenuePoint>, AppError> {
        let rows = sqlx::query_as::<_, RevenueRow>(
            r#"
            SELECT DATE_TRUNC($1, date)::date AS period,
                SUM(total) AS revenue,
                COUNT(*) AS invoice_count,
                AVG(total) AS avg_invoice_value
            FROM invoices
            WHERE status = $2
            GROUP BY DATE_TRUNC($1, date)
            ORDER BY period DESC
            LIMIT $3
            "#,
        )
        .bind(bucket.trunc_unit())
        .bind(InvoiceStatus::Paid.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to aggregate revenue: {}", e))
        })?;

        Ok(chronological(rows))
    }
}
