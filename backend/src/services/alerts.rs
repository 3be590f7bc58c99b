//! Alert maintenance for the stock status engine
//!
//! Alerts are a side-channel of the derived product status: every product
//! mutation and the daily sweep call `evaluate_product`, which replaces the
//! non-expired alerts with the currently-due set inside one database
//! transaction (no reader ever observes the zero-alert window) and upserts
//! the terminal expired alert so it is never duplicated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::models::{
    classify, days_to_expiry, expired_message, is_low_stock, is_near_expiry, low_stock_message,
    near_expiry_message, AlertType, Product, StockStatus,
};

use crate::error::{AppError, AppResult};
use crate::events::{DomainEvent, EventBroadcaster, ProductProjection};
use crate::services::products::ProductService;

/// Alert service
#[derive(Clone)]
pub struct AlertService {
    db: PgPool,
    events: EventBroadcaster,
}

/// Alert as exposed to clients, with a read-only product projection
#[derive(Debug, Clone, Serialize)]
pub struct AlertWithProduct {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub product: ProductProjection,
}

/// Query parameters for alert listing
#[derive(Debug, Default, Deserialize)]
pub struct ListAlertsQuery {
    pub unread_only: Option<bool>,
}

/// Outcome of a full-catalogue sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub evaluated: usize,
    pub failed: usize,
}

fn projection(product: &Product) -> ProductProjection {
    ProductProjection {
        id: product.id,
        name: product.name.clone(),
        category: product.category,
        stock: product.stock,
        min_stock: product.min_stock,
        expiry_date: product.expiry_date,
    }
}

impl AlertService {
    /// Create a new AlertService instance
    pub fn new(db: PgPool, events: EventBroadcaster) -> Self {
        Self { db, events }
    }

    /// Re-evaluate a product's alerts from scratch.
    ///
    /// Low stock is tracked independently of freshness (an expired product
    /// below minimum carries both alerts). Repeated evaluation with
    /// unchanged product data is idempotent: at most one active alert per
    /// type, exactly one expired alert ever.
    pub async fn evaluate_product(&self, product: &Product) -> AppResult<()> {
        let now = Utc::now();
        let expired = classify(product.stock, product.min_stock, product.expiry_date, now)
            == StockStatus::Expired;

        let mut created: Vec<(Uuid, AlertType, String)> = Vec::new();

        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM alerts WHERE product_id = $1 AND alert_type <> 'expired'")
            .bind(product.id)
            .execute(&mut *tx)
            .await?;

        if is_low_stock(product.stock, product.min_stock) {
            let message = low_stock_message(&product.name, product.stock, product.min_stock);
            let id = sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO alerts (product_id, alert_type, message) \
                 VALUES ($1, 'low_stock', $2) RETURNING id",
            )
            .bind(product.id)
            .bind(&message)
            .fetch_one(&mut *tx)
            .await?;
            created.push((id, AlertType::LowStock, message));
        }

        if expired {
            let message = expired_message(&product.name, product.expiry_date);
            let id = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO alerts (product_id, alert_type, message)
                VALUES ($1, 'expired', $2)
                ON CONFLICT (product_id, alert_type)
                DO UPDATE SET message = EXCLUDED.message
                RETURNING id
                "#,
            )
            .bind(product.id)
            .bind(&message)
            .fetch_one(&mut *tx)
            .await?;
            created.push((id, AlertType::Expired, message));
        } else if is_near_expiry(product.expiry_date, now) {
            let days = days_to_expiry(product.expiry_date, now);
            let message = near_expiry_message(&product.name, days);
            let id = sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO alerts (product_id, alert_type, message) \
                 VALUES ($1, 'near_expiry', $2) RETURNING id",
            )
            .bind(product.id)
            .bind(&message)
            .fetch_one(&mut *tx)
            .await?;
            created.push((id, AlertType::NearExpiry, message));
        }

        tx.commit().await?;

        for (alert_id, alert_type, message) in created {
            self.events.publish(DomainEvent::AlertNew {
                alert_id,
                alert_type,
                message,
                product: projection(product),
            });
        }

        Ok(())
    }

    /// Evaluate every product in the catalogue.
    ///
    /// One product's failure is logged and skipped so the rest of the sweep
    /// still runs.
    pub async fn sweep_all(&self) -> AppResult<SweepSummary> {
        let products = ProductService::new(self.db.clone(), self.events.clone())
            .all_products()
            .await?;

        let mut evaluated = 0;
        let mut failed = 0;

        for product in &products {
            match self.evaluate_product(product).await {
                Ok(()) => evaluated += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        "Alert sweep failed for product {} ({}): {}",
                        product.id,
                        product.name,
                        e
                    );
                }
            }
        }

        tracing::info!(
            "Alert sweep complete: {} evaluated, {} failed",
            evaluated,
            failed
        );

        Ok(SweepSummary { evaluated, failed })
    }

    /// List alerts, newest first
    pub async fn list_alerts(&self, query: ListAlertsQuery) -> AppResult<Vec<AlertWithProduct>> {
        let unread_only = query.unread_only.unwrap_or(false);

        let rows = sqlx::query_as::<_, AlertJoinRow>(
            r#"
            SELECT a.id, a.product_id, a.alert_type, a.message, a.is_read, a.created_at,
                   p.name, p.category, p.stock, p.min_stock, p.expiry_date
            FROM alerts a
            JOIN products p ON p.id = a.product_id
            WHERE ($1 = false OR a.is_read = false)
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(unread_only)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(|r| r.into_alert()).collect()
    }

    /// Mark a single alert as read
    pub async fn mark_read(&self, alert_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("UPDATE alerts SET is_read = true WHERE id = $1")
            .bind(alert_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Alert".to_string()));
        }

        Ok(())
    }

    /// Mark every alert as read
    pub async fn mark_all_read(&self) -> AppResult<u64> {
        let result = sqlx::query("UPDATE alerts SET is_read = true WHERE is_read = false")
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete an alert
    pub async fn delete_alert(&self, alert_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM alerts WHERE id = $1")
            .bind(alert_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Alert".to_string()));
        }

        Ok(())
    }
}

/// Joined alert + product row for listing
#[derive(Debug, FromRow)]
struct AlertJoinRow {
    id: Uuid,
    product_id: Uuid,
    alert_type: String,
    message: String,
    is_read: bool,
    created_at: DateTime<Utc>,
    name: String,
    category: String,
    stock: i32,
    min_stock: i32,
    expiry_date: DateTime<Utc>,
}

impl AlertJoinRow {
    fn into_alert(self) -> AppResult<AlertWithProduct> {
        let alert_type = AlertType::parse(&self.alert_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown alert type in database: {}", self.alert_type))
        })?;
        let category = shared::models::ProductCategory::parse(&self.category).ok_or_else(|| {
            AppError::Internal(format!("Unknown category in database: {}", self.category))
        })?;
        Ok(AlertWithProduct {
            id: self.id,
            alert_type,
            message: self.message,
            is_read: self.is_read,
            created_at: self.created_at,
            product: ProductProjection {
                id: self.product_id,
                name: self.name,
                category,
                stock: self.stock,
                min_stock: self.min_stock,
                expiry_date: self.expiry_date,
            },
        })
    }
}
