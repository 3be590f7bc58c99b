//! Stock ledger service
//!
//! Stock is only ever mutated through `record_transaction`. The OUT path is
//! a single conditional update (`stock = stock - qty WHERE stock >= qty`) so
//! concurrent withdrawals cannot race the sufficiency check past zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::events::{DomainEvent, EventBroadcaster};
use crate::services::alerts::AlertService;
use crate::services::products::ProductRow;

/// Stock ledger service
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
    events: EventBroadcaster,
}

/// Stock transaction types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StockTransactionType {
    In,
    Out,
}

impl StockTransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockTransactionType::In => "IN",
            StockTransactionType::Out => "OUT",
        }
    }
}

/// Reason a stock transaction was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionReason {
    Purchase,
    Sale,
    Wastage,
    Adjustment,
}

impl TransactionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionReason::Purchase => "purchase",
            TransactionReason::Sale => "sale",
            TransactionReason::Wastage => "wastage",
            TransactionReason::Adjustment => "adjustment",
        }
    }
}

/// Stock ledger entry (immutable once created)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockTransaction {
    pub id: Uuid,
    pub transaction_id: String,
    pub product_id: Uuid,
    pub transaction_type: String,
    pub quantity: i32,
    pub reason: String,
    pub note: Option<String>,
    pub batch_number: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a stock transaction
#[derive(Debug, Deserialize)]
pub struct RecordTransactionInput {
    pub product_id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: StockTransactionType,
    pub quantity: i32,
    pub reason: TransactionReason,
    pub note: Option<String>,
    pub batch_number: Option<String>,
}

/// Generate a stock transaction id (e.g. "TXN-9F2C41D0A6B34E")
fn generate_stock_transaction_id() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("TXN-{}", &hex[..14])
}

const TRANSACTION_COLUMNS: &str = "id, transaction_id, product_id, transaction_type, quantity, \
     reason, note, batch_number, created_by, created_at";

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool, events: EventBroadcaster) -> Self {
        Self { db, events }
    }

    /// Record a stock transaction and apply it to the product.
    ///
    /// An OUT transaction that would drive stock negative is rejected with
    /// no state change.
    pub async fn record_transaction(
        &self,
        user_id: Uuid,
        input: RecordTransactionInput,
    ) -> AppResult<StockTransaction> {
        if input.quantity <= 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity must be positive".to_string(),
            });
        }

        let product_row = match input.transaction_type {
            StockTransactionType::In => {
                sqlx::query_as::<_, ProductRow>(
                    r#"
                    UPDATE products
                    SET stock = stock + $1, updated_at = NOW()
                    WHERE id = $2
                    RETURNING id, name, category, pack_weight, price, stock, min_stock,
                              batch_no, expiry_date, image_url, created_at, updated_at
                    "#,
                )
                .bind(input.quantity)
                .bind(input.product_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Product".to_string()))?
            }
            StockTransactionType::Out => {
                // The sufficiency check lives in the WHERE clause; there is
                // no window between check and decrement.
                let updated = sqlx::query_as::<_, ProductRow>(
                    r#"
                    UPDATE products
                    SET stock = stock - $1, updated_at = NOW()
                    WHERE id = $2 AND stock >= $1
                    RETURNING id, name, category, pack_weight, price, stock, min_stock,
                              batch_no, expiry_date, image_url, created_at, updated_at
                    "#,
                )
                .bind(input.quantity)
                .bind(input.product_id)
                .fetch_optional(&self.db)
                .await?;

                match updated {
                    Some(row) => row,
                    None => {
                        let stock = sqlx::query_scalar::<_, i32>(
                            "SELECT stock FROM products WHERE id = $1",
                        )
                        .bind(input.product_id)
                        .fetch_optional(&self.db)
                        .await?
                        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

                        return Err(AppError::InsufficientStock(format!(
                            "Only {} in stock, requested {}",
                            stock, input.quantity
                        )));
                    }
                }
            }
        };

        let transaction = sqlx::query_as::<_, StockTransaction>(&format!(
            r#"
            INSERT INTO stock_transactions (transaction_id, product_id, transaction_type,
                                            quantity, reason, note, batch_number, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(generate_stock_transaction_id())
        .bind(input.product_id)
        .bind(input.transaction_type.as_str())
        .bind(input.quantity)
        .bind(input.reason.as_str())
        .bind(&input.note)
        .bind(&input.batch_number)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let product = product_row.into_product()?;

        AlertService::new(self.db.clone(), self.events.clone())
            .evaluate_product(&product)
            .await?;

        self.events.publish(DomainEvent::TransactionCreated {
            transaction_id: transaction.transaction_id.clone(),
            product_id: product.id,
            new_stock: product.stock,
        });

        Ok(transaction)
    }

    /// Get transactions for a product, newest first
    pub async fn get_transactions(&self, product_id: Uuid) -> AppResult<Vec<StockTransaction>> {
        let product_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(product_id)
                .fetch_one(&self.db)
                .await?;

        if !product_exists {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let transactions = sqlx::query_as::<_, StockTransaction>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM stock_transactions
            WHERE product_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(transactions)
    }

    /// List the full ledger, newest first
    pub async fn list_transactions(&self) -> AppResult<Vec<StockTransaction>> {
        let transactions = sqlx::query_as::<_, StockTransaction>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM stock_transactions
            ORDER BY created_at DESC
            "#
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_ids_are_prefixed_and_distinct() {
        let a = generate_stock_transaction_id();
        let b = generate_stock_transaction_id();
        assert!(a.starts_with("TXN-"));
        assert_ne!(a, b);
    }

    #[test]
    fn transaction_type_wire_format() {
        assert_eq!(
            serde_json::to_string(&StockTransactionType::In).unwrap(),
            "\"IN\""
        );
        assert_eq!(
            serde_json::to_string(&StockTransactionType::Out).unwrap(),
            "\"OUT\""
        );
    }
}
