//! Supplier payment collection and QR confirmation service
//!
//! A collector registers a weighed delivery, the platform mints a
//! short-lived signed proof of the transaction, and the matching supplier
//! redeems it exactly once inside the validity window. The signed token
//! never leaves the server; the QR payload is a confirm URL carrying only
//! the bare transaction id.

use chrono::{DateTime, NaiveDate, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::models::{
    check_confirmation, compute_total, generate_transaction_id, ConfirmationError, PaymentStatus,
    Role, SupplierPayment,
};
use shared::validation::validate_collection_amount;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::events::{DomainEvent, EventBroadcaster};
use crate::external::{NotifierClient, ReceiptClient};

/// How long a minted QR proof stays valid
pub const QR_TOKEN_VALIDITY_SECS: i64 = 120;

/// Payment collection service
#[derive(Clone)]
pub struct PaymentService {
    db: PgPool,
    events: EventBroadcaster,
    jwt_secret: String,
    public_url: String,
    notifier: NotifierClient,
    receipts: ReceiptClient,
}

/// Claims embedded in the QR proof token
#[derive(Debug, Serialize, Deserialize)]
struct QrClaims {
    /// Transaction id
    txn: String,
    /// Supplier id
    sub: String,
    exp: i64,
    iat: i64,
}

/// Payment row as stored (includes the server-side token)
#[derive(Debug, Clone, FromRow)]
struct PaymentRow {
    transaction_id: String,
    supplier_id: Uuid,
    collector_id: Uuid,
    weight_kg: Decimal,
    rate: Decimal,
    total: Decimal,
    status: String,
    qr_token: Option<String>,
    qr_expires_at: Option<DateTime<Utc>>,
    date: NaiveDate,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl PaymentRow {
    fn status(&self) -> AppResult<PaymentStatus> {
        PaymentStatus::parse(&self.status).ok_or_else(|| {
            AppError::Internal(format!("Unknown payment status in database: {}", self.status))
        })
    }

    /// Client-facing model; the signed token is deliberately dropped here.
    fn into_payment(self) -> AppResult<SupplierPayment> {
        let status = self.status()?;
        Ok(SupplierPayment {
            transaction_id: self.transaction_id,
            supplier_id: self.supplier_id,
            collector_id: self.collector_id,
            weight_kg: self.weight_kg,
            rate: self.rate,
            total: self.total,
            status,
            qr_expires_at: self.qr_expires_at,
            date: self.date,
            paid_at: self.paid_at,
            created_at: self.created_at,
        })
    }
}

/// Input for registering a collection
#[derive(Debug, Deserialize)]
pub struct CreateCollectionInput {
    pub supplier_id: Uuid,
    pub weight_kg: Decimal,
    pub rate: Decimal,
    pub date: Option<NaiveDate>,
}

/// Input for confirming a payment
#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentInput {
    pub transaction_id: String,
}

/// QR payload returned to the collector.
///
/// `data_url` is the confirm URL the physical QR encodes; it contains the
/// bare transaction id only, never the signed token.
#[derive(Debug, Serialize)]
pub struct QrResponse {
    pub data_url: String,
    pub exp: DateTime<Utc>,
    pub transaction_id: String,
}

/// Result of a successful confirmation
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub transaction_id: String,
    pub total: Decimal,
    pub paid_at: DateTime<Utc>,
    /// Absent when receipt rendering failed; the payment stays confirmed
    pub receipt_path: Option<String>,
}

/// Query parameters for collection listing
#[derive(Debug, Default, Deserialize)]
pub struct ListCollectionsQuery {
    pub status: Option<PaymentStatus>,
    pub supplier_id: Option<Uuid>,
    pub collector_id: Option<Uuid>,
}

/// Reconciliation mirror entry
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PaymentTransactionEntry {
    pub transaction_id: String,
    pub amount: Decimal,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

/// Supplier row needed for payment checks and notifications
#[derive(Debug, FromRow)]
struct SupplierRow {
    name: String,
    phone: Option<String>,
    role: String,
    is_active: bool,
}

const PAYMENT_COLUMNS: &str = "transaction_id, supplier_id, collector_id, weight_kg, rate, \
     total, status, qr_token, qr_expires_at, date, paid_at, created_at";

impl PaymentService {
    /// Create a new PaymentService instance
    pub fn new(db: PgPool, events: EventBroadcaster, config: &Config) -> Self {
        Self {
            db,
            events,
            jwt_secret: config.jwt.secret.clone(),
            public_url: config.server.public_url.clone(),
            notifier: NotifierClient::new(&config.notifier),
            receipts: ReceiptClient::new(&config.receipts),
        }
    }

    /// Register a supplier's weighed delivery as a Pending payment
    pub async fn create_collection(
        &self,
        collector_id: Uuid,
        input: CreateCollectionInput,
    ) -> AppResult<SupplierPayment> {
        validate_collection_amount(input.weight_kg).map_err(|msg| AppError::Validation {
            field: "weight_kg".to_string(),
            message: msg.to_string(),
        })?;
        validate_collection_amount(input.rate).map_err(|msg| AppError::Validation {
            field: "rate".to_string(),
            message: msg.to_string(),
        })?;

        let today = Utc::now().date_naive();
        let date = input.date.unwrap_or(today);
        if date > today {
            return Err(AppError::Validation {
                field: "date".to_string(),
                message: "Collection date cannot be in the future".to_string(),
            });
        }

        // Supplier must exist, hold the supplier role and be active
        let supplier = self.get_supplier(input.supplier_id).await?;

        let total = compute_total(input.weight_kg, input.rate);
        let transaction_id = generate_transaction_id();

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            INSERT INTO supplier_payments (transaction_id, supplier_id, collector_id,
                                           weight_kg, rate, total, status, date)
            VALUES ($1, $2, $3, $4, $5, $6, 'Pending', $7)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(&transaction_id)
        .bind(input.supplier_id)
        .bind(collector_id)
        .bind(input.weight_kg)
        .bind(input.rate)
        .bind(total)
        .bind(date)
        .fetch_one(&mut *tx)
        .await?;

        // Reconciliation mirror; kept in sync, never authoritative
        sqlx::query(
            r#"
            INSERT INTO payment_transactions (transaction_id, amount, status)
            VALUES ($1, $2, 'Pending')
            "#,
        )
        .bind(&transaction_id)
        .bind(total)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Collection {} recorded for supplier {} ({} kg @ {})",
            transaction_id,
            supplier.name,
            input.weight_kg,
            input.rate
        );

        self.events.publish(DomainEvent::CollectionNew {
            transaction_id: transaction_id.clone(),
            supplier_id: input.supplier_id,
            total,
        });

        row.into_payment()
    }

    /// Mint a fresh QR proof for a pending collection.
    ///
    /// Re-issuing overwrites the previous token and expiry; only the latest
    /// token is ever valid.
    pub async fn generate_qr(&self, transaction_id: &str) -> AppResult<QrResponse> {
        let row = self.fetch_payment(transaction_id).await?;

        if row.status()?.is_terminal() {
            return Err(AppError::Conflict {
                resource: "payment".to_string(),
                message: "Already paid".to_string(),
            });
        }

        let now = Utc::now();
        let expires_at = now + chrono::Duration::seconds(QR_TOKEN_VALIDITY_SECS);

        let claims = QrClaims {
            txn: row.transaction_id.clone(),
            sub: row.supplier_id.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("QR token generation failed: {}", e)))?;

        let mut tx = self.db.begin().await?;

        // Guard against racing a concurrent confirmation
        let updated = sqlx::query(
            r#"
            UPDATE supplier_payments
            SET qr_token = $1, qr_expires_at = $2, status = 'QR Generated'
            WHERE transaction_id = $3 AND status <> 'Paid'
            "#,
        )
        .bind(&token)
        .bind(expires_at)
        .bind(transaction_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::Conflict {
                resource: "payment".to_string(),
                message: "Already paid".to_string(),
            });
        }

        sqlx::query(
            "UPDATE payment_transactions SET status = 'QR Generated', updated_at = NOW() \
             WHERE transaction_id = $1",
        )
        .bind(transaction_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.events.publish(DomainEvent::QrGenerated {
            transaction_id: transaction_id.to_string(),
            expires_at,
        });

        Ok(QrResponse {
            data_url: format!("{}/pay/{}", self.public_url, transaction_id),
            exp: expires_at,
            transaction_id: transaction_id.to_string(),
        })
    }

    /// Confirm a payment as the owning supplier.
    ///
    /// Preconditions are checked in a fixed order (existence, ownership, QR
    /// window, terminal status, token signature); the transition to Paid is
    /// a single conditional update so a concurrent confirmation loses with
    /// a conflict instead of double-paying.
    pub async fn confirm_payment(
        &self,
        supplier_user_id: Uuid,
        input: ConfirmPaymentInput,
    ) -> AppResult<ConfirmResponse> {
        let row = self.fetch_payment(&input.transaction_id).await?;
        let status = row.status()?;
        let now = Utc::now();

        check_confirmation(
            row.supplier_id,
            row.qr_expires_at,
            status,
            supplier_user_id,
            now,
        )
        .map_err(|e| match e {
            ConfirmationError::NotOwner => {
                AppError::Forbidden("This payment belongs to a different supplier".to_string())
            }
            ConfirmationError::QrExpired => AppError::QrExpired,
            ConfirmationError::AlreadyPaid => AppError::Conflict {
                resource: "payment".to_string(),
                message: "Already paid".to_string(),
            },
        })?;

        // The stored token must independently verify; the QR itself only
        // carried the transaction id.
        let token = row.qr_token.as_deref().ok_or(AppError::QrExpired)?;
        let claims = self.verify_qr_token(token)?;
        if claims.txn != row.transaction_id || claims.sub != row.supplier_id.to_string() {
            return Err(AppError::QrExpired);
        }

        // Total is recomputed from the authoritative weight and rate; a
        // stale stored value or client-supplied amount is never trusted.
        let total = compute_total(row.weight_kg, row.rate);

        // Fetched ahead of the commit so a lookup failure can never turn a
        // confirmed payment into an error response
        let supplier = sqlx::query_as::<_, SupplierRow>(
            "SELECT name, phone, role, is_active FROM users WHERE id = $1",
        )
        .bind(row.supplier_id)
        .fetch_optional(&self.db)
        .await?;

        let mut tx = self.db.begin().await?;

        let paid_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            UPDATE supplier_payments
            SET status = 'Paid', total = $1, paid_at = NOW()
            WHERE transaction_id = $2 AND status <> 'Paid'
            RETURNING paid_at
            "#,
        )
        .bind(total)
        .bind(&row.transaction_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Conflict {
            resource: "payment".to_string(),
            message: "Already paid".to_string(),
        })?;

        sqlx::query(
            "UPDATE payment_transactions SET status = 'Paid', amount = $1, updated_at = NOW() \
             WHERE transaction_id = $2",
        )
        .bind(total)
        .bind(&row.transaction_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        // Receipt and notification are best-effort; the payment stays
        // confirmed whatever happens below.
        let supplier_name = supplier
            .as_ref()
            .map(|s| s.name.as_str())
            .unwrap_or("Supplier");
        let receipt_path = self
            .render_receipt(&row, supplier_name, total, paid_at)
            .await;

        if let Some(phone) = supplier.as_ref().and_then(|s| s.phone.as_deref()) {
            let message = format!(
                "Payment of LKR {} for {} kg confirmed. Ref {}",
                total, row.weight_kg, row.transaction_id
            );
            if !self.notifier.notify(phone, &message).await {
                tracing::warn!(
                    "Payment {} confirmed but supplier notification failed",
                    row.transaction_id
                );
            }
        }

        self.events.publish(DomainEvent::PaymentCompleted {
            transaction_id: row.transaction_id.clone(),
            amount: total,
        });

        Ok(ConfirmResponse {
            transaction_id: row.transaction_id,
            total,
            paid_at,
            receipt_path,
        })
    }

    /// Get a collection by transaction id
    pub async fn get_collection(&self, transaction_id: &str) -> AppResult<SupplierPayment> {
        self.fetch_payment(transaction_id).await?.into_payment()
    }

    /// List collections, newest first
    pub async fn list_collections(
        &self,
        query: ListCollectionsQuery,
    ) -> AppResult<Vec<SupplierPayment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM supplier_payments
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::UUID IS NULL OR supplier_id = $2)
              AND ($3::UUID IS NULL OR collector_id = $3)
            ORDER BY created_at DESC
            "#
        ))
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.supplier_id)
        .bind(query.collector_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(|r| r.into_payment()).collect()
    }

    /// Reconciliation report from the mirror table
    pub async fn reconciliation_report(&self) -> AppResult<Vec<PaymentTransactionEntry>> {
        let entries = sqlx::query_as::<_, PaymentTransactionEntry>(
            r#"
            SELECT transaction_id, amount, status, updated_at
            FROM payment_transactions
            ORDER BY updated_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    /// Export the reconciliation report as CSV
    pub fn export_to_csv(entries: &[PaymentTransactionEntry]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for entry in entries {
            wtr.serialize(entry)
                .map_err(|e| AppError::Internal(format!("CSV serialization failed: {}", e)))?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("CSV encoding error: {}", e)))?;
        Ok(csv_data)
    }

    async fn fetch_payment(&self, transaction_id: &str) -> AppResult<PaymentRow> {
        sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM supplier_payments WHERE transaction_id = $1"
        ))
        .bind(transaction_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment".to_string()))
    }

    async fn get_supplier(&self, supplier_id: Uuid) -> AppResult<SupplierRow> {
        let supplier = sqlx::query_as::<_, SupplierRow>(
            "SELECT name, phone, role, is_active FROM users WHERE id = $1",
        )
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        if supplier.role != Role::Supplier.as_str() || !supplier.is_active {
            return Err(AppError::NotFound("Supplier".to_string()));
        }

        Ok(supplier)
    }

    /// Verify the stored QR token with zero leeway so the 120 s window is
    /// exact.
    fn verify_qr_token(&self, token: &str) -> AppResult<QrClaims> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<QrClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|_| AppError::QrExpired)
    }

    async fn render_receipt(
        &self,
        row: &PaymentRow,
        supplier_name: &str,
        total: Decimal,
        paid_at: DateTime<Utc>,
    ) -> Option<String> {
        let data = serde_json::json!({
            "transaction_id": row.transaction_id,
            "supplier_name": supplier_name,
            "weight_kg": row.weight_kg,
            "rate": row.rate,
            "total": total,
            "date": row.date,
            "paid_at": paid_at,
        });

        let result = async {
            let bytes = self.receipts.render("supplier-payment-receipt", &data).await?;
            self.receipts.store(&row.transaction_id, &bytes).await
        }
        .await;

        match result {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(
                    "Receipt rendering failed for {} (payment stays confirmed): {}",
                    row.transaction_id,
                    e
                );
                None
            }
        }
    }
}
