//! Product catalogue service
//!
//! Owns product CRUD; the derived stock status is attached on every read
//! and the alert side-table is re-evaluated after every mutation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::models::{classify, PackWeight, Product, ProductCategory, StockStatus};
use shared::types::SortDirection;
use shared::validation::{validate_batch_no, validate_price, validate_stock_level};

use crate::error::{AppError, AppResult};
use crate::events::{DomainEvent, EventBroadcaster};
use crate::services::alerts::AlertService;

/// Product catalogue service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
    events: EventBroadcaster,
}

/// Product row as stored
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub pack_weight: String,
    pub price: Decimal,
    pub stock: i32,
    pub min_stock: i32,
    pub batch_no: String,
    pub expiry_date: DateTime<Utc>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    pub fn into_product(self) -> AppResult<Product> {
        let category = ProductCategory::parse(&self.category).ok_or_else(|| {
            AppError::Internal(format!("Unknown category in database: {}", self.category))
        })?;
        let pack_weight = PackWeight::parse(&self.pack_weight).ok_or_else(|| {
            AppError::Internal(format!(
                "Unknown pack weight in database: {}",
                self.pack_weight
            ))
        })?;
        Ok(Product {
            id: self.id,
            name: self.name,
            category,
            pack_weight,
            price: self.price,
            stock: self.stock,
            min_stock: self.min_stock,
            batch_no: self.batch_no,
            expiry_date: self.expiry_date,
            image_url: self.image_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Product annotated with its derived status
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithStatus {
    #[serde(flatten)]
    pub product: Product,
    pub status: StockStatus,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub category: ProductCategory,
    pub pack_weight: PackWeight,
    pub price: Decimal,
    pub stock: i32,
    pub min_stock: i32,
    pub batch_no: String,
    pub expiry_date: DateTime<Utc>,
    pub image_url: Option<String>,
}

/// Input for updating a product
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub category: Option<ProductCategory>,
    pub pack_weight: Option<PackWeight>,
    pub price: Option<Decimal>,
    pub min_stock: Option<i32>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
}

/// Query parameters for product listing
#[derive(Debug, Default, Deserialize)]
pub struct ListProductsQuery {
    pub search: Option<String>,
    pub category: Option<ProductCategory>,
    pub status: Option<StockStatus>,
    pub sort: Option<ProductSortKey>,
    pub direction: Option<SortDirection>,
}

/// Sortable product columns
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortKey {
    Name,
    Price,
    Stock,
    ExpiryDate,
    CreatedAt,
}

impl ProductSortKey {
    fn as_column(&self) -> &'static str {
        match self {
            ProductSortKey::Name => "name",
            ProductSortKey::Price => "price",
            ProductSortKey::Stock => "stock",
            ProductSortKey::ExpiryDate => "expiry_date",
            ProductSortKey::CreatedAt => "created_at",
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, category, pack_weight, price, stock, min_stock, \
     batch_no, expiry_date, image_url, created_at, updated_at";

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool, events: EventBroadcaster) -> Self {
        Self { db, events }
    }

    fn annotate(product: Product) -> ProductWithStatus {
        let status = classify(
            product.stock,
            product.min_stock,
            product.expiry_date,
            Utc::now(),
        );
        ProductWithStatus { product, status }
    }

    /// Create a catalogue product
    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<ProductWithStatus> {
        validate_price(input.price).map_err(|msg| AppError::Validation {
            field: "price".to_string(),
            message: msg.to_string(),
        })?;
        validate_stock_level(input.stock).map_err(|msg| AppError::Validation {
            field: "stock".to_string(),
            message: msg.to_string(),
        })?;
        validate_stock_level(input.min_stock).map_err(|msg| AppError::Validation {
            field: "min_stock".to_string(),
            message: msg.to_string(),
        })?;
        validate_batch_no(&input.batch_no).map_err(|msg| AppError::Validation {
            field: "batch_no".to_string(),
            message: msg.to_string(),
        })?;

        if input.expiry_date <= Utc::now() {
            return Err(AppError::Validation {
                field: "expiry_date".to_string(),
                message: "Expiry date must be in the future".to_string(),
            });
        }

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (name, category, pack_weight, price, stock, min_stock,
                                  batch_no, expiry_date, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(input.category.as_str())
        .bind(input.pack_weight.as_str())
        .bind(input.price)
        .bind(input.stock)
        .bind(input.min_stock)
        .bind(&input.batch_no)
        .bind(input.expiry_date)
        .bind(&input.image_url)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::DuplicateEntry("batch_no".to_string())
            }
            _ => AppError::DatabaseError(e),
        })?;

        let product = row.into_product()?;

        // Status is never stored; only the alert side-table is refreshed
        AlertService::new(self.db.clone(), self.events.clone())
            .evaluate_product(&product)
            .await?;

        self.events.publish(DomainEvent::ProductCreated {
            product_id: product.id,
        });

        Ok(Self::annotate(product))
    }

    /// Update a catalogue product
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<ProductWithStatus> {
        if let Some(price) = input.price {
            validate_price(price).map_err(|msg| AppError::Validation {
                field: "price".to_string(),
                message: msg.to_string(),
            })?;
        }
        if let Some(min_stock) = input.min_stock {
            validate_stock_level(min_stock).map_err(|msg| AppError::Validation {
                field: "min_stock".to_string(),
                message: msg.to_string(),
            })?;
        }

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET name = COALESCE($1, name),
                category = COALESCE($2, category),
                pack_weight = COALESCE($3, pack_weight),
                price = COALESCE($4, price),
                min_stock = COALESCE($5, min_stock),
                expiry_date = COALESCE($6, expiry_date),
                image_url = COALESCE($7, image_url),
                updated_at = NOW()
            WHERE id = $8
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(input.category.map(|c| c.as_str()))
        .bind(input.pack_weight.map(|w| w.as_str()))
        .bind(input.price)
        .bind(input.min_stock)
        .bind(input.expiry_date)
        .bind(&input.image_url)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let product = row.into_product()?;

        AlertService::new(self.db.clone(), self.events.clone())
            .evaluate_product(&product)
            .await?;

        let annotated = Self::annotate(product);

        self.events.publish(DomainEvent::ProductUpdated {
            product_id: annotated.product.id,
            status: annotated.status,
        });

        Ok(annotated)
    }

    /// Delete a catalogue product and its alerts
    pub async fn delete_product(&self, product_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        self.events
            .publish(DomainEvent::ProductDeleted { product_id });

        Ok(())
    }

    /// Get a product with its derived status
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<ProductWithStatus> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(Self::annotate(row.into_product()?))
    }

    /// List products annotated with derived status.
    ///
    /// Search and category filters run in SQL; the status filter must run
    /// after classification because status is derived, not stored.
    pub async fn list_products(
        &self,
        query: ListProductsQuery,
    ) -> AppResult<Vec<ProductWithStatus>> {
        let sort = query.sort.unwrap_or(ProductSortKey::CreatedAt);
        let direction = query.direction.unwrap_or(SortDirection::Desc);

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%' OR batch_no ILIKE '%' || $1 || '%')
              AND ($2::TEXT IS NULL OR category = $2)
            ORDER BY {} {}
            "#,
            sort.as_column(),
            direction.as_sql(),
        ))
        .bind(&query.search)
        .bind(query.category.map(|c| c.as_str()))
        .fetch_all(&self.db)
        .await?;

        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            products.push(Self::annotate(row.into_product()?));
        }

        if let Some(status) = query.status {
            products.retain(|p| p.status == status);
        }

        Ok(products)
    }

    /// Fetch every product (used by the daily alert sweep)
    pub async fn all_products(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at"
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(|r| r.into_product()).collect()
    }
}
