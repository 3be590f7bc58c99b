//! Product catalogue and stock status models
//!
//! `classify` is the single place a product's derived status is computed;
//! every service and handler that needs a status delegates here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Days before expiry at which a product counts as near-expiry
pub const NEAR_EXPIRY_WINDOW_DAYS: i64 = 14;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// A packaged tea product in the factory catalogue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: ProductCategory,
    pub pack_weight: PackWeight,
    pub price: Decimal,
    pub stock: i32,
    pub min_stock: i32,
    /// Unique batch number (e.g. "BT-2025-0042")
    pub batch_no: String,
    pub expiry_date: DateTime<Utc>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tea category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    BlackTea,
    GreenTea,
    WhiteTea,
    Oolong,
    Herbal,
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::BlackTea => "black_tea",
            ProductCategory::GreenTea => "green_tea",
            ProductCategory::WhiteTea => "white_tea",
            ProductCategory::Oolong => "oolong",
            ProductCategory::Herbal => "herbal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "black_tea" => Some(ProductCategory::BlackTea),
            "green_tea" => Some(ProductCategory::GreenTea),
            "white_tea" => Some(ProductCategory::WhiteTea),
            "oolong" => Some(ProductCategory::Oolong),
            "herbal" => Some(ProductCategory::Herbal),
            _ => None,
        }
    }
}

/// Retail pack weight
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PackWeight {
    #[serde(rename = "100g")]
    G100,
    #[serde(rename = "250g")]
    G250,
    #[serde(rename = "500g")]
    G500,
    #[serde(rename = "1kg")]
    Kg1,
}

impl PackWeight {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackWeight::G100 => "100g",
            PackWeight::G250 => "250g",
            PackWeight::G500 => "500g",
            PackWeight::Kg1 => "1kg",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "100g" => Some(PackWeight::G100),
            "250g" => Some(PackWeight::G250),
            "500g" => Some(PackWeight::G500),
            "1kg" => Some(PackWeight::Kg1),
            _ => None,
        }
    }
}

/// Derived stock/freshness classification of a product
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    Ok,
    LowStock,
    NearExpiry,
    LowStockNearExpiry,
    Expired,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Ok => "OK",
            StockStatus::LowStock => "LOW_STOCK",
            StockStatus::NearExpiry => "NEAR_EXPIRY",
            StockStatus::LowStockNearExpiry => "LOW_STOCK_NEAR_EXPIRY",
            StockStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OK" => Some(StockStatus::Ok),
            "LOW_STOCK" => Some(StockStatus::LowStock),
            "NEAR_EXPIRY" => Some(StockStatus::NearExpiry),
            "LOW_STOCK_NEAR_EXPIRY" => Some(StockStatus::LowStockNearExpiry),
            "EXPIRED" => Some(StockStatus::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Days until expiry, counting a partial day as a full day.
///
/// Only meaningful for a product that has not yet expired; callers must
/// handle `expiry_date <= now` before using the result.
pub fn days_to_expiry(expiry_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (expiry_date - now).num_milliseconds();
    (millis + MILLIS_PER_DAY - 1).div_euclid(MILLIS_PER_DAY)
}

/// Whether a stock level counts as low
pub fn is_low_stock(stock: i32, min_stock: i32) -> bool {
    stock < min_stock
}

/// Whether a not-yet-expired product falls inside the near-expiry window
pub fn is_near_expiry(expiry_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expiry_date > now && days_to_expiry(expiry_date, now) <= NEAR_EXPIRY_WINDOW_DAYS
}

/// Classify a product's stock/freshness status.
///
/// Expiry is absorbing: once `expiry_date <= now` the product is `Expired`
/// regardless of stock levels. Otherwise low stock means `stock < min_stock`
/// and near-expiry means the product expires within
/// [`NEAR_EXPIRY_WINDOW_DAYS`].
pub fn classify(
    stock: i32,
    min_stock: i32,
    expiry_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> StockStatus {
    if expiry_date <= now {
        return StockStatus::Expired;
    }

    match (is_low_stock(stock, min_stock), is_near_expiry(expiry_date, now)) {
        (true, true) => StockStatus::LowStockNearExpiry,
        (true, false) => StockStatus::LowStock,
        (false, true) => StockStatus::NearExpiry,
        (false, false) => StockStatus::Ok,
    }
}

/// Alert categories maintained by the status engine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    NearExpiry,
    Expired,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LowStock => "low_stock",
            AlertType::NearExpiry => "near_expiry",
            AlertType::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low_stock" => Some(AlertType::LowStock),
            "near_expiry" => Some(AlertType::NearExpiry),
            "expired" => Some(AlertType::Expired),
            _ => None,
        }
    }
}

/// Message for a low-stock alert
pub fn low_stock_message(name: &str, stock: i32, min_stock: i32) -> String {
    format!("{} is below minimum stock ({} < {})", name, stock, min_stock)
}

/// Message for a near-expiry alert
pub fn near_expiry_message(name: &str, days_remaining: i64) -> String {
    format!("{} is nearing expiry ({} days remaining)", name, days_remaining)
}

/// Message for an expired alert
pub fn expired_message(name: &str, expiry_date: DateTime<Utc>) -> String {
    format!("{} expired on {}", name, expiry_date.format("%d/%m/%Y"))
}
