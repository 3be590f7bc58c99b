//! Business logic services for the Tea Factory Management Platform

pub mod alerts;
pub mod auth;
pub mod inventory;
pub mod payments;
pub mod products;

pub use alerts::AlertService;
pub use auth::AuthService;
pub use inventory::InventoryService;
pub use payments::PaymentService;
pub use products::ProductService;
