//! HTTP handlers for the Tea Factory Management Platform

pub mod alerts;
pub mod auth;
pub mod events;
pub mod health;
pub mod inventory;
pub mod payments;
pub mod products;
pub mod webhook;

pub use alerts::*;
pub use auth::*;
pub use events::*;
pub use health::*;
pub use inventory::*;
pub use payments::*;
pub use products::*;
pub use webhook::*;
