//! Shared types and models for the Tea Factory Management Platform
//!
//! This crate contains the pure domain types and logic shared between the
//! backend services and the test suite: the product catalogue model with its
//! derived stock status, the supplier payment status machine, and the
//! validation helpers.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
