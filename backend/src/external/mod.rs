//! External service integrations

pub mod notifier;
pub mod receipts;

pub use notifier::NotifierClient;
pub use receipts::ReceiptClient;
