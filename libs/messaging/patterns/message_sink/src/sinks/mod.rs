//! Concrete transport and notification implementations

pub mod log;
pub mod memory;
pub mod webhook;

pub use log::LogNotifier;
pub use memory::MemoryBroker;
pub use webhook::WebhookNotifier;
