//! Notifier that only writes to the tracing log

use crate::sinks::webhook::deal_summary;
use crate::{NotificationSink, SinkError};
use async_trait::async_trait;
use tracing::{error, warn};
use types::AlertContext;

pub const LOG_CHANNEL: &str = "log";

/// Used when no webhooks are configured, and in local runs
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    fn channel_for(&self, _context: &AlertContext) -> String {
        LOG_CHANNEL.to_string()
    }

    async fn send_deal(&self, context: &AlertContext) -> Result<(), SinkError> {
        warn!(slot = %context.slot_id, "🔥 {}", deal_summary(context));
        Ok(())
    }

    async fn send_admin_error(&self, context: &str, message: &str) -> Result<(), SinkError> {
        error!("🚨 [{}] {}", context, message);
        Ok(())
    }
}
