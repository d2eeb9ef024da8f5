//! Webhook notifier: posts deal alerts and operator errors as JSON
//!
//! Deals are routed by origin airport, falling back to a default channel.
//! The body carries a one-line `content` summary plus the full alert record;
//! presentation is left to whatever consumes the webhook.

use crate::{NotificationSink, SendContext, SinkError};
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error};
use types::AlertContext;

/// Channel name reported when no webhook matches an origin
pub const UNROUTED_CHANNEL: &str = "unrouted";

#[derive(Debug, Clone, Default)]
pub struct WebhookRoutes {
    pub admin: Option<String>,
    pub default_deals: Option<String>,
    /// Origin IATA code → webhook URL, matched case-insensitively
    pub deals_by_origin: BTreeMap<String, String>,
}

impl WebhookRoutes {
    pub fn deal_url(&self, origin: &str) -> Option<&str> {
        self.deals_by_origin
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(origin))
            .map(|(_, url)| url.as_str())
            .or(self.default_deals.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    routes: WebhookRoutes,
}

impl WebhookNotifier {
    pub fn new(routes: WebhookRoutes, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::invalid_config(format!("HTTP client: {}", e)))?;
        Ok(Self { client, routes })
    }

    async fn post(&self, url: &str, body: serde_json::Value) -> Result<(), SinkError> {
        let size = body.to_string().len();
        let response = self.client.post(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::HttpStatus {
                status: status.as_u16(),
                target: url.to_string(),
            });
        }
        debug!("Webhook accepted {}B ({})", size, status);
        Ok(())
    }
}

/// One-line summary used as the webhook `content`
pub fn deal_summary(context: &AlertContext) -> String {
    let price = context
        .price()
        .map(|p| format!("${}", p))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "{} {} {}: {} [{}]",
        context.provider,
        context.flight.route,
        context.flight.departure_date(),
        price,
        context.alerts.active_checks().join(", ")
    )
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    fn channel_for(&self, context: &AlertContext) -> String {
        self.routes
            .deal_url(context.origin().as_str())
            .unwrap_or(UNROUTED_CHANNEL)
            .to_string()
    }

    async fn send_deal(&self, context: &AlertContext) -> Result<(), SinkError> {
        let url = self.routes.deal_url(context.origin().as_str()).ok_or_else(|| {
            let ctx = SendContext::new(0).with_target(context.origin().to_string());
            SinkError::send_failed_with_context("no webhook configured for origin", ctx)
        })?;
        let body = json!({
            "content": deal_summary(context),
            "alert": context,
        });
        self.post(url, body).await
    }

    async fn send_admin_error(&self, context: &str, message: &str) -> Result<(), SinkError> {
        let Some(url) = self.routes.admin.as_deref() else {
            error!("[{}] {} (no admin webhook configured)", context, message);
            return Ok(());
        };
        let body = json!({ "content": format!("[{}] {}", context, message) });
        self.post(url, body).await
    }
}
