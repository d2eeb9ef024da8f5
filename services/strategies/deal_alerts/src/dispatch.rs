//! Alert dispatch: enrich an analyzed observation and hand it to the notifier topic

use config::log_deal;
use message_sink::{publish_json, MessageSink, SinkError};
use std::sync::Arc;
use types::{AlertContext, AlertSet, FlightObservation, SlotId};

#[derive(Debug, Clone)]
pub struct DealDispatcher {
    sink: Arc<dyn MessageSink>,
    topic: String,
    provider: String,
}

impl DealDispatcher {
    pub fn new(sink: Arc<dyn MessageSink>, topic: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            sink,
            topic: topic.into(),
            provider: provider.into(),
        }
    }

    /// Publish an [`AlertContext`] keyed by origin when any check fired
    ///
    /// Returns whether anything was published.
    pub async fn dispatch(
        &self,
        observation: &FlightObservation,
        slot_id: SlotId,
        alerts: AlertSet,
    ) -> Result<bool, SinkError> {
        if !alerts.any_active() {
            return Ok(false);
        }

        let context = AlertContext {
            provider: self.provider.clone(),
            slot_id,
            flight: observation.clone(),
            alerts,
        };
        log_deal!(
            "New flight deal found | Alerts: {} | {} {} | slot {}",
            context.alerts.active_checks().join(" , "),
            context.flight.route,
            context.flight.departure_date(),
            context.slot_id
        );

        let origin = context.origin().as_str().to_string();
        publish_json(self.sink.as_ref(), &self.topic, Some(&origin), &context).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use message_sink::test_utils::CollectorSink;
    use types::{MonthlyLow, Route};

    fn observation() -> FlightObservation {
        let departure = NaiveDate::from_ymd_opt(2025, 9, 2)
            .unwrap()
            .and_hms_opt(7, 10, 0)
            .unwrap();
        FlightObservation::inactive("AerolineasARG", "AR", Route::parse("MDZ", "AEP").unwrap(), departure)
    }

    #[tokio::test]
    async fn test_inactive_alerts_are_not_published() {
        let sink = Arc::new(CollectorSink::new());
        let dispatcher = DealDispatcher::new(sink.clone(), "alerts", "AerolineasARG");
        let flight = observation();

        let sent = dispatcher
            .dispatch(&flight, flight.slot_id(), AlertSet::default())
            .await
            .unwrap();
        assert!(!sent);
        assert_eq!(sink.message_count(), 0);
    }

    #[tokio::test]
    async fn test_active_alert_is_keyed_by_origin() {
        let sink = Arc::new(CollectorSink::new());
        let dispatcher = DealDispatcher::new(sink.clone(), "alerts", "AerolineasARG");
        let flight = observation();
        let alerts = AlertSet {
            extreme_deal: None,
            lowest_price_month: Some(MonthlyLow {
                price: 41000,
                monthly_min_price: 45000,
                description: "New monthly minimum price".into(),
            }),
        };

        assert!(dispatcher
            .dispatch(&flight, flight.slot_id(), alerts.clone())
            .await
            .unwrap());

        let messages = sink.messages_on("alerts");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].key.as_deref(), Some("MDZ"));
        let context: AlertContext = messages[0].decode().unwrap();
        assert_eq!(context.slot_id, flight.slot_id());
        assert_eq!(context.alerts, alerts);
        assert_eq!(context.provider, "AerolineasARG");
    }
}
