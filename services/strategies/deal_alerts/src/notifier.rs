//! Deal notifier: delivers alert contexts at most once per (slot, price, channel)

use config::{log_success, TopicConfig};
use message_sink::{consume, HandlerError, Message, MessageSource, NotificationSink, SinkError};
use state_flights::{FlightStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use types::AlertContext;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to deliver deal on {channel}: {source}")]
    Delivery {
        channel: String,
        #[source]
        source: SinkError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent { channel: String },
    AlreadySent,
    /// Context without a priced offer; nothing to notify about
    NoPrice,
}

#[derive(Debug)]
pub struct DealNotifier {
    store: Arc<dyn FlightStore>,
    sink: Arc<dyn NotificationSink>,
}

impl DealNotifier {
    pub fn new(store: Arc<dyn FlightStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { store, sink }
    }

    pub async fn notify(&self, context: &AlertContext) -> Result<Delivery, NotifyError> {
        let Some(price) = context.price() else {
            warn!("Alert for slot {} carries no offer, skipping", context.slot_id);
            return Ok(Delivery::NoPrice);
        };
        let channel = self.sink.channel_for(context);

        if self.store.was_notified(&context.slot_id, price, &channel).await? {
            debug!("Slot {} at ${} already notified on {}", context.slot_id, price, channel);
            return Ok(Delivery::AlreadySent);
        }

        self.sink
            .send_deal(context)
            .await
            .map_err(|source| NotifyError::Delivery {
                channel: channel.clone(),
                source,
            })?;
        self.store.mark_notified(&context.slot_id, price, &channel).await?;

        log_success!(
            "Flight has been notified | Price: {} | Slot: {}",
            price,
            context.slot_id
        );
        Ok(Delivery::Sent { channel })
    }

    /// Consume the alerts topic until it closes or a delivery fails
    pub async fn run(self: Arc<Self>, source: &dyn MessageSource, topic: &TopicConfig) -> Result<(), SinkError> {
        info!("Consuming {} as {}", topic.name, topic.group_id);
        consume(source, &topic.name, &topic.group_id, topic.max_workers, move |message| {
            let notifier = Arc::clone(&self);
            async move { notifier.handle_message(message).await }
        })
        .await
    }

    async fn handle_message(&self, message: Message) -> Result<(), HandlerError> {
        let context: AlertContext = match message.decode() {
            Ok(context) => context,
            Err(e) => {
                warn!("Skipping message on {} that is not an alert: {}", message.topic, e);
                return Ok(());
            }
        };
        self.notify(&context).await?;
        Ok(())
    }
}
