//! # Message Sink - Transport and Notification Contracts
//!
//! Narrow contracts the fare monitor pipeline talks through:
//!
//! - [`MessageSink`] publishes a keyed [`Message`] to a topic
//! - [`MessageSource`] hands out [`Subscription`]s per (topic, consumer group)
//! - [`consume`] drives a handler per message with bounded concurrency
//! - [`NotificationSink`] delivers deal alerts and operator errors
//!
//! Delivery is at-least-once: handlers must tolerate seeing a message twice.
//! [`sinks::MemoryBroker`] implements both transport traits in-process;
//! [`sinks::WebhookNotifier`] and [`sinks::LogNotifier`] implement notification.

pub mod error;
pub mod message;
pub mod sinks;
pub mod test_utils;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::debug;
use types::AlertContext;

pub use error::{SendContext, SinkError};
pub use message::{Message, DEFAULT_MAX_MESSAGE_SIZE};
pub use sinks::{LogNotifier, MemoryBroker, WebhookNotifier};

/// Error a consumer handler may return; ends the consume loop
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A destination for messages that abstracts away the broker
#[async_trait]
pub trait MessageSink: Send + Sync + Debug {
    /// Publish one message; resolves once the broker has accepted it
    async fn publish(&self, message: Message) -> Result<(), SinkError>;
}

/// One consumer group's view of a topic
#[async_trait]
pub trait Subscription: Send {
    /// Next message, `None` once the topic is closed
    async fn next(&mut self) -> Option<Message>;
}

/// A source of messages grouped into consumer groups
#[async_trait]
pub trait MessageSource: Send + Sync + Debug {
    async fn subscribe(&self, topic: &str, group: &str) -> Result<Box<dyn Subscription>, SinkError>;
}

/// Outbound channel for deal alerts and operator errors
#[async_trait]
pub trait NotificationSink: Send + Sync + Debug {
    /// Channel a deal would be delivered to; part of the delivery dedupe key
    fn channel_for(&self, context: &AlertContext) -> String;

    async fn send_deal(&self, context: &AlertContext) -> Result<(), SinkError>;

    async fn send_admin_error(&self, context: &str, message: &str) -> Result<(), SinkError>;
}

/// Serialize `record` as JSON and publish it
pub async fn publish_json<T: Serialize + ?Sized>(
    sink: &dyn MessageSink,
    topic: &str,
    key: Option<&str>,
    record: &T,
) -> Result<(), SinkError> {
    let message = Message::json(topic, key.map(str::to_string), &record)?;
    sink.publish(message).await
}

/// Run `handler` for every message of `topic` as consumer `group`
///
/// At most `max_workers` handlers run at once. Returns when the topic closes
/// (after in-flight handlers finish) or with the first handler failure.
pub async fn consume<H, Fut>(
    source: &dyn MessageSource,
    topic: &str,
    group: &str,
    max_workers: usize,
    handler: H,
) -> Result<(), SinkError>
where
    H: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    let mut subscription = source.subscribe(topic, group).await?;
    let permits = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut in_flight = JoinSet::new();
    debug!("Consuming {} as group {} with {} workers", topic, group, max_workers);

    loop {
        tokio::select! {
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                handler_outcome(joined, topic)?;
            }
            next = subscription.next() => {
                let Some(message) = next else { break };
                let permit = Arc::clone(&permits)
                    .acquire_owned()
                    .await
                    .map_err(|_| SinkError::Closed)?;
                let work = handler(message);
                in_flight.spawn(async move {
                    let _permit = permit;
                    work.await
                });
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        handler_outcome(joined, topic)?;
    }
    Ok(())
}

fn handler_outcome(
    joined: Result<Result<(), HandlerError>, JoinError>,
    topic: &str,
) -> Result<(), SinkError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(SinkError::HandlerFailed {
            topic: topic.to_string(),
            reason: e.to_string(),
        }),
        Err(e) => Err(SinkError::HandlerFailed {
            topic: topic.to_string(),
            reason: format!("handler task aborted: {}", e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_consume_runs_handler_per_message() {
        let broker = MemoryBroker::new();
        for i in 0..5u8 {
            broker
                .publish(Message::new("flights", None, vec![i]).unwrap())
                .await
                .unwrap();
        }
        broker.close_topic("flights");

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        consume(&broker, "flights", "etl", 2, move |_message| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_consume_stops_on_handler_failure() {
        let broker = MemoryBroker::new();
        broker
            .publish(Message::new("flights", None, b"boom".to_vec()).unwrap())
            .await
            .unwrap();

        let result = consume(&broker, "flights", "etl", 1, |_message| async {
            Err::<(), HandlerError>("store unavailable".into())
        })
        .await;

        match result {
            Err(SinkError::HandlerFailed { topic, reason }) => {
                assert_eq!(topic, "flights");
                assert!(reason.contains("store unavailable"));
            }
            other => panic!("expected handler failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_json_sets_key() {
        let broker = MemoryBroker::new();
        let mut subscription = broker.subscribe("alerts", "notifier").await.unwrap();

        publish_json(&broker, "alerts", Some("AEP"), &serde_json::json!({"price": 99}))
            .await
            .unwrap();

        let message = subscription.next().await.unwrap();
        assert_eq!(message.key.as_deref(), Some("AEP"));
        let body: serde_json::Value = message.decode().unwrap();
        assert_eq!(body["price"], 99);
    }
}
