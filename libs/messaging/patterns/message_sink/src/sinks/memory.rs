//! In-process broker with Kafka-like consumer groups
//!
//! Every consumer group of a topic receives every message; subscribers that
//! share a group compete for messages. A short retained log is replayed to
//! groups that subscribe after messages were already published.

use crate::{Message, MessageSink, MessageSource, SendContext, SinkError, Subscription};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::debug;

/// Messages kept per topic for late-joining groups
pub const DEFAULT_RETENTION: usize = 1024;

type SharedReceiver = Arc<AsyncMutex<mpsc::UnboundedReceiver<Message>>>;

struct GroupQueue {
    tx: mpsc::UnboundedSender<Message>,
    rx: SharedReceiver,
}

#[derive(Default)]
struct TopicState {
    groups: HashMap<String, GroupQueue>,
    retained: VecDeque<Message>,
    closed: bool,
}

#[derive(Clone)]
pub struct MemoryBroker {
    topics: Arc<Mutex<HashMap<String, TopicState>>>,
    retention: usize,
}

impl std::fmt::Debug for MemoryBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBroker")
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            retention,
        }
    }

    /// End every subscription of `topic` once its queued messages are drained
    pub fn close_topic(&self, topic: &str) {
        let mut topics = self.topics.lock();
        let state = topics.entry(topic.to_string()).or_default();
        state.closed = true;
        // Dropping the senders lets receivers drain and then yield None
        for (_, queue) in state.groups.iter_mut() {
            let (closed_tx, _) = mpsc::unbounded_channel();
            queue.tx = closed_tx;
        }
    }

    /// Close every topic; consumers drain what is queued and return
    pub fn shutdown(&self) {
        let names: Vec<String> = self.topics.lock().keys().cloned().collect();
        for name in names {
            self.close_topic(&name);
        }
    }
}

#[async_trait]
impl MessageSink for MemoryBroker {
    async fn publish(&self, message: Message) -> Result<(), SinkError> {
        let mut topics = self.topics.lock();
        let state = topics.entry(message.topic.clone()).or_default();
        if state.closed {
            return Err(SinkError::Closed);
        }

        for (group, queue) in state.groups.iter() {
            if queue.tx.send(message.clone()).is_err() {
                let context = SendContext::new(message.size())
                    .with_key(message.key.clone())
                    .with_target(format!("{}/{}", message.topic, group));
                return Err(SinkError::send_failed_with_context("group queue dropped", context));
            }
        }

        if self.retention > 0 {
            if state.retained.len() == self.retention {
                state.retained.pop_front();
            }
            state.retained.push_back(message);
        }
        Ok(())
    }
}

#[async_trait]
impl MessageSource for MemoryBroker {
    async fn subscribe(&self, topic: &str, group: &str) -> Result<Box<dyn Subscription>, SinkError> {
        let mut topics = self.topics.lock();
        let state = topics.entry(topic.to_string()).or_default();

        if let Some(queue) = state.groups.get(group) {
            return Ok(Box::new(MemorySubscription {
                rx: Arc::clone(&queue.rx),
            }));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        for message in &state.retained {
            // Receiver is alive in this scope, send cannot fail
            let _ = tx.send(message.clone());
        }
        debug!(
            "Group {} joined topic {} ({} retained messages replayed)",
            group,
            topic,
            state.retained.len()
        );

        let rx = Arc::new(AsyncMutex::new(rx));
        let tx = if state.closed {
            mpsc::unbounded_channel().0
        } else {
            tx
        };
        state.groups.insert(
            group.to_string(),
            GroupQueue {
                tx,
                rx: Arc::clone(&rx),
            },
        );
        Ok(Box::new(MemorySubscription { rx }))
    }
}

struct MemorySubscription {
    rx: SharedReceiver,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next(&mut self) -> Option<Message> {
        self.rx.lock().await.recv().await
    }
}
