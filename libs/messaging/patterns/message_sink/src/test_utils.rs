//! Test doubles for the transport and notification contracts

use crate::{Message, MessageSink, NotificationSink, SendContext, SinkError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use types::AlertContext;

/// A sink that just collects messages for testing with bounded storage
#[derive(Debug)]
pub struct CollectorSink {
    /// Bounded message queue to prevent memory leaks
    messages: Arc<Mutex<VecDeque<Message>>>,
    /// Maximum number of messages to store
    max_messages: usize,
    fail_on_send: AtomicBool,
    messages_sent: AtomicU64,
}

impl Default for CollectorSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectorSink {
    /// Create a new collector sink with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    /// Create a new collector sink with specific capacity
    pub fn with_capacity(max_messages: usize) -> Self {
        Self {
            messages: Arc::new(Mutex::new(VecDeque::with_capacity(max_messages))),
            max_messages,
            fail_on_send: AtomicBool::new(false),
            messages_sent: AtomicU64::new(0),
        }
    }

    /// Get all received messages
    pub fn received_messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().iter().cloned().collect()
    }

    /// Messages published on one topic
    pub fn messages_on(&self, topic: &str) -> Vec<Message> {
        self.received_messages()
            .into_iter()
            .filter(|m| m.topic == topic)
            .collect()
    }

    /// Get the count of received messages
    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    /// Make subsequent publishes fail
    pub fn set_fail_on_send(&self, fail: bool) {
        self.fail_on_send.store(fail, Ordering::Relaxed);
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MessageSink for CollectorSink {
    async fn publish(&self, message: Message) -> Result<(), SinkError> {
        if self.fail_on_send.load(Ordering::Relaxed) {
            let context = SendContext::new(message.size())
                .with_key(message.key.clone())
                .with_target(message.topic.clone());
            return Err(SinkError::send_failed_with_context("Simulated failure", context));
        }

        let mut messages = self.messages.lock().unwrap();
        if messages.len() == self.max_messages {
            messages.pop_front();
        }
        messages.push_back(message);
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// A sink that always fails
#[derive(Debug)]
pub struct FailingSink {
    error_message: String,
}

impl FailingSink {
    pub fn new(error_message: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
        }
    }
}

impl Default for FailingSink {
    fn default() -> Self {
        Self::new("Simulated failure")
    }
}

#[async_trait]
impl MessageSink for FailingSink {
    async fn publish(&self, message: Message) -> Result<(), SinkError> {
        let context = SendContext::new(message.size())
            .with_key(message.key)
            .with_target(message.topic);
        Err(SinkError::send_failed_with_context(&self.error_message, context))
    }
}

/// Notifier that records deliveries instead of sending them
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    deals: Mutex<Vec<AlertContext>>,
    admin_errors: Mutex<Vec<(String, String)>>,
    fail_deals: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deals(&self) -> Vec<AlertContext> {
        self.deals.lock().unwrap().clone()
    }

    pub fn admin_errors(&self) -> Vec<(String, String)> {
        self.admin_errors.lock().unwrap().clone()
    }

    pub fn set_fail_deals(&self, fail: bool) {
        self.fail_deals.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    fn channel_for(&self, context: &AlertContext) -> String {
        format!("recording:{}", context.origin())
    }

    async fn send_deal(&self, context: &AlertContext) -> Result<(), SinkError> {
        if self.fail_deals.load(Ordering::Relaxed) {
            return Err(SinkError::Timeout(1));
        }
        self.deals.lock().unwrap().push(context.clone());
        Ok(())
    }

    async fn send_admin_error(&self, context: &str, message: &str) -> Result<(), SinkError> {
        self.admin_errors
            .lock()
            .unwrap()
            .push((context.to_string(), message.to_string()));
        Ok(())
    }
}
