//! The realtime message feed: a cancellable subscription per conversation.
//!
//! Delivery is at-least-once and carries no ordering guarantee across a
//! reconnect gap, so consumers dedupe by id and re-sync history whenever a
//! dropped subscription is re-established.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use jurutani_shared::{ConversationId, Message, MessageId};

use crate::error::Result;

/// Insert/delete events for one conversation's message feed.
#[derive(Debug, Clone)]
pub enum MessageEvent {
    /// A new row, with its full payload (denormalized sender fields
    /// included) so consumers do not have to re-fetch.
    Inserted(Message),
    /// A row was removed.
    Deleted(MessageId),
}

impl MessageEvent {
    /// The id of the message this event is about.
    pub fn message_id(&self) -> MessageId {
        match self {
            MessageEvent::Inserted(msg) => msg.id,
            MessageEvent::Deleted(id) => *id,
        }
    }
}

/// A live subscription to one conversation's feed.
///
/// The sync engine owns exactly one of these per open conversation and must
/// call [`close`](Subscription::close) on every transition out of Active.
/// `next_event` returning `None` without a preceding `close` means the
/// transport dropped the feed.
pub struct Subscription {
    events: mpsc::Receiver<MessageEvent>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Subscription {
    /// Build the plumbing for a subscription: the sender half a feeder task
    /// writes events into, the shutdown signal it should watch, and the
    /// subscription handed to the consumer.
    pub fn pipe(buffer: usize) -> (mpsc::Sender<MessageEvent>, oneshot::Receiver<()>, Subscription) {
        let (event_tx, event_rx) = mpsc::channel(buffer);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let sub = Subscription {
            events: event_rx,
            shutdown: Some(shutdown_tx),
        };
        (event_tx, shutdown_rx, sub)
    }

    /// Wait for the next event.  `None` when the feed has ended.
    pub async fn next_event(&mut self) -> Option<MessageEvent> {
        self.events.recv().await
    }

    /// Cancel the subscription.  Buffered events are dropped and the feeder
    /// is signalled to stop; safe to call more than once.
    pub fn close(&mut self) {
        self.shutdown.take();
        self.events.close();
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
pub trait Realtime: Send + Sync {
    /// Register interest in insert/delete events scoped to one conversation.
    async fn subscribe(&self, conversation: ConversationId) -> Result<Subscription>;
}
