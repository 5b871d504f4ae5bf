//! Per-conversation event hub with tokio broadcast/mpsc plumbing.
//!
//! Each subscription runs a forwarder task that shovels hub events into the
//! subscriber's channel until the subscription is closed.  A lagging
//! subscriber loses events rather than blocking the hub, which is exactly
//! the at-least-once, resync-on-reconnect contract of [`Realtime`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use jurutani_shared::ConversationId;

use crate::error::Result;
use crate::realtime::{MessageEvent, Realtime, Subscription};

const HUB_CHANNEL_CAPACITY: usize = 256;
const SUBSCRIPTION_BUFFER: usize = 64;

/// Fan-out point for message events, keyed by conversation.
pub struct EventHub {
    channels: Mutex<HashMap<ConversationId, broadcast::Sender<MessageEvent>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Deliver an event to every live subscriber of `conversation`.
    pub fn publish(&self, conversation: ConversationId, event: MessageEvent) {
        let channels = self.channels.lock().expect("event hub lock poisoned");
        if let Some(tx) = channels.get(&conversation) {
            // Err just means nobody is listening right now.
            let _ = tx.send(event);
        }
    }

    /// Drop the channel for `conversation`, ending every live feed on it.
    ///
    /// Subscribers observe a transport drop and have to reconnect; used to
    /// exercise the resubscribe/re-sync path.
    pub fn reset(&self, conversation: ConversationId) {
        self.channels
            .lock()
            .expect("event hub lock poisoned")
            .remove(&conversation);
    }

    fn sender(&self, conversation: ConversationId) -> broadcast::Sender<MessageEvent> {
        let mut channels = self.channels.lock().expect("event hub lock poisoned");
        channels
            .entry(conversation)
            .or_insert_with(|| broadcast::channel(HUB_CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// [`Realtime`] over an in-process [`EventHub`].
pub struct MemoryRealtime {
    hub: Arc<EventHub>,
}

impl MemoryRealtime {
    pub fn new(hub: Arc<EventHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl Realtime for MemoryRealtime {
    async fn subscribe(&self, conversation: ConversationId) -> Result<Subscription> {
        let mut feed = self.hub.sender(conversation).subscribe();
        let (event_tx, mut shutdown_rx, sub) = Subscription::pipe(SUBSCRIPTION_BUFFER);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!(conversation = %conversation, "subscription closed");
                        break;
                    }
                    received = feed.recv() => match received {
                        Ok(event) => {
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(
                                conversation = %conversation,
                                skipped,
                                "subscriber lagging, events dropped"
                            );
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        Ok(sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jurutani_shared::{Message, MessageId, UserId};

    fn test_message(conversation: ConversationId) -> Message {
        Message {
            id: MessageId::new(),
            conversation_id: conversation,
            sender_id: UserId::new(),
            content: "Halo".to_string(),
            attachment: None,
            created_at: chrono::Utc::now(),
            read: false,
            sender: None,
            pending: false,
        }
    }

    #[tokio::test]
    async fn events_reach_subscriber() {
        let hub = Arc::new(EventHub::new());
        let realtime = MemoryRealtime::new(Arc::clone(&hub));
        let conversation = ConversationId::new();

        let mut sub = realtime.subscribe(conversation).await.unwrap();
        let msg = test_message(conversation);
        hub.publish(conversation, MessageEvent::Inserted(msg.clone()));

        match sub.next_event().await {
            Some(MessageEvent::Inserted(received)) => assert_eq!(received.id, msg.id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn events_are_scoped_to_the_subscribed_conversation() {
        let hub = Arc::new(EventHub::new());
        let realtime = MemoryRealtime::new(Arc::clone(&hub));
        let mine = ConversationId::new();
        let other = ConversationId::new();

        let mut sub = realtime.subscribe(mine).await.unwrap();
        let _other_sub = realtime.subscribe(other).await.unwrap();
        hub.publish(other, MessageEvent::Deleted(MessageId::new()));
        hub.publish(mine, MessageEvent::Deleted(MessageId::new()));

        // Only the event for `mine` arrives on this subscription.
        let event = sub.next_event().await.unwrap();
        assert!(matches!(event, MessageEvent::Deleted(_)));
        assert!(tokio::time::timeout(
            std::time::Duration::from_millis(50),
            sub.next_event()
        )
        .await
        .is_err());
    }

    #[tokio::test]
    async fn closed_subscription_stops_delivering() {
        let hub = Arc::new(EventHub::new());
        let realtime = MemoryRealtime::new(Arc::clone(&hub));
        let conversation = ConversationId::new();

        let mut sub = realtime.subscribe(conversation).await.unwrap();
        sub.close();
        hub.publish(conversation, MessageEvent::Deleted(MessageId::new()));

        assert!(sub.next_event().await.is_none());
    }
}
