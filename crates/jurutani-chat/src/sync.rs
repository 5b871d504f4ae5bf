//! Realtime subscription lifecycle and event reconciliation.
//!
//! One sync worker runs per open conversation.  The engine owns the
//! worker's stop signal and a monotonically increasing epoch; every event
//! application re-checks the epoch inside the timeline's critical section,
//! so closing or switching a conversation discards in-flight events instead
//! of mutating a list that is no longer showing.
//!
//! A feed that ends without an explicit close is a transport drop: the
//! worker surfaces `Disconnected`, reconnects with jittered backoff, and
//! replaces the timeline with a fresh history page before going `Active`
//! again -- delivery order across the gap is unknown, so an incremental
//! catch-up would not be safe.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use jurutani_backend::{Backend, MessageEvent, MessageRecords, Realtime, Subscription};
use jurutani_shared::constants::HISTORY_PAGE_SIZE;
use jurutani_shared::ConversationId;

use crate::cell::StateCell;
use crate::error::Result;
use crate::timeline::Timeline;

/// Subscription state for the open conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    /// No conversation is open.
    Idle,
    /// Establishing the subscription.
    Subscribing,
    /// Events are flowing into the timeline.
    Active,
    /// The transport dropped the feed; reconnecting.
    Disconnected,
}

const RECONNECT_BASE_DELAY: Duration = Duration::from_millis(500);
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(30);
const RECONNECT_MAX_JITTER_MS: u64 = 250;

pub struct SyncEngine {
    backend: Backend,
    timeline: StateCell<Timeline>,
    status: StateCell<SyncStatus>,
    /// Bumped on every close; a worker applies events only while its epoch
    /// is current.
    epoch: Arc<AtomicU64>,
    stop: Mutex<Option<oneshot::Sender<()>>>,
}

impl SyncEngine {
    pub fn new(
        backend: Backend,
        timeline: StateCell<Timeline>,
        status: StateCell<SyncStatus>,
    ) -> Self {
        Self {
            backend,
            timeline,
            status,
            epoch: Arc::new(AtomicU64::new(0)),
            stop: Mutex::new(None),
        }
    }

    /// Subscribe to `conversation` and start applying its events.
    ///
    /// Any previous subscription is torn down first; there is never more
    /// than one live worker per engine.
    pub async fn open(&self, conversation: ConversationId) -> Result<()> {
        self.close();
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.status.set(SyncStatus::Subscribing);

        let sub = match self.backend.realtime.subscribe(conversation).await {
            Ok(sub) => sub,
            Err(e) => {
                self.status.set(SyncStatus::Idle);
                return Err(e.into());
            }
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        *self.stop.lock().expect("sync stop lock poisoned") = Some(stop_tx);
        self.status.set(SyncStatus::Active);

        let worker = SyncWorker {
            backend: self.backend.clone(),
            timeline: self.timeline.clone(),
            status: self.status.clone(),
            epoch: Arc::clone(&self.epoch),
            my_epoch: epoch,
            conversation,
        };
        tokio::spawn(worker.run(sub, stop_rx));
        Ok(())
    }

    /// Tear down the current subscription synchronously.
    ///
    /// The epoch is bumped before anything else, so an event already in
    /// flight can no longer reach the timeline even if the worker has not
    /// observed the stop signal yet.
    pub fn close(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(stop) = self.stop.lock().expect("sync stop lock poisoned").take() {
            drop(stop);
        }
        self.status.set(SyncStatus::Idle);
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.close();
    }
}

struct SyncWorker {
    backend: Backend,
    timeline: StateCell<Timeline>,
    status: StateCell<SyncStatus>,
    epoch: Arc<AtomicU64>,
    my_epoch: u64,
    conversation: ConversationId,
}

impl SyncWorker {
    fn is_current(&self) -> bool {
        self.epoch.load(Ordering::SeqCst) == self.my_epoch
    }

    async fn run(self, mut sub: Subscription, mut stop_rx: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    sub.close();
                    break;
                }
                event = sub.next_event() => match event {
                    Some(event) => self.apply(event),
                    None => {
                        if !self.is_current() {
                            break;
                        }
                        self.status.set(SyncStatus::Disconnected);
                        warn!(
                            conversation = %self.conversation,
                            "realtime feed dropped, reconnecting"
                        );
                        match self.resubscribe(&mut stop_rx).await {
                            Some(fresh) => {
                                sub = fresh;
                                self.resync().await;
                                if !self.is_current() {
                                    break;
                                }
                                self.status.set(SyncStatus::Active);
                            }
                            None => break,
                        }
                    }
                }
            }
        }
        debug!(conversation = %self.conversation, "sync worker stopped");
    }

    /// Apply one event, re-checking the epoch inside the critical section.
    fn apply(&self, event: MessageEvent) {
        self.timeline.update(|timeline| {
            if self.epoch.load(Ordering::SeqCst) != self.my_epoch {
                debug!(
                    id = %event.message_id(),
                    "discarding event for a closed conversation"
                );
                return;
            }
            match event {
                MessageEvent::Inserted(msg) => {
                    // Covers the optimistic-send echo and at-least-once
                    // redelivery: a known id is a no-op.
                    if msg.conversation_id == self.conversation {
                        timeline.apply_insert(msg);
                    }
                }
                // A delete for an id we no longer hold is a no-op.
                MessageEvent::Deleted(id) => {
                    timeline.remove(id);
                }
            }
        });
    }

    /// Reconnect with exponential backoff and jitter.  `None` when the
    /// engine stopped us while waiting.
    async fn resubscribe(&self, stop_rx: &mut oneshot::Receiver<()>) -> Option<Subscription> {
        let mut delay = RECONNECT_BASE_DELAY;
        loop {
            if !self.is_current() {
                return None;
            }
            let jitter =
                Duration::from_millis(rand::thread_rng().gen_range(0..RECONNECT_MAX_JITTER_MS));
            tokio::select! {
                _ = &mut *stop_rx => return None,
                _ = tokio::time::sleep(delay + jitter) => {}
            }
            match self.backend.realtime.subscribe(self.conversation).await {
                Ok(sub) => return Some(sub),
                Err(e) => {
                    warn!(conversation = %self.conversation, error = %e, "resubscribe failed");
                    delay = (delay * 2).min(RECONNECT_MAX_DELAY);
                }
            }
        }
    }

    /// Replace the timeline with a fresh history page after a reconnect.
    async fn resync(&self) {
        match self
            .backend
            .messages
            .fetch_page(self.conversation, None, HISTORY_PAGE_SIZE)
            .await
        {
            Ok(rows) => self.timeline.update(|timeline| {
                if self.epoch.load(Ordering::SeqCst) == self.my_epoch {
                    *timeline = Timeline::from_history(rows);
                }
            }),
            Err(e) => {
                warn!(conversation = %self.conversation, error = %e, "history re-sync failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jurutani_backend::memory::MemoryBackend;
    use jurutani_backend::{MessageRecords, NewMessage};
    use jurutani_shared::{MessageId, UserId};

    fn engine(memory: &MemoryBackend, user: UserId) -> SyncEngine {
        SyncEngine::new(
            memory.backend_as(user),
            StateCell::new(Timeline::new()),
            StateCell::new(SyncStatus::Idle),
        )
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..300 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    fn new_message(conversation: ConversationId, sender: UserId) -> NewMessage {
        NewMessage {
            id: MessageId::new(),
            conversation_id: conversation,
            sender_id: sender,
            content: "Halo".to_string(),
            attachment: None,
        }
    }

    #[tokio::test]
    async fn events_flow_into_the_timeline_while_active() {
        let memory = MemoryBackend::new();
        let me = UserId::new();
        let conversation = ConversationId::new();
        let sync = engine(&memory, me);

        sync.open(conversation).await.unwrap();
        assert_eq!(sync.status.get(), SyncStatus::Active);

        let row = memory
            .messages
            .insert(new_message(conversation, UserId::new()))
            .await
            .unwrap();

        let timeline = sync.timeline.clone();
        wait_until(move || timeline.with(|t| t.contains(row.id))).await;
    }

    #[tokio::test]
    async fn late_events_never_reach_a_closed_conversation() {
        let memory = MemoryBackend::new();
        let me = UserId::new();
        let conversation = ConversationId::new();
        let sync = engine(&memory, me);

        sync.open(conversation).await.unwrap();
        sync.close();
        assert_eq!(sync.status.get(), SyncStatus::Idle);

        memory
            .messages
            .insert(new_message(conversation, UserId::new()))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sync.timeline.with(|t| t.is_empty()));
    }

    #[tokio::test]
    async fn switching_conversations_drops_the_old_feed() {
        let memory = MemoryBackend::new();
        let me = UserId::new();
        let first = ConversationId::new();
        let second = ConversationId::new();
        let sync = engine(&memory, me);

        sync.open(first).await.unwrap();
        sync.open(second).await.unwrap();

        // An event for the previously open conversation is stale.
        memory
            .messages
            .insert(new_message(first, UserId::new()))
            .await
            .unwrap();
        let in_second = memory
            .messages
            .insert(new_message(second, UserId::new()))
            .await
            .unwrap();

        let timeline = sync.timeline.clone();
        wait_until(move || timeline.with(|t| t.contains(in_second.id))).await;
        assert_eq!(sync.timeline.with(|t| t.len()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn a_dropped_feed_reconnects_and_resyncs() {
        let memory = MemoryBackend::new();
        let me = UserId::new();
        let conversation = ConversationId::new();
        let sync = engine(&memory, me);

        sync.open(conversation).await.unwrap();

        // Kill the transport out from under the worker.
        memory.hub.reset(conversation);
        let status = sync.status.clone();
        wait_until(move || status.get() == SyncStatus::Disconnected).await;

        // A message lands while we are offline; only the re-sync can see it.
        let missed = memory
            .messages
            .insert(new_message(conversation, UserId::new()))
            .await
            .unwrap();

        let status = sync.status.clone();
        wait_until(move || status.get() == SyncStatus::Active).await;
        let timeline = sync.timeline.clone();
        wait_until(move || timeline.with(|t| t.contains(missed.id))).await;

        // The re-established feed delivers live events again.
        let live = memory
            .messages
            .insert(new_message(conversation, UserId::new()))
            .await
            .unwrap();
        let timeline = sync.timeline.clone();
        wait_until(move || timeline.with(|t| t.contains(live.id))).await;
    }
}
