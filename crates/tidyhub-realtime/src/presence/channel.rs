//! A single presence topic: member state plus an event broadcast.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use tidyhub_core::types::UserId;
use tidyhub_entity::presence::{PresenceMeta, PresenceSnapshot};

use crate::channel::Topic;

/// What changed on a presence topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEventKind {
    /// An already present key refreshed one of its metas.
    Sync,
    /// A key went from absent to present.
    Join,
    /// A key's last meta was removed.
    Leave,
}

/// A presence event. Always carries the full member state after the change.
#[derive(Debug, Clone)]
pub struct PresenceEvent {
    pub kind: PresenceEventKind,
    pub key: UserId,
    pub state: Arc<PresenceSnapshot>,
}

/// Member state of one topic.
///
/// The state sits behind a synchronous mutex so memberships can untrack
/// from `Drop`. Events are broadcast while the lock is held, so receivers
/// observe them in state order.
#[derive(Debug)]
pub struct PresenceChannel {
    topic: Topic,
    state: Mutex<PresenceSnapshot>,
    events: broadcast::Sender<PresenceEvent>,
    members: AtomicUsize,
}

impl PresenceChannel {
    pub(crate) fn new(topic: Topic, buffer_size: usize) -> Self {
        let (events, _) = broadcast::channel(buffer_size.max(1));
        Self {
            topic,
            state: Mutex::new(PresenceSnapshot::new()),
            events,
            members: AtomicUsize::new(0),
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    fn lock(&self) -> MutexGuard<'_, PresenceSnapshot> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Announce (or replace) the meta of one connection under `key`.
    pub fn track(&self, key: UserId, meta: PresenceMeta) -> PresenceEvent {
        let mut state = self.lock();
        let metas = state.entry(key).or_default();
        let kind = if metas.is_empty() {
            PresenceEventKind::Join
        } else {
            PresenceEventKind::Sync
        };
        match metas
            .iter_mut()
            .find(|m| m.connection_ref == meta.connection_ref)
        {
            Some(existing) => *existing = meta,
            None => metas.push(meta),
        }
        self.emit(kind, key, &state)
    }

    /// Remove the meta of one connection. `None` if it was not tracked.
    pub fn untrack(&self, key: UserId, connection_ref: &str) -> Option<PresenceEvent> {
        let mut state = self.lock();
        let metas = state.get_mut(&key)?;
        let before = metas.len();
        metas.retain(|m| m.connection_ref != connection_ref);
        if metas.len() == before {
            return None;
        }
        let kind = if metas.is_empty() {
            state.remove(&key);
            PresenceEventKind::Leave
        } else {
            PresenceEventKind::Sync
        };
        Some(self.emit(kind, key, &state))
    }

    fn emit(&self, kind: PresenceEventKind, key: UserId, state: &PresenceSnapshot) -> PresenceEvent {
        let event = PresenceEvent {
            kind,
            key,
            state: Arc::new(state.clone()),
        };
        // No receivers is fine.
        let _ = self.events.send(event.clone());
        event
    }

    /// Current member state.
    pub fn snapshot(&self) -> PresenceSnapshot {
        self.lock().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PresenceEvent> {
        self.events.subscribe()
    }

    pub(crate) fn acquire(&self) {
        self.members.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn release(&self) {
        self.members.fetch_sub(1, Ordering::SeqCst);
    }

    /// No memberships and no tracked state.
    pub fn is_idle(&self) -> bool {
        self.members.load(Ordering::SeqCst) == 0 && self.lock().is_empty()
    }
}
