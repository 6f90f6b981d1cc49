//! Registry of presence topics and RAII memberships.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use tidyhub_core::types::UserId;
use tidyhub_entity::presence::{PresenceMeta, PresenceSnapshot};

use super::channel::{PresenceChannel, PresenceEvent};
use crate::channel::Topic;

/// All live presence topics of the process.
#[derive(Debug, Clone)]
pub struct PresenceHub {
    channels: Arc<DashMap<Topic, Arc<PresenceChannel>>>,
    buffer_size: usize,
}

impl PresenceHub {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            buffer_size,
        }
    }

    /// The channel of a topic, if anyone is on it.
    pub fn channel(&self, topic: Topic) -> Option<Arc<PresenceChannel>> {
        self.channels.get(&topic).map(|entry| entry.value().clone())
    }

    /// Join `topic` as `key` with a fresh connection ref.
    ///
    /// Nothing is announced until [`PresenceMembership::track`] is called.
    pub fn join(&self, topic: Topic, key: UserId) -> PresenceMembership {
        let entry = self
            .channels
            .entry(topic)
            .or_insert_with(|| Arc::new(PresenceChannel::new(topic, self.buffer_size)));
        // Acquired under the shard lock so pruning cannot race the join.
        entry.value().acquire();
        let channel = entry.value().clone();
        drop(entry);

        PresenceMembership {
            hub: self.clone(),
            channel,
            key,
            connection_ref: Uuid::new_v4().to_string(),
        }
    }

    pub fn topic_count(&self) -> usize {
        self.channels.len()
    }

    fn prune(&self, topic: Topic) {
        if self
            .channels
            .remove_if(&topic, |_, channel| channel.is_idle())
            .is_some()
        {
            debug!(topic = %topic, "Presence topic released");
        }
    }
}

/// One connection's membership of a presence topic.
///
/// Dropping it untracks the announcement, so the leave event is emitted
/// even on abrupt teardown.
#[derive(Debug)]
pub struct PresenceMembership {
    hub: PresenceHub,
    channel: Arc<PresenceChannel>,
    key: UserId,
    connection_ref: String,
}

impl PresenceMembership {
    pub fn key(&self) -> UserId {
        self.key
    }

    pub fn topic(&self) -> Topic {
        self.channel.topic()
    }

    pub fn connection_ref(&self) -> &str {
        &self.connection_ref
    }

    /// Announce this connection's state.
    pub fn track(&self, typing: bool, at: DateTime<Utc>) -> PresenceEvent {
        self.channel.track(
            self.key,
            PresenceMeta {
                connection_ref: self.connection_ref.clone(),
                typing,
                last_seen_at: at,
            },
        )
    }

    /// Retract this connection's state.
    pub fn untrack(&self) -> Option<PresenceEvent> {
        self.channel.untrack(self.key, &self.connection_ref)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PresenceEvent> {
        self.channel.subscribe()
    }

    pub fn snapshot(&self) -> PresenceSnapshot {
        self.channel.snapshot()
    }

    pub(crate) fn channel(&self) -> Arc<PresenceChannel> {
        self.channel.clone()
    }
}

impl Drop for PresenceMembership {
    fn drop(&mut self) {
        self.untrack();
        self.channel.release();
        self.hub.prune(self.channel.topic());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::PresenceEventKind;

    #[test]
    fn test_drop_emits_leave_and_prunes_topic() {
        let hub = PresenceHub::new(16);
        let topic = Topic::PresenceGlobal;
        let alice = hub.join(topic, UserId::new());
        let bob_id = UserId::new();
        let bob = hub.join(topic, bob_id);
        alice.track(false, Utc::now());
        bob.track(false, Utc::now());

        let mut rx = alice.subscribe();
        drop(bob);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, PresenceEventKind::Leave);
        assert_eq!(event.key, bob_id);
        assert_eq!(hub.topic_count(), 1);

        drop(rx);
        drop(alice);
        assert_eq!(hub.topic_count(), 0);
    }

    #[test]
    fn test_two_connections_of_one_user() {
        let hub = PresenceHub::new(16);
        let user = UserId::new();
        let first = hub.join(Topic::PresenceGlobal, user);
        let second = hub.join(Topic::PresenceGlobal, user);
        assert_ne!(first.connection_ref(), second.connection_ref());

        first.track(false, Utc::now());
        second.track(false, Utc::now());
        assert_eq!(first.snapshot()[&user].len(), 2);

        drop(first);
        assert!(second.snapshot().contains_key(&user));
    }
}
