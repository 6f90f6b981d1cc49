//! Process-wide online status on the `presence:global` topic.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::warn;

use tidyhub_core::traits::Clock;
use tidyhub_core::types::UserId;
use tidyhub_entity::presence::PresenceSnapshot;

use super::channel::{PresenceChannel, PresenceEvent};
use super::hub::{PresenceHub, PresenceMembership};
use crate::channel::Topic;

fn online_set(state: &PresenceSnapshot) -> HashSet<UserId> {
    state
        .iter()
        .filter(|(_, metas)| !metas.is_empty())
        .map(|(key, _)| *key)
        .collect()
}

/// Who is online right now.
#[derive(Debug, Clone)]
pub struct OnlineDirectory {
    hub: PresenceHub,
    clock: Arc<dyn Clock>,
}

impl OnlineDirectory {
    pub fn new(hub: PresenceHub, clock: Arc<dyn Clock>) -> Self {
        Self { hub, clock }
    }

    /// Announce `user` as online and observe everyone else.
    pub fn observe(&self, user: UserId) -> OnlineHandle {
        let membership = self.hub.join(Topic::PresenceGlobal, user);
        let events = membership.subscribe();
        membership.track(false, self.clock.now());

        let (tx, users) = watch::channel(online_set(&membership.snapshot()));
        let listener = tokio::spawn(listen(membership.channel(), events, tx));
        OnlineHandle {
            membership,
            users,
            listener,
        }
    }

    /// Current online set without announcing anyone.
    pub fn online_users(&self) -> HashSet<UserId> {
        self.hub
            .channel(Topic::PresenceGlobal)
            .map(|channel| online_set(&channel.snapshot()))
            .unwrap_or_default()
    }
}

/// A session's announcement on the global topic. Dropping it retracts it.
#[derive(Debug)]
pub struct OnlineHandle {
    membership: PresenceMembership,
    users: watch::Receiver<HashSet<UserId>>,
    listener: JoinHandle<()>,
}

impl OnlineHandle {
    pub fn user_id(&self) -> UserId {
        self.membership.key()
    }

    pub fn online_users(&self) -> HashSet<UserId> {
        self.users.borrow().clone()
    }

    pub fn is_online(&self, user: UserId) -> bool {
        self.users.borrow().contains(&user)
    }

    pub fn subscribe(&self) -> watch::Receiver<HashSet<UserId>> {
        self.users.clone()
    }
}

impl Drop for OnlineHandle {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn listen(
    channel: Arc<PresenceChannel>,
    mut events: broadcast::Receiver<PresenceEvent>,
    tx: watch::Sender<HashSet<UserId>>,
) {
    loop {
        let next = match events.recv().await {
            Ok(event) => online_set(&event.state),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Online directory lagged, resyncing");
                online_set(&channel.snapshot())
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tidyhub_core::traits::SystemClock;

    #[tokio::test]
    async fn test_online_set_follows_sessions() {
        let directory = OnlineDirectory::new(PresenceHub::new(32), Arc::new(SystemClock));
        let alice = UserId::new();
        let bob = UserId::new();

        let alice_handle = directory.observe(alice);
        let bob_handle = directory.observe(bob);
        let mut rx = alice_handle.subscribe();
        tokio::time::timeout(Duration::from_secs(1), rx.wait_for(|set| set.contains(&bob)))
            .await
            .unwrap()
            .unwrap();
        assert!(bob_handle.is_online(alice));

        drop(bob_handle);
        tokio::time::timeout(Duration::from_secs(1), rx.wait_for(|set| !set.contains(&bob)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(directory.online_users(), HashSet::from([alice]));
    }

    #[tokio::test]
    async fn test_second_connection_keeps_user_online() {
        let directory = OnlineDirectory::new(PresenceHub::new(32), Arc::new(SystemClock));
        let user = UserId::new();
        let first = directory.observe(user);
        let second = directory.observe(user);
        drop(first);
        assert!(directory.online_users().contains(&user));
        drop(second);
        assert!(directory.online_users().is_empty());
    }
}
