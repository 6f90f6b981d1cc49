//! Per-conversation presence: partner online/typing and the local typing
//! indicator with its auto-revert.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tidyhub_core::traits::Clock;
use tidyhub_core::types::{ConversationId, UserId};
use tidyhub_entity::presence::PresenceSnapshot;

use super::channel::{PresenceChannel, PresenceEvent};
use super::hub::{PresenceHub, PresenceMembership};
use super::typing::TypingMachine;
use crate::channel::Topic;

/// What the local user sees about the other participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceView {
    pub partner_online: bool,
    pub partner_typing: bool,
}

impl PresenceView {
    /// Derive the view of `me` from a full member state.
    pub fn from_snapshot(me: UserId, state: &PresenceSnapshot) -> Self {
        let mut view = Self::default();
        for (_, metas) in state.iter().filter(|(key, metas)| **key != me && !metas.is_empty()) {
            view.partner_online = true;
            view.partner_typing |= metas.iter().any(|m| m.typing);
        }
        view
    }
}

#[derive(Debug, Default)]
struct TypingSlot {
    machine: TypingMachine,
    revert: Option<CancellationToken>,
}

#[derive(Debug)]
struct Inner {
    membership: PresenceMembership,
    clock: Arc<dyn Clock>,
    typing_timeout: Duration,
    typing: Mutex<TypingSlot>,
}

impl Inner {
    fn slot(&self) -> MutexGuard<'_, TypingSlot> {
        self.typing.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn expire(&self, generation: u64) {
        let mut slot = self.slot();
        if slot.machine.expire(generation) {
            slot.revert = None;
            self.membership.track(false, self.clock.now());
            debug!(topic = %self.membership.topic(), "Typing indicator expired");
        }
    }
}

/// Presence of one user in one open conversation.
///
/// Dropping it cancels the pending typing revert and untracks the
/// announcement.
#[derive(Debug)]
pub struct ConversationPresence {
    conversation: ConversationId,
    inner: Arc<Inner>,
    view: watch::Receiver<PresenceView>,
    listener: JoinHandle<()>,
}

impl ConversationPresence {
    /// Announce `user` as present and not typing on `conversation:{id}`.
    pub fn join(
        hub: &PresenceHub,
        conversation: ConversationId,
        user: UserId,
        clock: Arc<dyn Clock>,
        typing_timeout: Duration,
    ) -> Self {
        let membership = hub.join(Topic::Conversation(conversation), user);
        let events = membership.subscribe();
        membership.track(false, clock.now());

        let (tx, view) = watch::channel(PresenceView::from_snapshot(user, &membership.snapshot()));
        let listener = tokio::spawn(listen(user, membership.channel(), events, tx));

        Self {
            conversation,
            inner: Arc::new(Inner {
                membership,
                clock,
                typing_timeout,
                typing: Mutex::new(TypingSlot::default()),
            }),
            view,
            listener,
        }
    }

    pub fn conversation(&self) -> ConversationId {
        self.conversation
    }

    /// Current partner view.
    pub fn view(&self) -> PresenceView {
        *self.view.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PresenceView> {
        self.view.clone()
    }

    /// Whether the local user is announced as typing.
    pub fn is_typing(&self) -> bool {
        self.inner.slot().machine.is_typing()
    }

    /// Announce the local typing state.
    ///
    /// `true` (re)arms a single revert after the typing timeout; `false`
    /// cancels it. Both announce immediately.
    pub fn set_typing(&self, typing: bool) {
        let mut slot = self.inner.slot();
        if let Some(pending) = slot.revert.take() {
            pending.cancel();
        }
        let now = self.inner.clock.now();

        if !typing {
            slot.machine.stop();
            self.inner.membership.track(false, now);
            return;
        }

        let generation = slot.machine.start();
        self.inner.membership.track(true, now);

        let token = CancellationToken::new();
        slot.revert = Some(token.clone());
        tokio::spawn(revert_after(
            Arc::downgrade(&self.inner),
            generation,
            self.inner.typing_timeout,
            token,
        ));
    }
}

impl Drop for ConversationPresence {
    fn drop(&mut self) {
        if let Some(pending) = self.inner.slot().revert.take() {
            pending.cancel();
        }
        self.listener.abort();
    }
}

async fn revert_after(inner: Weak<Inner>, generation: u64, timeout: Duration, token: CancellationToken) {
    tokio::select! {
        _ = token.cancelled() => {}
        _ = tokio::time::sleep(timeout) => {
            if let Some(inner) = inner.upgrade() {
                inner.expire(generation);
            }
        }
    }
}

async fn listen(
    me: UserId,
    channel: Arc<PresenceChannel>,
    mut events: broadcast::Receiver<PresenceEvent>,
    tx: watch::Sender<PresenceView>,
) {
    loop {
        let next = match events.recv().await {
            Ok(event) => PresenceView::from_snapshot(me, &event.state),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(topic = %channel.topic(), skipped, "Presence listener lagged, resyncing");
                PresenceView::from_snapshot(me, &channel.snapshot())
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
