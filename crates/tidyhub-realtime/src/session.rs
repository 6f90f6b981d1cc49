//! One authenticated WebSocket client.
//!
//! A session owns every live handle of its connection: online status,
//! notification center, desktop alerts, and the open conversations. Dropping
//! it tears all of them down.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tidyhub_core::error::AppError;
use tidyhub_core::result::AppResult;
use tidyhub_core::types::{ConversationId, UserId};
use tidyhub_database::feed::{FeedSubscription, RowFilter, Table};
use tidyhub_service::{ChatServices, RequestContext};

use crate::connection::ConnectionHandle;
use crate::message::serializer::deserialize_inbound;
use crate::message::types::{InboundMessage, OutboundMessage};
use crate::notification::{
    DesktopAlertListener, NotificationCenter, NotificationCenterHandle, NotificationChange,
    SocketNotifier, Surface, ViewTracker,
};
use crate::presence::{ConversationPresence, OnlineHandle, PresenceView};
use crate::server::RealtimeEngine;
use crate::stream::{MessageStream, MessageStreamHandle, StreamUpdate};

struct OpenConversation {
    stream: MessageStreamHandle,
    presence: ConversationPresence,
    forwarders: Vec<JoinHandle<()>>,
}

impl Drop for OpenConversation {
    fn drop(&mut self) {
        for task in &self.forwarders {
            task.abort();
        }
    }
}

/// Live state of one client connection.
pub struct ClientSession {
    ctx: RequestContext,
    engine: RealtimeEngine,
    connection: Arc<ConnectionHandle>,
    notifier: Arc<SocketNotifier>,
    view: ViewTracker,
    alerts: DesktopAlertListener,
    center: NotificationCenterHandle,
    online: OnlineHandle,
    open: HashMap<ConversationId, OpenConversation>,
    forwarders: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("user_id", &self.ctx.user_id)
            .field("conn_id", &self.connection.id)
            .field("open", &self.open.len())
            .finish()
    }
}

impl ClientSession {
    /// Start a session and queue its initial snapshot: online users,
    /// notification count, conversation list.
    pub(crate) async fn start(
        engine: RealtimeEngine,
        connection: Arc<ConnectionHandle>,
    ) -> AppResult<Self> {
        let ctx = RequestContext::new(connection.user_id);
        let services = &engine.services;

        let notifier = Arc::new(SocketNotifier::new(connection.clone()));
        let view = ViewTracker::new();
        let alerts = DesktopAlertListener::start(
            services,
            ctx.user_id,
            view.clone(),
            notifier.clone(),
            &engine.config().notifications,
        );
        let center = NotificationCenter::open(services, ctx);
        let online = engine.online.observe(ctx.user_id);

        let forwarders = vec![
            tokio::spawn(forward_online(online.subscribe(), connection.clone())),
            tokio::spawn(forward_notifications(center.subscribe(), connection.clone())),
            tokio::spawn(forward_conversations(
                services
                    .feed
                    .subscribe(Table::Conversations, RowFilter::Participant(ctx.user_id)),
                services.clone(),
                ctx,
                connection.clone(),
            )),
        ];

        let session = Self {
            ctx,
            engine,
            connection,
            notifier,
            view,
            alerts,
            center,
            online,
            open: HashMap::new(),
            forwarders,
        };
        session.send_snapshot().await?;

        info!(user_id = %ctx.user_id, conn_id = %session.connection.id, "Client session started");
        Ok(session)
    }

    async fn send_snapshot(&self) -> AppResult<()> {
        self.connection.send(OutboundMessage::OnlineUsers {
            users: sorted(self.online.online_users()),
        });
        let unread_count = self.center.unread_count().await?;
        self.connection.send(OutboundMessage::NotificationsChanged {
            notification: None,
            unread_count,
        });
        let conversations = self.engine.services.directory.list(&self.ctx).await?;
        self.connection
            .send(OutboundMessage::ConversationsChanged { conversations });
        Ok(())
    }

    pub fn user_id(&self) -> UserId {
        self.ctx.user_id
    }

    pub fn connection(&self) -> &Arc<ConnectionHandle> {
        &self.connection
    }

    pub fn view(&self) -> &ViewTracker {
        &self.view
    }

    pub fn alerts(&self) -> &DesktopAlertListener {
        &self.alerts
    }

    pub fn is_open(&self, conversation: ConversationId) -> bool {
        self.open.contains_key(&conversation)
    }

    /// Handle a raw text frame. Failures are reported back as an `error`
    /// frame.
    pub async fn handle_text(&mut self, text: &str) {
        let result = match deserialize_inbound(text) {
            Ok(inbound) => self.handle(inbound).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            debug!(user_id = %self.ctx.user_id, error = %e, "Client frame failed");
            self.connection.send(OutboundMessage::error(&e));
        }
    }

    /// Handle one inbound frame.
    pub async fn handle(&mut self, inbound: InboundMessage) -> AppResult<()> {
        match inbound {
            InboundMessage::OpenConversation { conversation_id } => {
                self.open_conversation(conversation_id).await
            }
            InboundMessage::CloseConversation { conversation_id } => {
                if self.open.remove(&conversation_id).is_some() {
                    debug!(user_id = %self.ctx.user_id, conversation_id = %conversation_id, "Conversation closed");
                }
                Ok(())
            }
            InboundMessage::SendMessage {
                conversation_id,
                body,
                attachment_url,
            } => {
                let ctx = RequestContext::new(self.ctx.user_id);
                self.engine
                    .services
                    .messages
                    .send(&ctx, conversation_id, &body, attachment_url)
                    .await?;
                if let Some(open) = self.open.get(&conversation_id) {
                    open.presence.set_typing(false);
                }
                Ok(())
            }
            InboundMessage::Typing {
                conversation_id,
                typing,
            } => {
                let open = self.open.get(&conversation_id).ok_or_else(|| {
                    AppError::validation(format!("Conversation {conversation_id} is not open"))
                })?;
                open.presence.set_typing(typing);
                Ok(())
            }
            InboundMessage::View { surface } => {
                self.view.set(surface);
                if surface == Surface::Messages {
                    self.alerts.tray().clear();
                }
                Ok(())
            }
            InboundMessage::NotificationPermission { permission } => {
                self.notifier.set_permission(permission);
                Ok(())
            }
            InboundMessage::MarkNotificationRead { notification_id } => {
                self.center.mark_read(notification_id).await?;
                Ok(())
            }
            InboundMessage::MarkAllNotificationsRead => {
                self.center.mark_all_read().await?;
                Ok(())
            }
        }
    }

    async fn open_conversation(&mut self, conversation_id: ConversationId) -> AppResult<()> {
        if let Some(open) = self.open.get(&conversation_id) {
            let conversation = self
                .engine
                .services
                .directory
                .conversation(conversation_id)
                .await?;
            self.connection.send(OutboundMessage::ConversationOpened {
                conversation,
                messages: open.stream.messages(),
                presence: open.presence.view(),
            });
            return Ok(());
        }

        let limit = self.engine.config().max_open_conversations;
        if self.open.len() >= limit {
            return Err(AppError::validation(format!(
                "At most {limit} conversations can be open at once"
            )));
        }

        let services = &self.engine.services;
        let stream = MessageStream::open(services, self.ctx, conversation_id).await?;
        let conversation = services.directory.conversation(conversation_id).await?;
        let presence = ConversationPresence::join(
            &self.engine.presence,
            conversation_id,
            self.ctx.user_id,
            services.clock.clone(),
            Duration::from_millis(self.engine.config().typing_timeout_ms),
        );

        self.connection.send(OutboundMessage::ConversationOpened {
            conversation,
            messages: stream.messages(),
            presence: presence.view(),
        });
        if !stream.initially_marked().is_empty() {
            refresh_conversations(services, &self.ctx, &self.connection).await;
        }

        let forwarders = vec![
            tokio::spawn(forward_stream(
                stream.subscribe(),
                services.clone(),
                self.ctx,
                self.connection.clone(),
            )),
            tokio::spawn(forward_presence(
                conversation_id,
                presence.subscribe(),
                self.connection.clone(),
            )),
        ];
        self.open.insert(
            conversation_id,
            OpenConversation {
                stream,
                presence,
                forwarders,
            },
        );
        Ok(())
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        for task in &self.forwarders {
            task.abort();
        }
        self.open.clear();
        self.engine.connections.unregister(&self.connection.id);
        debug!(user_id = %self.ctx.user_id, conn_id = %self.connection.id, "Client session closed");
    }
}

fn sorted(users: impl IntoIterator<Item = UserId>) -> Vec<UserId> {
    let mut users: Vec<UserId> = users.into_iter().collect();
    users.sort();
    users
}

async fn refresh_conversations(
    services: &ChatServices,
    ctx: &RequestContext,
    connection: &ConnectionHandle,
) {
    match services.directory.list(ctx).await {
        Ok(conversations) => {
            connection.send(OutboundMessage::ConversationsChanged { conversations });
        }
        Err(e) => {
            warn!(user_id = %ctx.user_id, error = %e, "Failed to refresh conversation list");
        }
    }
}

async fn forward_stream(
    mut updates: broadcast::Receiver<StreamUpdate>,
    services: ChatServices,
    ctx: RequestContext,
    connection: Arc<ConnectionHandle>,
) {
    loop {
        let update = match updates.recv().await {
            Ok(update) => update,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(conn_id = %connection.id, skipped, "Stream forwarder lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        match update {
            StreamUpdate::Inserted(message) => {
                connection.send(OutboundMessage::MessageInserted { message });
            }
            StreamUpdate::Updated(message) => {
                connection.send(OutboundMessage::MessageUpdated { message });
            }
            StreamUpdate::ReadMarked(_) => {
                refresh_conversations(&services, &ctx, &connection).await;
            }
        }
    }
}

async fn forward_presence(
    conversation_id: ConversationId,
    mut view: watch::Receiver<PresenceView>,
    connection: Arc<ConnectionHandle>,
) {
    while view.changed().await.is_ok() {
        let presence = *view.borrow_and_update();
        connection.send(OutboundMessage::PresenceChanged {
            conversation_id,
            presence,
        });
    }
}

async fn forward_online(
    mut users: watch::Receiver<HashSet<UserId>>,
    connection: Arc<ConnectionHandle>,
) {
    while users.changed().await.is_ok() {
        let users = sorted(users.borrow_and_update().iter().copied());
        connection.send(OutboundMessage::OnlineUsers { users });
    }
}

async fn forward_notifications(
    mut changes: broadcast::Receiver<NotificationChange>,
    connection: Arc<ConnectionHandle>,
) {
    loop {
        match changes.recv().await {
            Ok(change) => {
                connection.send(OutboundMessage::NotificationsChanged {
                    notification: Some(change.notification),
                    unread_count: change.unread_count,
                });
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(conn_id = %connection.id, skipped, "Notification forwarder lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Keeps the client's conversation list current as conversations it takes
/// part in are created or touched.
async fn forward_conversations(
    mut subscription: FeedSubscription,
    services: ChatServices,
    ctx: RequestContext,
    connection: Arc<ConnectionHandle>,
) {
    while subscription.recv().await.is_some() {
        services.directory.invalidate(ctx.user_id).await;
        refresh_conversations(&services, &ctx, &connection).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestEnv, expect_frame};

    #[tokio::test]
    async fn test_connect_queues_snapshot() {
        let env = TestEnv::new();
        let engine = env.engine();
        let (customer, _, conv) = env.conversation_pair().await;

        let (session, mut rx) = engine.connect(customer).await.unwrap();
        let frame = expect_frame(&mut rx, |f| matches!(f, OutboundMessage::OnlineUsers { .. })).await;
        assert!(matches!(frame, OutboundMessage::OnlineUsers { users } if users == vec![customer]));
        let frame = expect_frame(&mut rx, |f| matches!(f, OutboundMessage::NotificationsChanged { .. })).await;
        assert!(matches!(
            frame,
            OutboundMessage::NotificationsChanged { notification: None, unread_count: 0 }
        ));
        let frame = expect_frame(&mut rx, |f| matches!(f, OutboundMessage::ConversationsChanged { .. })).await;
        match frame {
            OutboundMessage::ConversationsChanged { conversations } => {
                assert_eq!(conversations.len(), 1);
                assert_eq!(conversations[0].id, conv.id);
            }
            _ => unreachable!(),
        }
        assert_eq!(engine.connections.connection_count(), 1);
        drop(session);
        assert_eq!(engine.connections.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_live_chat_between_two_sessions() {
        let env = TestEnv::new();
        let engine = env.engine();
        let (customer, provider, conv) = env.conversation_pair().await;

        let (mut alice, mut alice_rx) = engine.connect(customer).await.unwrap();
        let (mut bob, mut bob_rx) = engine.connect(provider).await.unwrap();

        alice
            .handle(InboundMessage::OpenConversation { conversation_id: conv.id })
            .await
            .unwrap();
        bob.handle(InboundMessage::OpenConversation { conversation_id: conv.id })
            .await
            .unwrap();
        assert!(alice.is_open(conv.id));
        expect_frame(&mut alice_rx, |f| {
            matches!(f, OutboundMessage::PresenceChanged { presence, .. } if presence.partner_online)
        })
        .await;

        bob.handle(InboundMessage::Typing { conversation_id: conv.id, typing: true })
            .await
            .unwrap();
        expect_frame(&mut alice_rx, |f| {
            matches!(f, OutboundMessage::PresenceChanged { presence, .. } if presence.partner_typing)
        })
        .await;

        bob.handle(InboundMessage::SendMessage {
            conversation_id: conv.id,
            body: "Hello Alice".into(),
            attachment_url: None,
        })
        .await
        .unwrap();

        let frame = expect_frame(&mut alice_rx, |f| matches!(f, OutboundMessage::MessageInserted { .. })).await;
        let OutboundMessage::MessageInserted { message } = frame else {
            unreachable!()
        };
        assert_eq!(message.body, "Hello Alice");
        // Read mark and typing stop may arrive in either order.
        let (mut read_marked, mut typing_cleared) = (false, false);
        while !(read_marked && typing_cleared) {
            match expect_frame(&mut alice_rx, |_| true).await {
                OutboundMessage::MessageUpdated { message: m } if m.id == message.id => {
                    read_marked |= m.read_at.is_some();
                }
                OutboundMessage::PresenceChanged { presence, .. } => {
                    typing_cleared |= !presence.partner_typing;
                }
                _ => {}
            }
        }
        expect_frame(&mut bob_rx, |f| matches!(f, OutboundMessage::MessageInserted { .. })).await;

        let bob_ctx = RequestContext::new(provider);
        assert_eq!(env.messages.unread_count(&bob_ctx, conv.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bad_frames_answer_with_error() {
        let env = TestEnv::new();
        let engine = env.engine();
        let (customer, _, conv) = env.conversation_pair().await;
        let (mut session, mut rx) = engine.connect(customer).await.unwrap();

        session.handle_text("not json").await;
        let frame = expect_frame(&mut rx, |f| matches!(f, OutboundMessage::Error { .. })).await;
        assert!(matches!(frame, OutboundMessage::Error { code, .. } if code == "VALIDATION"));

        let raw = format!(r#"{{"type":"typing","conversation_id":"{}","typing":true}}"#, conv.id);
        session.handle_text(&raw).await;
        expect_frame(&mut rx, |f| matches!(f, OutboundMessage::Error { .. })).await;

        let stranger = ConversationId::new();
        let raw = format!(r#"{{"type":"open_conversation","conversation_id":"{stranger}"}}"#);
        session.handle_text(&raw).await;
        expect_frame(&mut rx, |f| matches!(f, OutboundMessage::Error { .. })).await;
    }

    #[tokio::test]
    async fn test_view_and_permission_gate_alerts() {
        let env = TestEnv::new();
        let engine = env.engine();
        let (customer, provider, conv) = env.conversation_pair().await;
        let (mut session, mut rx) = engine.connect(provider).await.unwrap();

        expect_frame(&mut rx, |f| matches!(f, OutboundMessage::RequestNotificationPermission)).await;
        session
            .handle(InboundMessage::NotificationPermission {
                permission: crate::notification::NotificationPermission::Granted,
            })
            .await
            .unwrap();

        env.messages
            .send(&RequestContext::new(customer), conv.id, "ping", None)
            .await
            .unwrap();
        let frame = expect_frame(&mut rx, |f| matches!(f, OutboundMessage::DesktopAlert { .. })).await;
        let OutboundMessage::DesktopAlert { alert } = frame else {
            unreachable!()
        };
        assert_eq!(alert.tag, format!("conversation-{}", conv.id));
        assert_eq!(session.alerts().tray().len(), 1);

        session
            .handle(InboundMessage::View { surface: Surface::Messages })
            .await
            .unwrap();
        assert!(session.alerts().tray().is_empty());
        assert!(session.view().is_on_messages());
    }

    #[tokio::test]
    async fn test_open_limit() {
        let env = TestEnv::new();
        let mut config = env.config.realtime.clone();
        config.max_open_conversations = 1;
        let engine = RealtimeEngine::new((*env).clone(), config);
        let customer = UserId::new();
        let first = env.conversation(customer, UserId::new()).await;
        let second = env.conversation(customer, UserId::new()).await;

        let (mut session, _rx) = engine.connect(customer).await.unwrap();
        session
            .handle(InboundMessage::OpenConversation { conversation_id: first.id })
            .await
            .unwrap();
        let err = session
            .handle(InboundMessage::OpenConversation { conversation_id: second.id })
            .await
            .unwrap_err();
        assert_eq!(err.kind, tidyhub_core::error::ErrorKind::Validation);

        session
            .handle(InboundMessage::CloseConversation { conversation_id: first.id })
            .await
            .unwrap();
        session
            .handle(InboundMessage::OpenConversation { conversation_id: second.id })
            .await
            .unwrap();
    }
}
