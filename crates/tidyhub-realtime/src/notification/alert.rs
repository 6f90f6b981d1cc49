//! Desktop alerts for incoming messages.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use tidyhub_core::config::NotificationRealtimeConfig;
use tidyhub_core::types::{ConversationId, UserId};
use tidyhub_database::feed::{ChangeKind, FeedSubscription, RowFilter, Table};
use tidyhub_entity::message::Message;
use tidyhub_service::{ChatServices, ConversationDirectory, NotificationRules};

use super::notifier::{DesktopAlert, DesktopNotifier, NotificationPermission};
use super::tray::AlertTray;
use super::view::ViewTracker;

/// Conversations whose participation answer is remembered per session.
const PARTICIPATION_CAPACITY: u64 = 1024;
const PARTICIPATION_TTL: Duration = Duration::from_secs(600);

/// Shows a desktop alert for every message addressed to the user while they
/// are away from the messages surface.
///
/// Runs for the whole authenticated session. Dropping it stops the listener.
#[derive(Debug)]
pub struct DesktopAlertListener {
    tray: Arc<AlertTray>,
    task: JoinHandle<()>,
}

impl DesktopAlertListener {
    /// Subscribe to message inserts and start alerting for `user`.
    ///
    /// Permission is requested once, if it has not been decided yet.
    pub fn start(
        services: &ChatServices,
        user: UserId,
        view: ViewTracker,
        notifier: Arc<dyn DesktopNotifier>,
        config: &NotificationRealtimeConfig,
    ) -> Self {
        let subscription = services.feed.subscribe(Table::Messages, RowFilter::All);
        let tray = Arc::new(AlertTray::new());
        let worker = AlertWorker {
            user,
            directory: services.directory.clone(),
            rules: services.rules.clone(),
            icon: config.alert_icon.clone(),
            view,
            notifier,
            tray: tray.clone(),
            participation: participation_cache(),
        };
        let task = tokio::spawn(worker.run(subscription));
        Self { tray, task }
    }

    /// Pending alerts of this session.
    pub fn tray(&self) -> &AlertTray {
        &self.tray
    }
}

impl Drop for DesktopAlertListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct AlertWorker {
    user: UserId,
    directory: ConversationDirectory,
    rules: NotificationRules,
    icon: String,
    view: ViewTracker,
    notifier: Arc<dyn DesktopNotifier>,
    tray: Arc<AlertTray>,
    /// Participants never change, but every conversation on the feed is
    /// checked, so only a bounded window of answers is kept.
    participation: Cache<ConversationId, bool>,
}

fn participation_cache() -> Cache<ConversationId, bool> {
    Cache::builder()
        .max_capacity(PARTICIPATION_CAPACITY)
        .time_to_live(PARTICIPATION_TTL)
        .build()
}

impl AlertWorker {
    async fn run(self, mut subscription: FeedSubscription) {
        if self.notifier.permission().await == NotificationPermission::Default {
            let permission = self.notifier.request_permission().await;
            debug!(user_id = %self.user, ?permission, "Requested desktop notification permission");
        }

        while let Some(event) = subscription.recv().await {
            if event.kind != ChangeKind::Insert {
                continue;
            }
            if let Some(message) = event.message() {
                self.handle(message).await;
            }
        }
        debug!(user_id = %self.user, "Desktop alert listener ended");
    }

    async fn handle(&self, message: &Message) {
        if message.sender_id == self.user || self.view.is_on_messages() {
            return;
        }
        if !self.participates(message.conversation_id).await {
            return;
        }
        if self.notifier.permission().await != NotificationPermission::Granted {
            return;
        }

        let sender_name = match self
            .directory
            .display_name(message.sender_id, self.rules.fallback_sender_name())
            .await
        {
            Ok(name) => name,
            Err(e) => {
                warn!(sender_id = %message.sender_id, error = %e, "Failed to resolve sender name");
                self.rules.fallback_sender_name().to_string()
            }
        };

        let alert = DesktopAlert {
            title: format!("New message from {sender_name}"),
            body: self.rules.excerpt(&message.body).to_string(),
            icon: self.icon.clone(),
            tag: format!("conversation-{}", message.conversation_id),
        };
        if self.tray.push(alert.clone()) {
            debug!(tag = %alert.tag, "Replaced pending desktop alert");
        }
        if let Err(e) = self.notifier.show(&alert).await {
            warn!(user_id = %self.user, tag = %alert.tag, error = %e, "Failed to show desktop alert");
        }
    }

    async fn participates(&self, conversation: ConversationId) -> bool {
        if let Some(known) = self.participation.get(&conversation) {
            return known;
        }
        match self.directory.is_participant(conversation, self.user).await {
            Ok(participates) => {
                self.participation.insert(conversation, participates);
                participates
            }
            Err(e) => {
                warn!(conversation_id = %conversation, error = %e, "Participation check failed");
                false
            }
        }
    }
}
