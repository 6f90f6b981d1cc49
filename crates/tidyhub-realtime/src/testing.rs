//! In-memory engine harness for unit tests.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use tidyhub_cache::CacheManager;
use tidyhub_core::config::AppConfig;
use tidyhub_core::result::AppResult;
use tidyhub_core::traits::SystemClock;
use tidyhub_core::types::UserId;
use tidyhub_database::{ChangeFeed, MemoryStore, Stores};
use tidyhub_entity::conversation::Conversation;
use tidyhub_entity::profile::Profile;
use tidyhub_service::{ChatServices, RequestContext};

use crate::message::types::OutboundMessage;
use crate::notification::{DesktopAlert, DesktopNotifier, NotificationPermission};
use crate::server::RealtimeEngine;

pub(crate) struct TestEnv {
    pub memory: Arc<MemoryStore>,
    pub config: AppConfig,
    services: ChatServices,
}

impl TestEnv {
    pub fn new() -> Self {
        let config = AppConfig::default();
        let memory = Arc::new(MemoryStore::new());
        let stores = Stores::from_memory(memory.clone());
        let services = ChatServices::new(
            &stores,
            CacheManager::new(&config.cache),
            ChangeFeed::new(config.realtime.channel_buffer_size),
            Arc::new(SystemClock),
            &config,
        );
        Self {
            memory,
            config,
            services,
        }
    }

    pub fn engine(&self) -> RealtimeEngine {
        RealtimeEngine::new(self.services.clone(), self.config.realtime.clone())
    }

    pub async fn seed_user(&self, full_name: Option<&str>, business_name: Option<&str>) -> UserId {
        let user_id = UserId::new();
        self.memory
            .seed_profile(Profile {
                user_id,
                full_name: full_name.map(String::from),
                business_name: business_name.map(String::from),
                avatar_url: None,
            })
            .await;
        user_id
    }

    pub async fn conversation(&self, customer: UserId, provider: UserId) -> Conversation {
        self.directory
            .get_or_create(&RequestContext::new(customer), customer, provider)
            .await
            .unwrap()
    }

    /// Customer, provider, and their conversation. Neither has a profile.
    pub async fn conversation_pair(&self) -> (UserId, UserId, Conversation) {
        let customer = UserId::new();
        let provider = UserId::new();
        let conversation = self.conversation(customer, provider).await;
        (customer, provider, conversation)
    }
}

impl Deref for TestEnv {
    type Target = ChatServices;

    fn deref(&self) -> &ChatServices {
        &self.services
    }
}

/// Receive frames until one matches, failing after two seconds.
pub(crate) async fn expect_frame(
    rx: &mut mpsc::Receiver<OutboundMessage>,
    mut matches: impl FnMut(&OutboundMessage) -> bool,
) -> OutboundMessage {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let frame = rx.recv().await.expect("outbound channel closed");
            if matches(&frame) {
                return frame;
            }
        }
    })
    .await
    .expect("expected frame did not arrive")
}

/// Desktop notifier that records what it was asked to do.
#[derive(Debug)]
pub(crate) struct RecordingNotifier {
    permission: Mutex<NotificationPermission>,
    answer: Mutex<Option<NotificationPermission>>,
    requests: AtomicUsize,
    shown: Mutex<Vec<DesktopAlert>>,
}

impl RecordingNotifier {
    pub fn new(permission: NotificationPermission) -> Self {
        Self {
            permission: Mutex::new(permission),
            answer: Mutex::new(None),
            requests: AtomicUsize::new(0),
            shown: Mutex::new(Vec::new()),
        }
    }

    /// Permission the user picks when asked.
    pub fn answer_with(&self, permission: NotificationPermission) {
        *self.answer.lock().unwrap() = Some(permission);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn shown(&self) -> Vec<DesktopAlert> {
        self.shown.lock().unwrap().clone()
    }

    pub async fn wait_for_shown(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.shown.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("desktop alerts were not shown");
    }
}

#[async_trait]
impl DesktopNotifier for RecordingNotifier {
    async fn permission(&self) -> NotificationPermission {
        *self.permission.lock().unwrap()
    }

    async fn request_permission(&self) -> NotificationPermission {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut permission = self.permission.lock().unwrap();
        if let Some(answer) = *self.answer.lock().unwrap() {
            *permission = answer;
        }
        *permission
    }

    async fn show(&self, alert: &DesktopAlert) -> AppResult<()> {
        self.shown.lock().unwrap().push(alert.clone());
        Ok(())
    }
}
