//! Which surface the client is looking at.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Client surface. Desktop alerts are suppressed on the messages surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    #[default]
    Other,
    Messages,
}

/// Shared, observable current surface of one session.
#[derive(Debug, Clone)]
pub struct ViewTracker {
    current: Arc<watch::Sender<Surface>>,
}

impl ViewTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Surface::default());
        Self {
            current: Arc::new(tx),
        }
    }

    pub fn set(&self, surface: Surface) {
        self.current.send_replace(surface);
    }

    pub fn current(&self) -> Surface {
        *self.current.borrow()
    }

    pub fn is_on_messages(&self) -> bool {
        self.current() == Surface::Messages
    }

    pub fn subscribe(&self) -> watch::Receiver<Surface> {
        self.current.subscribe()
    }
}

impl Default for ViewTracker {
    fn default() -> Self {
        Self::new()
    }
}
