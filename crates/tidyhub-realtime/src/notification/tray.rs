//! Pending desktop alerts, coalesced per tag.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::notifier::DesktopAlert;

/// Alerts currently showing, at most one per tag.
///
/// A newer alert for the same conversation replaces the pending one instead
/// of stacking.
#[derive(Debug, Default)]
pub struct AlertTray {
    alerts: Mutex<HashMap<String, DesktopAlert>>,
}

impl AlertTray {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DesktopAlert>> {
        self.alerts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add an alert. Returns `true` if it replaced one with the same tag.
    pub fn push(&self, alert: DesktopAlert) -> bool {
        self.lock().insert(alert.tag.clone(), alert).is_some()
    }

    pub fn get(&self, tag: &str) -> Option<DesktopAlert> {
        self.lock().get(tag).cloned()
    }

    pub fn dismiss(&self, tag: &str) -> Option<DesktopAlert> {
        self.lock().remove(tag)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
