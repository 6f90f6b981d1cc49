//! Filtered feed subscriptions.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

use super::event::{ChangeEvent, RowFilter, Table};

/// A live subscription to one table's changes.
///
/// Dropping the subscription releases it.
#[derive(Debug)]
pub struct FeedSubscription {
    table: Table,
    filter: RowFilter,
    rx: broadcast::Receiver<Arc<ChangeEvent>>,
}

impl FeedSubscription {
    pub(crate) fn new(
        table: Table,
        filter: RowFilter,
        rx: broadcast::Receiver<Arc<ChangeEvent>>,
    ) -> Self {
        Self { table, filter, rx }
    }

    /// The subscribed table.
    pub fn table(&self) -> Table {
        self.table
    }

    /// The active filter.
    pub fn filter(&self) -> RowFilter {
        self.filter
    }

    /// Wait for the next matching event. Returns `None` once the feed is gone.
    ///
    /// A lagging subscriber skips the events it missed and keeps going.
    pub async fn recv(&mut self) -> Option<Arc<ChangeEvent>> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(table = %self.table, skipped, "Feed subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Return the next already-buffered matching event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<ChangeEvent>> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(table = %self.table, skipped, "Feed subscriber lagged, events dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}
