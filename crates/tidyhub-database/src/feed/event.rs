//! Change event types and row filters.

use std::fmt;

use tidyhub_core::types::{ConversationId, UserId};
use tidyhub_entity::conversation::Conversation;
use tidyhub_entity::message::Message;
use tidyhub_entity::notification::Notification;

/// Tables that publish change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// `conversations`
    Conversations,
    /// `messages`
    Messages,
    /// `notifications`
    Notifications,
}

impl Table {
    /// Table name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversations => "conversations",
            Self::Messages => "messages",
            Self::Notifications => "notifications",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A row was created.
    Insert,
    /// A row was modified.
    Update,
    /// A row was removed.
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        })
    }
}

/// A row image carried by a change event.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// A conversation row.
    Conversation(Conversation),
    /// A message row.
    Message(Message),
    /// A notification row.
    Notification(Notification),
}

impl Row {
    /// The table this row belongs to.
    pub fn table(&self) -> Table {
        match self {
            Self::Conversation(_) => Table::Conversations,
            Self::Message(_) => Table::Messages,
            Self::Notification(_) => Table::Notifications,
        }
    }
}

/// One row-level change.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// What happened.
    pub kind: ChangeKind,
    /// Row image after the change (absent for deletes).
    pub new: Option<Row>,
    /// Row image before the change (absent for inserts).
    pub old: Option<Row>,
}

impl ChangeEvent {
    /// An insert of `row`.
    pub fn insert(row: Row) -> Self {
        Self {
            kind: ChangeKind::Insert,
            new: Some(row),
            old: None,
        }
    }

    /// An update from `old` to `new`.
    pub fn update(old: Option<Row>, new: Row) -> Self {
        Self {
            kind: ChangeKind::Update,
            new: Some(new),
            old,
        }
    }

    /// A delete of `old`.
    pub fn delete(old: Row) -> Self {
        Self {
            kind: ChangeKind::Delete,
            new: None,
            old: Some(old),
        }
    }

    /// The row image filters are evaluated against.
    pub fn row(&self) -> Option<&Row> {
        self.new.as_ref().or(self.old.as_ref())
    }

    /// The table this event concerns.
    pub fn table(&self) -> Table {
        self.row().map(Row::table).unwrap_or(Table::Messages)
    }

    /// The message row, if this is a message event.
    pub fn message(&self) -> Option<&Message> {
        match self.row() {
            Some(Row::Message(m)) => Some(m),
            _ => None,
        }
    }

    /// The notification row, if this is a notification event.
    pub fn notification(&self) -> Option<&Notification> {
        match self.row() {
            Some(Row::Notification(n)) => Some(n),
            _ => None,
        }
    }

    /// The conversation row, if this is a conversation event.
    pub fn conversation(&self) -> Option<&Conversation> {
        match self.row() {
            Some(Row::Conversation(c)) => Some(c),
            _ => None,
        }
    }
}

/// Server-side subscription filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter {
    /// Every row of the table.
    All,
    /// Messages of one conversation, or the conversation row itself.
    Conversation(ConversationId),
    /// Notifications addressed to one user.
    Recipient(UserId),
    /// Conversations one user participates in.
    Participant(UserId),
}

impl RowFilter {
    /// Check whether `event` passes this filter.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        let Some(row) = event.row() else {
            return false;
        };
        match (self, row) {
            (Self::All, _) => true,
            (Self::Conversation(id), Row::Message(m)) => m.conversation_id == *id,
            (Self::Conversation(id), Row::Conversation(c)) => c.id == *id,
            (Self::Recipient(user), Row::Notification(n)) => n.user_id == *user,
            (Self::Participant(user), Row::Conversation(c)) => c.has_participant(*user),
            _ => false,
        }
    }
}
