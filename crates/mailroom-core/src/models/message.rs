//! Message (mail record) domain model.
//!
//! Messages are tagged records owned by exactly one user; there is no
//! transport behind them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::not_blank;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Folder {
    #[default]
    Inbox,
    Sent,
    Drafts,
    Spam,
    Trash,
}

impl Folder {
    pub const ALL: [Folder; 5] = [
        Folder::Inbox,
        Folder::Sent,
        Folder::Drafts,
        Folder::Spam,
        Folder::Trash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Folder::Inbox => "inbox",
            Folder::Sent => "sent",
            Folder::Drafts => "drafts",
            Folder::Spam => "spam",
            Folder::Trash => "trash",
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Folder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Folder::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown folder: {s}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    /// Owning user. Visibility is restricted to this user.
    pub user_id: Uuid,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub is_read: bool,
    pub is_starred: bool,
    pub folder: Folder,
    pub created_at: DateTime<Utc>,
}

/// Body of a "send" action.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessage {
    #[validate(email(message = "must be a valid email address"))]
    pub recipient: String,
    #[validate(custom(function = "not_blank"))]
    pub subject: String,
    pub body: String,
}

/// Fully-resolved insert, after the owner, sender and folder have been
/// assigned by the handler.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub user_id: Uuid,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub folder: Folder,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessageStatus {
    pub is_read: Option<bool>,
    pub is_starred: Option<bool>,
}

impl MessageStatus {
    pub fn is_empty(&self) -> bool {
        self.is_read.is_none() && self.is_starred.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_round_trips_through_str() {
        for folder in Folder::ALL {
            assert_eq!(folder.as_str().parse::<Folder>().unwrap(), folder);
        }
        assert!("archive".parse::<Folder>().is_err());
    }

    #[test]
    fn default_folder_is_inbox() {
        assert_eq!(Folder::default(), Folder::Inbox);
    }
}
