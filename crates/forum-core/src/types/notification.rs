//! Notifications: append-only messages addressed to a user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: EntityId,
    pub user_id: EntityId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAdd {
    pub user_id: EntityId,
    pub text: String,
}

impl NotificationAdd {
    pub fn new(user_id: EntityId, text: impl Into<String>) -> Self {
        NotificationAdd {
            user_id,
            text: text.into(),
        }
    }
}
