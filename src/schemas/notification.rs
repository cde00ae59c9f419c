use serde::{Deserialize, Serialize};

use crate::api::pagination::default_limit;
use crate::core::time::format_primitive;
use crate::db::models::Notification;

#[derive(Debug, Deserialize)]
pub(crate) struct NotificationListQuery {
    #[serde(default)]
    pub(crate) unread_only: bool,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct NotificationResponse {
    pub(crate) id: i64,
    pub(crate) message: String,
    pub(crate) is_read: bool,
    pub(crate) created_at: String,
}

impl NotificationResponse {
    pub(crate) fn from_db(notification: Notification) -> Self {
        Self {
            id: notification.id,
            message: notification.message,
            is_read: notification.is_read,
            created_at: format_primitive(notification.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MarkAllReadResponse {
    pub(crate) updated: u64,
}
