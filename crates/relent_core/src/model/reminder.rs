use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Notification sink tag recorded with each firing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Telegram,
    Web,
}

impl Channel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Telegram => "telegram",
            Self::Web => "web",
        }
    }
}

/// One committed firing. Entries are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderEntry {
    pub id: String,
    /// Weak reference: the task may have been deleted since.
    pub task_id: String,
    /// Title as it was when the reminder fired.
    pub task_title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(alias = "type")]
    pub channel: Channel,
}
