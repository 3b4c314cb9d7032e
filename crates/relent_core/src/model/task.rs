use crate::error::AppError;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

pub const PLACEHOLDER_TITLE: &str = "Untitled Task";
pub const DEFAULT_REMINDER_INTERVAL_MINUTES: i64 = 60;
pub const DEFAULT_DEADLINE_OFFSET_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
    /// Minutes between consecutive reminders once the deadline has passed.
    pub reminder_interval: i64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub last_reminder_sent: Option<OffsetDateTime>,
    pub status: TaskStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Task {
    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    /// `None` when the interval is too large to represent as a duration.
    pub fn reminder_period(&self) -> Option<Duration> {
        self.reminder_interval.checked_mul(60).map(Duration::seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Done,
}

impl TaskStatus {
    pub fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Done,
            Self::Done => Self::Pending,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
        }
    }
}

/// Creation input. Omitted fields fall back to defaults when the task is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<OffsetDateTime>,
    pub reminder_interval: Option<i64>,
}

impl TaskDraft {
    pub fn titled<T: Into<String>>(title: T) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn into_task(self, id: String, now: OffsetDateTime) -> Result<Task, AppError> {
        let reminder_interval = match self.reminder_interval {
            Some(minutes) => validate_interval(minutes)?,
            None => DEFAULT_REMINDER_INTERVAL_MINUTES,
        };

        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(PLACEHOLDER_TITLE)
            .to_string();

        Ok(Task {
            id,
            title,
            description: self.description.unwrap_or_default(),
            deadline: self
                .deadline
                .unwrap_or(now + Duration::hours(DEFAULT_DEADLINE_OFFSET_HOURS)),
            reminder_interval,
            last_reminder_sent: None,
            status: TaskStatus::Pending,
            created_at: now,
        })
    }
}

/// Field edits. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<OffsetDateTime>,
    pub reminder_interval: Option<i64>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.deadline.is_none()
            && self.reminder_interval.is_none()
    }

    pub fn apply(&self, task: &mut Task) -> Result<(), AppError> {
        let title = match self.title.as_deref() {
            Some(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(AppError::validation("title is required"));
                }
                Some(trimmed.to_string())
            }
            None => None,
        };
        let reminder_interval = self.reminder_interval.map(validate_interval).transpose()?;

        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(minutes) = reminder_interval {
            task.reminder_interval = minutes;
        }
        Ok(())
    }
}

fn validate_interval(minutes: i64) -> Result<i64, AppError> {
    if minutes <= 0 {
        return Err(AppError::validation(
            "reminder interval must be a positive number of minutes",
        ));
    }
    Ok(minutes)
}

#[cfg(test)]
mod tests {
    use super::{PLACEHOLDER_TITLE, Task, TaskDraft, TaskPatch, TaskStatus};
    use time::Duration;
    use time::macros::datetime;

    fn sample() -> Task {
        TaskDraft::titled("file taxes")
            .into_task("task-1".into(), datetime!(2025-12-20 09:00 UTC))
            .unwrap()
    }

    #[test]
    fn draft_applies_defaults() {
        let now = datetime!(2025-12-20 09:00 UTC);
        let task = TaskDraft::default().into_task("task-1".into(), now).unwrap();

        assert_eq!(task.title, PLACEHOLDER_TITLE);
        assert_eq!(task.description, "");
        assert_eq!(task.deadline, now + Duration::hours(24));
        assert_eq!(task.reminder_interval, 60);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.created_at, now);
        assert!(task.last_reminder_sent.is_none());
    }

    #[test]
    fn draft_blank_title_uses_placeholder() {
        let task = TaskDraft::titled("   ")
            .into_task("task-1".into(), datetime!(2025-12-20 09:00 UTC))
            .unwrap();
        assert_eq!(task.title, PLACEHOLDER_TITLE);
    }

    #[test]
    fn draft_rejects_non_positive_interval() {
        for minutes in [0, -5] {
            let draft = TaskDraft {
                reminder_interval: Some(minutes),
                ..TaskDraft::default()
            };
            let err = draft
                .into_task("task-1".into(), datetime!(2025-12-20 09:00 UTC))
                .unwrap_err();
            assert_eq!(err.code(), "validation_error");
        }
    }

    #[test]
    fn patch_is_all_or_nothing() {
        let mut task = sample();
        let before = task.clone();
        let patch = TaskPatch {
            title: Some("renamed".into()),
            reminder_interval: Some(0),
            ..TaskPatch::default()
        };

        assert!(patch.apply(&mut task).is_err());
        assert_eq!(task, before);
    }

    #[test]
    fn patch_updates_selected_fields() {
        let mut task = sample();
        let patch = TaskPatch {
            description: Some("bring receipts".into()),
            reminder_interval: Some(15),
            ..TaskPatch::default()
        };

        patch.apply(&mut task).unwrap();
        assert_eq!(task.title, "file taxes");
        assert_eq!(task.description, "bring receipts");
        assert_eq!(task.reminder_interval, 15);
    }

    #[test]
    fn task_serializes_with_camel_case_keys() {
        let task = sample();
        let value = serde_json::to_value(&task).unwrap();

        assert_eq!(value["reminderInterval"], 60);
        assert_eq!(value["status"], "pending");
        assert_eq!(value["createdAt"], "2025-12-20T09:00:00Z");
        assert!(value.get("lastReminderSent").is_none());
    }

    #[test]
    fn status_toggles_both_ways() {
        assert_eq!(TaskStatus::Pending.toggled(), TaskStatus::Done);
        assert_eq!(TaskStatus::Done.toggled(), TaskStatus::Pending);
    }
}
