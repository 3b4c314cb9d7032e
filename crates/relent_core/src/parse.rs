//! Boundary to the free-text task parser.
//!
//! The parser itself is an external service; this module fixes its reply
//! shape and guarantees that a failed parse never disturbs form input.

use crate::error::AppError;
use crate::model::TaskDraft;
use serde::Deserialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

/// Fields extracted from free text. `deadline` is an ISO-8601 string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub deadline: String,
    pub reminder_interval: i64,
}

impl ParsedTask {
    /// Reads the parser's JSON reply.
    pub fn from_json(reply: &str) -> Result<Self, AppError> {
        serde_json::from_str(reply).map_err(|err| AppError::parse(err.to_string()))
    }
}

pub trait TaskParser {
    fn parse(&self, text: &str) -> Result<ParsedTask, AppError>;
}

impl<F> TaskParser for F
where
    F: Fn(&str) -> Result<ParsedTask, AppError>,
{
    fn parse(&self, text: &str) -> Result<ParsedTask, AppError> {
        self(text)
    }
}

/// In-progress creation input, as typed or as filled in by the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    /// RFC 3339 timestamp; blank means the default deadline.
    pub deadline: String,
    /// Blank means the default interval.
    pub reminder_interval: String,
}

impl TaskForm {
    /// Replaces every field with the parser's result. On failure the form is untouched.
    pub fn fill_from(&mut self, parser: &dyn TaskParser, text: &str) -> Result<(), AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::parse("nothing to parse"));
        }

        let parsed = parser.parse(text).map_err(|err| {
            warn!(error = %err, "task parsing failed");
            match err {
                AppError::Parse(_) => err,
                other => AppError::parse(other.message().to_string()),
            }
        })?;

        *self = Self {
            title: parsed.title,
            description: parsed.description,
            deadline: parsed.deadline,
            reminder_interval: parsed.reminder_interval.to_string(),
        };
        Ok(())
    }

    pub fn to_draft(&self) -> Result<TaskDraft, AppError> {
        let deadline = match self.deadline.trim() {
            "" => None,
            value => Some(
                OffsetDateTime::parse(value, &Rfc3339)
                    .map_err(|_| AppError::validation("deadline must be RFC3339"))?,
            ),
        };

        let reminder_interval = match self.reminder_interval.trim() {
            "" => None,
            value => Some(value.parse::<i64>().map_err(|_| {
                AppError::validation("reminder interval must be a whole number of minutes")
            })?),
        };
        if reminder_interval.is_some_and(|minutes| minutes <= 0) {
            return Err(AppError::validation(
                "reminder interval must be a positive number of minutes",
            ));
        }

        Ok(TaskDraft {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            deadline,
            reminder_interval,
        })
    }
}
