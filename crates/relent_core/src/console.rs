//! Short slash-command console over the mutation API.

use crate::error::AppError;
use crate::model::TaskDraft;
use crate::task_api::Tracker;

pub const WELCOME: &str = "Relent Bot v1.0 connected. Welcome. Use /help for commands.";
pub const HELP: &str = "Available commands:\n/add [title] - Fast add task\n/list - Show pending tasks\n/done [id] - Mark task as complete\n/clear - Clear screen";
pub const UNKNOWN_COMMAND: &str = "Unknown command. Use /help.";
pub const ADD_USAGE: &str = "Error: Please specify a task title. Usage: /add My Task Name";
pub const DONE_USAGE: &str = "Error: Specify a partial ID from /list. Usage: /done [id]";
pub const IDLE: &str = "All objectives cleared. System idle.";
const CLEARED: &str = "Terminal cleared.";
const ADDED_DESCRIPTION: &str = "Added via Telegram Bot";
const SHORT_ID_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub speaker: Speaker,
    pub text: String,
}

pub struct Console {
    tracker: Tracker,
    transcript: Vec<Message>,
}

impl Console {
    pub fn new(tracker: Tracker) -> Self {
        Self {
            tracker,
            transcript: vec![Message {
                speaker: Speaker::Bot,
                text: WELCOME.to_string(),
            }],
        }
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Handles one input line. Returns the reply, or `None` when nothing is printed.
    pub fn submit(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        self.transcript.push(Message {
            speaker: Speaker::User,
            text: line.to_string(),
        });

        let reply = self.handle(line);
        if let Some(text) = &reply {
            self.transcript.push(Message {
                speaker: Speaker::Bot,
                text: text.clone(),
            });
        }
        reply
    }

    fn handle(&mut self, line: &str) -> Option<String> {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        let reply = match command.to_lowercase().as_str() {
            "/help" => HELP.to_string(),
            "/add" => self.add(rest),
            "/list" => self.list(),
            "/done" => self.done(rest),
            "/clear" => {
                self.transcript = vec![Message {
                    speaker: Speaker::Bot,
                    text: CLEARED.to_string(),
                }];
                return None;
            }
            _ => UNKNOWN_COMMAND.to_string(),
        };
        Some(reply)
    }

    fn add(&self, title: &str) -> String {
        if title.is_empty() {
            return ADD_USAGE.to_string();
        }

        let draft = TaskDraft {
            description: Some(ADDED_DESCRIPTION.to_string()),
            reminder_interval: Some(60),
            ..TaskDraft::titled(title)
        };
        match self.tracker.create(draft) {
            Ok(task) => format!(
                "Objective Created: \"{}\"\nDeadline set: +24h\nInterval: {}m",
                task.title, task.reminder_interval
            ),
            Err(err) => format!("Error: {}", err.message()),
        }
    }

    fn list(&self) -> String {
        let pending = self.tracker.pending();
        if pending.is_empty() {
            return IDLE.to_string();
        }

        let lines: Vec<String> = pending
            .iter()
            .enumerate()
            .map(|(index, task)| {
                let short: String = task.id.chars().take(SHORT_ID_LEN).collect();
                format!("{}. [{}] {}", index + 1, short, task.title)
            })
            .collect();
        format!("Active Threads:\n{}", lines.join("\n"))
    }

    fn done(&self, args: &str) -> String {
        let Some(prefix) = args.split_whitespace().next() else {
            return DONE_USAGE.to_string();
        };

        let result = self
            .tracker
            .find_by_prefix(prefix)
            .and_then(|task| self.tracker.toggle_status(&task.id));
        match result {
            Ok(task) => format!(
                "Mission Success: \"{}\" marked as {}. {}",
                task.title,
                task.status.label().to_uppercase(),
                if task.is_pending() {
                    "Reminders resumed."
                } else {
                    "Reminders terminated."
                }
            ),
            Err(AppError::NotFound(_)) => format!("Error: ID \"{prefix}\" not found."),
            Err(err) => format!("Error: {}", err.message()),
        }
    }
}
