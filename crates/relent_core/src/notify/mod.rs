//! Best-effort alert delivery and the set of titles currently alerting.

use crate::error::AppError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxSink;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsSink;

pub const ALERT_SUMMARY: &str = "Relentless Reminder";
const DISABLE_ENV_VAR: &str = "RELENT_DISABLE_NOTIFICATIONS";

/// What a sink is shown for one firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub task_id: String,
    pub title: String,
}

impl Alert {
    pub fn new<I: Into<String>, T: Into<String>>(task_id: I, title: T) -> Self {
        Self {
            task_id: task_id.into(),
            title: title.into(),
        }
    }

    pub fn body(&self) -> String {
        format!("Task \"{}\" is overdue!", self.title)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Undetermined,
}

/// Platform alert capability.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, alert: &Alert) -> Result<(), AppError>;

    fn permission(&self) -> Permission {
        Permission::Granted
    }

    /// Prompts for permission. Only called while the permission is undetermined.
    fn request_permission(&self) -> Permission {
        self.permission()
    }
}

/// Sink for headless contexts.
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn deliver(&self, _alert: &Alert) -> Result<(), AppError> {
        Ok(())
    }

    fn permission(&self) -> Permission {
        Permission::Denied
    }
}

/// Chooses the platform sink, or [`NoopSink`] when disabled by env or config.
pub fn sink_from_env(enabled: bool) -> Arc<dyn NotificationSink> {
    if !enabled || std::env::var(DISABLE_ENV_VAR).is_ok() {
        return Arc::new(NoopSink);
    }

    match platform_sink() {
        Ok(sink) => sink,
        Err(err) => {
            debug!(error = %err, "platform notifications unavailable");
            Arc::new(NoopSink)
        }
    }
}

#[cfg(target_os = "linux")]
pub fn platform_sink() -> Result<Arc<dyn NotificationSink>, AppError> {
    Ok(Arc::new(LinuxSink))
}

#[cfg(windows)]
pub fn platform_sink() -> Result<Arc<dyn NotificationSink>, AppError> {
    Ok(Arc::new(WindowsSink))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_sink() -> Result<Arc<dyn NotificationSink>, AppError> {
    Err(AppError::delivery(
        "notifications are not supported on this platform",
    ))
}

const ACTION_PREFIX: &str = "show:";

pub fn activation_argument(task_id: &str) -> String {
    format!("{ACTION_PREFIX}{task_id}")
}

pub fn parse_activation_argument(argument: &str) -> Option<String> {
    argument
        .strip_prefix(ACTION_PREFIX)
        .map(|id| id.to_string())
}

/// Re-launches the current executable to show the task behind a clicked alert.
pub fn launch_show(task_id: &str) -> Result<(), AppError> {
    let exe = std::env::current_exe().map_err(|err| AppError::io(err.to_string()))?;
    std::process::Command::new(exe)
        .arg("show")
        .arg(task_id)
        .spawn()
        .map_err(|err| AppError::io(err.to_string()))?;
    Ok(())
}

/// Holds the Active Notification Set and hands firings to a sink.
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    permission: Mutex<Permission>,
    permission_requested: AtomicBool,
    active: Mutex<Vec<String>>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        let permission = sink.permission();
        Self {
            sink,
            permission: Mutex::new(permission),
            permission_requested: AtomicBool::new(false),
            active: Mutex::new(Vec::new()),
        }
    }

    pub fn headless() -> Self {
        Self::new(Arc::new(NoopSink))
    }

    pub fn permission(&self) -> Permission {
        self.permission
            .lock()
            .map(|permission| *permission)
            .unwrap_or(Permission::Denied)
    }

    /// Asks the sink once per session, and only while undetermined.
    pub fn request_permission_once(&self) -> Permission {
        if self.permission() != Permission::Undetermined
            || self.permission_requested.swap(true, Ordering::SeqCst)
        {
            return self.permission();
        }

        let granted = self.sink.request_permission();
        if let Ok(mut permission) = self.permission.lock() {
            *permission = granted;
        }
        granted
    }

    /// Marks the title as alerting and attempts delivery. Never fails.
    pub fn activate(&self, alert: Alert) {
        self.mark_active(&alert.title);
        self.deliver(alert);
    }

    pub(crate) fn mark_active(&self, title: &str) {
        if let Ok(mut active) = self.active.lock()
            && !active.iter().any(|existing| existing == title)
        {
            active.push(title.to_string());
        }
    }

    /// Fire-and-forget: runs on the blocking pool when inside a runtime.
    pub(crate) fn deliver(&self, alert: Alert) {
        if self.permission() != Permission::Granted {
            debug!(title = %alert.title, "delivery skipped without permission");
            return;
        }

        let sink = Arc::clone(&self.sink);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || deliver_logged(sink.as_ref(), &alert));
            }
            Err(_) => deliver_logged(sink.as_ref(), &alert),
        }
    }

    /// Removes the title from the alerting set. Unknown titles are ignored.
    pub fn clear(&self, title: &str) {
        if let Ok(mut active) = self.active.lock() {
            active.retain(|existing| existing != title);
        }
    }

    /// Alerting titles in first-activation order.
    pub fn active(&self) -> Vec<String> {
        self.active
            .lock()
            .map(|active| active.clone())
            .unwrap_or_default()
    }

    pub fn is_active(&self, title: &str) -> bool {
        self.active
            .lock()
            .map(|active| active.iter().any(|existing| existing == title))
            .unwrap_or(false)
    }
}

fn deliver_logged(sink: &dyn NotificationSink, alert: &Alert) {
    if let Err(err) = sink.deliver(alert) {
        warn!(task_id = %alert.task_id, error = %err, "reminder delivery failed");
    }
}
