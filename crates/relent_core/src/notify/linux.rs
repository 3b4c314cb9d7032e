use crate::error::AppError;
use crate::notify::{ALERT_SUMMARY, Alert, NotificationSink, activation_argument, launch_show};
use notify_rust::Notification;

/// Desktop notifications over the freedesktop notification service.
pub struct LinuxSink;

impl NotificationSink for LinuxSink {
    fn deliver(&self, alert: &Alert) -> Result<(), AppError> {
        let action = activation_argument(&alert.task_id);
        let mut notification = Notification::new();
        notification.summary(ALERT_SUMMARY);
        notification.body(&alert.body());
        notification.action(&action, "Open");

        let handle = notification
            .show()
            .map_err(|err| AppError::delivery(err.to_string()))?;

        let task_id = alert.task_id.clone();
        std::thread::spawn(move || {
            let _ = handle.wait_for_action(|selected| {
                if selected == action || selected == "default" {
                    let _ = launch_show(&task_id);
                }
            });
        });

        Ok(())
    }
}
