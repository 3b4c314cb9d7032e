use crate::error::AppError;
use crate::notify::{
    ALERT_SUMMARY, Alert, NotificationSink, activation_argument, launch_show,
    parse_activation_argument,
};
use tauri_winrt_notification::Toast;

/// Toast notifications through the WinRT notification API.
pub struct WindowsSink;

impl NotificationSink for WindowsSink {
    fn deliver(&self, alert: &Alert) -> Result<(), AppError> {
        let task_id = alert.task_id.clone();
        let action = activation_argument(&alert.task_id);

        Toast::new(Toast::POWERSHELL_APP_ID)
            .title(ALERT_SUMMARY)
            .text1(&alert.body())
            .add_button("Open", &action)
            .on_activated(move |args| {
                let target = args
                    .as_deref()
                    .and_then(parse_activation_argument)
                    .unwrap_or_else(|| task_id.clone());
                let _ = launch_show(&target);
                Ok(())
            })
            .show()
            .map_err(|err| AppError::delivery(err.to_string()))?;
        Ok(())
    }
}
