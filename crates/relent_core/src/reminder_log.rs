use crate::model::ReminderEntry;

/// Maximum number of firings retained.
pub const LOG_RETENTION: usize = 50;

/// Newest-first, bounded record of firings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderLog {
    entries: Vec<ReminderEntry>,
}

impl ReminderLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a persisted log, enforcing the retention cap.
    pub fn from_entries(mut entries: Vec<ReminderEntry>) -> Self {
        entries.truncate(LOG_RETENTION);
        Self { entries }
    }

    /// Prepends one tick's batch, keeping its internal order, then truncates to the cap.
    pub fn append(&mut self, batch: Vec<ReminderEntry>) {
        if batch.is_empty() {
            return;
        }
        let mut next = batch;
        next.extend(std::mem::take(&mut self.entries));
        next.truncate(LOG_RETENTION);
        self.entries = next;
    }

    pub fn entries(&self) -> &[ReminderEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
