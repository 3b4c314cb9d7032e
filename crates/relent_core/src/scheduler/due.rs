use crate::model::Task;
use time::{Duration, OffsetDateTime};

/// Whether `task` should fire at `now`.
///
/// The first reminder is measured from the deadline with no grace period. Every
/// later one waits a full interval after the previous firing.
pub fn is_due(task: &Task, now: OffsetDateTime) -> bool {
    if !task.is_pending() || now < task.deadline {
        return false;
    }

    match reminder_anchor(task) {
        Some((anchor, wait)) => now - anchor >= wait,
        None => false,
    }
}

/// Earliest instant the task can fire next. `None` once it is done, or when the
/// next reminder lies beyond the representable calendar.
pub fn next_reminder_at(task: &Task) -> Option<OffsetDateTime> {
    if !task.is_pending() {
        return None;
    }

    let (anchor, wait) = reminder_anchor(task)?;
    anchor
        .checked_add(wait)
        .map(|next| next.max(task.deadline))
}

fn reminder_anchor(task: &Task) -> Option<(OffsetDateTime, Duration)> {
    match task.last_reminder_sent {
        Some(last) => task.reminder_period().map(|wait| (last, wait)),
        None => Some((task.deadline, Duration::ZERO)),
    }
}
