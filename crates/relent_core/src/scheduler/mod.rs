//! Relentless reminder scheduling.
//!
//! A tick scans every pending task, fires the ones whose reminder is due and
//! commits the whole batch (timestamps, log entries, alerts) in one step.

mod due;
mod runner;

pub use due::{is_due, next_reminder_at};
pub use runner::{Firing, Scheduler, SchedulerHandle, TickReport};
