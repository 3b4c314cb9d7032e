//! Scheduler tick and background loop.

use crate::model::{Channel, ReminderEntry, Task};
use crate::notify::Alert;
use crate::scheduler::due::is_due;
use crate::state::Shared;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// One committed reminder: the task as stamped and the log entry it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firing {
    pub task: Task,
    pub entry: ReminderEntry,
}

/// Outcome of a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub at: OffsetDateTime,
    /// Firings in task evaluation order.
    pub firings: Vec<Firing>,
    /// The tick did not run because another one was in flight.
    pub skipped: bool,
}

impl TickReport {
    fn idle(at: OffsetDateTime) -> Self {
        Self {
            at,
            firings: Vec::new(),
            skipped: false,
        }
    }

    fn skipped(at: OffsetDateTime) -> Self {
        Self {
            skipped: true,
            ..Self::idle(at)
        }
    }

    pub fn fired(&self) -> usize {
        self.firings.len()
    }
}

/// Periodic evaluator over the shared task store. Every scheduler built from the
/// same tracker shares one in-flight guard, so ticks never overlap.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
    channel: Channel,
}

impl Scheduler {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            channel: Channel::default(),
        }
    }

    /// Channel tag recorded on log entries.
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    /// Runs one tick against the wall clock.
    pub fn tick(&self) -> TickReport {
        self.tick_at(OffsetDateTime::now_utc())
    }

    /// Runs one tick as of `now`. Returns a skipped report if a tick is already running.
    pub fn tick_at(&self, now: OffsetDateTime) -> TickReport {
        let Some(_guard) = InFlight::acquire(&self.shared.tick_in_flight) else {
            debug!("tick skipped, previous tick still running");
            return TickReport::skipped(now);
        };
        self.run_tick(now)
    }

    fn run_tick(&self, now: OffsetDateTime) -> TickReport {
        let mut state = self.shared.lock();
        let mut next = state.tasks.clone();

        let mut firings = Vec::new();
        for task in next.tasks_mut() {
            if !task.is_pending() {
                continue;
            }
            if task.reminder_interval <= 0 {
                warn!(
                    task_id = %task.id,
                    interval = task.reminder_interval,
                    "skipping task with invalid reminder interval"
                );
                continue;
            }
            if !is_due(task, now) {
                continue;
            }

            task.last_reminder_sent = Some(now);
            let entry = ReminderEntry {
                id: Uuid::new_v4().to_string(),
                task_id: task.id.clone(),
                task_title: task.title.clone(),
                timestamp: now,
                channel: self.channel,
            };
            debug!(task_id = %task.id, title = %task.title, "reminder due");
            firings.push(Firing {
                task: task.clone(),
                entry,
            });
        }

        if firings.is_empty() {
            return TickReport::idle(now);
        }

        let mut log = state.log.clone();
        log.append(firings.iter().map(|firing| firing.entry.clone()).collect());

        if let Err(err) = self.shared.persistence.save_tasks(next.list()) {
            error!(error = %err, "failed to persist tasks after tick");
        }
        if let Err(err) = self.shared.persistence.save_reminders(log.entries()) {
            error!(error = %err, "failed to persist reminder log after tick");
        }
        state.tasks = next;
        state.log = log;

        for firing in &firings {
            self.shared.notifier.mark_active(&firing.entry.task_title);
        }
        drop(state);

        for firing in &firings {
            self.shared
                .notifier
                .deliver(Alert::new(&firing.task.id, &firing.task.title));
        }

        info!(fired = firings.len(), at = %now, "reminders fired");
        TickReport {
            at: now,
            firings,
            skipped: false,
        }
    }

    /// Spawns the tick loop on the current tokio runtime.
    pub fn start(self, period: Duration) -> SchedulerHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let join = tokio::spawn(async move {
            info!(period_ms = period.as_millis() as u64, "reminder scheduler started");
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let scheduler = self.clone();
                        match tokio::task::spawn_blocking(move || scheduler.tick()).await {
                            Ok(report) if report.skipped => debug!("tick skipped"),
                            Ok(_) => {}
                            Err(err) => error!(error = %err, "scheduler tick aborted"),
                        }
                    }
                }
            }

            info!("reminder scheduler stopped");
        });

        SchedulerHandle { cancel, join }
    }
}

/// Control for a running scheduler loop.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Refuses further ticks. A tick already running completes first.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for the loop to exit.
    pub async fn join(self) {
        if let Err(err) = self.join.await {
            error!(error = %err, "scheduler loop ended abnormally");
        }
    }

    pub async fn shutdown(self) {
        self.stop();
        self.join().await;
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::InFlight;
    use crate::model::{Channel, TaskDraft, TaskPatch, TaskStatus};
    use crate::notify::Notifier;
    use crate::notify::testing::RecordingSink;
    use crate::reminder_log::LOG_RETENTION;
    use crate::storage::{MemoryStore, Persistence};
    use crate::task_api::Tracker;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use time::macros::datetime;
    use time::{Duration, OffsetDateTime};

    const NOW: OffsetDateTime = datetime!(2025-12-20 09:00 UTC);

    struct Fixture {
        tracker: Tracker,
        store: Arc<MemoryStore>,
        sink: Arc<RecordingSink>,
    }

    fn fixture_with(sink: RecordingSink) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(sink);
        let tracker = Tracker::open(
            Persistence::new(Arc::clone(&store)),
            Notifier::new(sink.clone()),
        )
        .unwrap();
        Fixture {
            tracker,
            store,
            sink,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingSink::granted())
    }

    fn due_draft(title: &str, deadline: OffsetDateTime, interval: i64) -> TaskDraft {
        TaskDraft {
            title: Some(title.into()),
            deadline: Some(deadline),
            reminder_interval: Some(interval),
            ..TaskDraft::default()
        }
    }

    #[test]
    fn relentless_cadence_follows_last_firing() {
        let fx = fixture();
        let task = fx
            .tracker
            .create_at(due_draft("report", NOW, 60), NOW - Duration::hours(1))
            .unwrap();
        let scheduler = fx.tracker.scheduler();

        let first = scheduler.tick_at(NOW);
        assert_eq!(first.fired(), 1);
        assert_eq!(fx.tracker.get(&task.id).unwrap().last_reminder_sent, Some(NOW));
        assert_eq!(fx.tracker.reminder_log().len(), 1);

        let quiet = scheduler.tick_at(NOW + Duration::minutes(30));
        assert_eq!(quiet.fired(), 0);
        assert_eq!(fx.tracker.reminder_log().len(), 1);

        let again_at = NOW + Duration::minutes(61);
        let second = scheduler.tick_at(again_at);
        assert_eq!(second.fired(), 1);

        let log = fx.tracker.reminder_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].timestamp, again_at);
        assert_eq!(
            fx.tracker.get(&task.id).unwrap().last_reminder_sent,
            Some(again_at)
        );
    }

    #[test]
    fn firing_records_matching_log_entry() {
        let fx = fixture();
        let task = fx
            .tracker
            .create_at(due_draft("report", NOW, 60), NOW - Duration::hours(1))
            .unwrap();

        let report = fx.tracker.scheduler().with_channel(Channel::Web).tick_at(NOW);

        let firing = &report.firings[0];
        assert_eq!(firing.task.last_reminder_sent, Some(NOW));
        assert_eq!(firing.entry.task_id, task.id);
        assert_eq!(firing.entry.task_title, "report");
        assert_eq!(firing.entry.timestamp, NOW);
        assert_eq!(firing.entry.channel, Channel::Web);
        assert_eq!(fx.tracker.reminder_log(), vec![firing.entry.clone()]);
    }

    #[test]
    fn future_deadline_never_fires() {
        let fx = fixture();
        fx.tracker
            .create_at(due_draft("later", NOW + Duration::hours(24), 1), NOW)
            .unwrap();
        let scheduler = fx.tracker.scheduler();

        for minutes in [0, 1, 60, 600, 24 * 60 - 1] {
            assert_eq!(scheduler.tick_at(NOW + Duration::minutes(minutes)).fired(), 0);
        }
        assert!(fx.tracker.reminder_log().is_empty());
    }

    #[test]
    fn idle_tick_does_not_write_store() {
        let fx = fixture();
        fx.tracker
            .create_at(due_draft("later", NOW + Duration::hours(1), 5), NOW)
            .unwrap();
        let writes = fx.store.write_count();

        let report = fx.tracker.scheduler().tick_at(NOW);

        assert_eq!(report.fired(), 0);
        assert_eq!(fx.store.write_count(), writes);
    }

    #[test]
    fn firing_tick_writes_each_collection_once() {
        let fx = fixture();
        for n in 0..3 {
            fx.tracker
                .create_at(due_draft(&format!("t{n}"), NOW, 5), NOW)
                .unwrap();
        }
        let writes = fx.store.write_count();

        fx.tracker.scheduler().tick_at(NOW);

        assert_eq!(fx.store.write_count(), writes + 2);
    }

    #[test]
    fn sixty_overdue_tasks_fire_once_each_and_log_keeps_newest_fifty() {
        let fx = fixture();
        for n in 0..60 {
            fx.tracker
                .create_at(due_draft(&format!("task {n}"), NOW, 60), NOW)
                .unwrap();
        }

        let report = fx.tracker.scheduler().tick_at(NOW);
        assert_eq!(report.fired(), 60);

        let mut ids: Vec<&str> = report.firings.iter().map(|f| f.task.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 60);

        let log = fx.tracker.reminder_log();
        assert_eq!(log.len(), LOG_RETENTION);
        let expected: Vec<&str> = report.firings[..LOG_RETENTION]
            .iter()
            .map(|f| f.entry.id.as_str())
            .collect();
        let retained: Vec<&str> = log.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(retained, expected);
    }

    #[test]
    fn toggled_done_between_ticks_stops_reminders() {
        let fx = fixture();
        let task = fx
            .tracker
            .create_at(due_draft("report", NOW, 10), NOW)
            .unwrap();
        let scheduler = fx.tracker.scheduler();
        assert_eq!(scheduler.tick_at(NOW).fired(), 1);
        assert!(fx.tracker.notifier().is_active("report"));

        let toggled = fx.tracker.toggle_status(&task.id).unwrap();
        assert_eq!(toggled.status, TaskStatus::Done);
        assert!(!fx.tracker.notifier().is_active("report"));

        let report = scheduler.tick_at(NOW + Duration::hours(5));
        assert_eq!(report.fired(), 0);
        assert_eq!(fx.tracker.reminder_log().len(), 1);
    }

    #[test]
    fn later_ticks_log_newer_entries_first() {
        let fx = fixture();
        fx.tracker.create_at(due_draft("a", NOW, 1), NOW).unwrap();
        let scheduler = fx.tracker.scheduler();

        scheduler.tick_at(NOW);
        scheduler.tick_at(NOW + Duration::minutes(1));
        scheduler.tick_at(NOW + Duration::minutes(2));

        let stamps: Vec<OffsetDateTime> =
            fx.tracker.reminder_log().iter().map(|e| e.timestamp).collect();
        assert_eq!(
            stamps,
            vec![
                NOW + Duration::minutes(2),
                NOW + Duration::minutes(1),
                NOW
            ]
        );
    }

    #[test]
    fn delivery_failure_does_not_block_commit() {
        let fx = fixture_with(RecordingSink::failing());
        let task = fx.tracker.create_at(due_draft("report", NOW, 60), NOW).unwrap();

        let report = fx.tracker.scheduler().tick_at(NOW);

        assert_eq!(report.fired(), 1);
        assert_eq!(fx.tracker.get(&task.id).unwrap().last_reminder_sent, Some(NOW));
        assert_eq!(fx.tracker.reminder_log().len(), 1);
        assert!(fx.tracker.notifier().is_active("report"));
    }

    #[test]
    fn alerts_are_delivered_after_commit() {
        let fx = fixture();
        fx.tracker.create_at(due_draft("one", NOW, 60), NOW).unwrap();
        fx.tracker.create_at(due_draft("two", NOW, 60), NOW).unwrap();

        fx.tracker.scheduler().tick_at(NOW);

        assert_eq!(fx.sink.titles(), vec!["two", "one"]);
        assert_eq!(fx.tracker.active_notifications(), vec!["two", "one"]);
    }

    #[test]
    fn invalid_task_is_isolated_from_rest_of_tick() {
        let fx = fixture();
        let broken = fx.tracker.create_at(due_draft("broken", NOW, 5), NOW).unwrap();
        fx.tracker.create_at(due_draft("fine", NOW, 5), NOW).unwrap();
        {
            let mut state = fx.tracker.shared().lock();
            state
                .tasks
                .tasks_mut()
                .iter_mut()
                .filter(|task| task.id == broken.id)
                .for_each(|task| task.reminder_interval = 0);
        }

        let report = fx.tracker.scheduler().tick_at(NOW);

        assert_eq!(report.fired(), 1);
        assert_eq!(report.firings[0].task.title, "fine");
    }

    #[test]
    fn oversized_interval_does_not_stall_other_tasks() {
        let fx = fixture();
        let normal = fx.tracker.create_at(due_draft("normal", NOW, 1), NOW).unwrap();
        let huge = fx
            .tracker
            .create_at(due_draft("huge", NOW, i64::MAX), NOW)
            .unwrap();
        let scheduler = fx.tracker.scheduler();

        assert_eq!(scheduler.tick_at(NOW).fired(), 2);

        let later = NOW + Duration::minutes(5);
        let report = scheduler.tick_at(later);

        assert_eq!(report.fired(), 1);
        assert_eq!(report.firings[0].task.id, normal.id);
        assert_eq!(
            fx.tracker.get(&normal.id).unwrap().last_reminder_sent,
            Some(later)
        );
        assert_eq!(fx.tracker.get(&huge.id).unwrap().last_reminder_sent, Some(NOW));

        let log = fx.tracker.reminder_log();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].task_id, normal.id);
        assert_eq!(log[0].timestamp, later);
    }

    #[test]
    fn renamed_task_keeps_old_title_in_history() {
        let fx = fixture();
        let task = fx.tracker.create_at(due_draft("draft", NOW, 60), NOW).unwrap();
        fx.tracker.scheduler().tick_at(NOW);

        fx.tracker
            .update(
                &task.id,
                &TaskPatch {
                    title: Some("final".into()),
                    ..TaskPatch::default()
                },
            )
            .unwrap();
        fx.tracker.delete(&task.id).unwrap();

        let log = fx.tracker.reminder_log();
        assert_eq!(log[0].task_title, "draft");
        assert_eq!(log[0].task_id, task.id);
    }

    #[test]
    fn overlapping_tick_is_skipped() {
        let fx = fixture();
        fx.tracker.create_at(due_draft("report", NOW, 60), NOW).unwrap();
        let scheduler = fx.tracker.scheduler();
        let held = InFlight::acquire(&scheduler.shared.tick_in_flight).unwrap();

        let report = fx.tracker.scheduler().tick_at(NOW);
        assert!(report.skipped);
        assert_eq!(report.fired(), 0);

        drop(held);
        assert_eq!(scheduler.tick_at(NOW).fired(), 1);
    }

    #[test]
    fn in_flight_guard_releases_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _guard = InFlight::acquire(&flag).unwrap();
            assert!(InFlight::acquire(&flag).is_none());
        }
        assert!(InFlight::acquire(&flag).is_some());
    }

    #[tokio::test]
    async fn background_loop_fires_and_stops() {
        let fx = fixture();
        fx.tracker
            .create_at(due_draft("report", NOW, 60), NOW)
            .unwrap();

        let handle = fx
            .tracker
            .scheduler()
            .start(std::time::Duration::from_millis(20));

        let mut fired = false;
        for _ in 0..100 {
            if !fx.tracker.reminder_log().is_empty() {
                fired = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        handle.shutdown().await;

        assert!(fired);
        let logged = fx.tracker.reminder_log().len();
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        assert_eq!(fx.tracker.reminder_log().len(), logged);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let fx = fixture();
        let handle = fx
            .tracker
            .scheduler()
            .start(std::time::Duration::from_secs(3600));

        handle.stop();
        handle.stop();
        assert!(handle.is_stopped());
        handle.join().await;
    }
}
