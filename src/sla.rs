//! SLA deadline computation and the overdue-notification monitor.
//!
//! The monitor scans active files whose current step has outlived its
//! SLA and records one notification per (file, step) pair. Dedup is
//! anchored on the unique index over that pair, so repeated or
//! concurrent scans are idempotent by construction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Local, NaiveDateTime};

use crate::db::repository::{file, notification};
use crate::db::Db;
use crate::error::TrackerError;
use crate::models::{FileStatus, FileView};

/// Deadline for a step entered at `step_started_at`: SLA days later,
/// calendar time.
pub fn deadline(step_started_at: NaiveDateTime, sla_days: i64) -> NaiveDateTime {
    step_started_at + Duration::days(sla_days)
}

/// Whether a file's current step has blown its deadline. Zero-SLA
/// steps and completed files are never overdue.
pub fn is_overdue(
    status: FileStatus,
    sla_days: i64,
    step_started_at: NaiveDateTime,
    now: NaiveDateTime,
) -> bool {
    status == FileStatus::Active && sla_days > 0 && now > deadline(step_started_at, sla_days)
}

/// Whether a closed traversal met its SLA: elapsed whole days between
/// start and completion, compared against the allowance.
pub fn sla_met(started_at: NaiveDateTime, completed_at: NaiveDateTime, sla_days: i64) -> bool {
    (completed_at - started_at).num_days() <= sla_days
}

/// Fill in the deadline/overdue annotation on a joined file view.
pub fn annotate(view: &mut FileView, now: NaiveDateTime) {
    if view.sla_days > 0 {
        view.deadline = Some(deadline(view.file.step_started_at, view.sla_days));
    }
    view.is_overdue = is_overdue(
        view.file.status,
        view.sla_days,
        view.file.step_started_at,
        now,
    );
}

pub struct SlaMonitor {
    db: Db,
}

impl SlaMonitor {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Scan for overdue steps against the wall clock.
    pub fn check(&self) -> Result<usize, TrackerError> {
        self.check_at(Local::now().naive_local())
    }

    /// Scan for overdue steps against an explicit clock. Returns the
    /// number of notifications actually created; files already
    /// notified for their current step are skipped.
    pub fn check_at(&self, now: NaiveDateTime) -> Result<usize, TrackerError> {
        let conn = self.db.conn()?;
        let overdue = file::list_overdue(&conn, now)?;
        tracing::info!("SLA check found {} overdue file(s)", overdue.len());

        let mut created = 0;
        for row in &overdue {
            // Read-then-insert; the unique index reconciles any race.
            if notification::exists(&conn, row.file_id, row.current_step_id)? {
                continue;
            }

            let days_overdue = (now - row.step_started_at).num_days() - row.sla_days;
            let message = format!(
                "OVERDUE: File \"{} - {}\" is {} day(s) overdue on step \"{}\" (SLA: {} days). Assigned to {}.",
                row.pr_number, row.title, days_overdue, row.step_name, row.sla_days, row.officer_name,
            );

            if notification::insert_if_absent(
                &conn,
                row.file_id,
                row.officer_id,
                row.current_step_id,
                &message,
                now,
            )? {
                tracing::info!("Notification created for file {}: {message}", row.pr_number);
                created += 1;
            }
        }
        Ok(created)
    }
}

/// Scan interval: every hour.
const CHECK_INTERVAL_SECS: u64 = 60 * 60;

/// Sleep granularity for shutdown responsiveness (5 seconds).
const SLEEP_GRANULARITY_SECS: u64 = 5;

/// Handle for the background SLA scan thread.
///
/// Supports graceful shutdown via `shutdown()` or automatic cleanup on
/// `Drop`. Store this in host process state so it is dropped on exit.
pub struct SlaSchedulerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl SlaSchedulerHandle {
    /// Request graceful shutdown. A scan in flight will complete, but
    /// no new scans will be started.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for SlaSchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Start the periodic SLA scan on a separate thread. A failed run is
/// logged and skipped; the next interval scans again.
pub fn start_sla_scheduler(monitor: SlaMonitor) -> SlaSchedulerHandle {
    start_sla_scheduler_with_interval(monitor, StdDuration::from_secs(CHECK_INTERVAL_SECS))
}

pub fn start_sla_scheduler_with_interval(
    monitor: SlaMonitor,
    interval: StdDuration,
) -> SlaSchedulerHandle {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();

    let handle = std::thread::spawn(move || {
        tracing::info!("SLA scheduler started (check every {}s)", interval.as_secs());
        scheduler_loop(&monitor, interval, &flag);
    });

    SlaSchedulerHandle {
        shutdown,
        handle: Some(handle),
    }
}

fn scheduler_loop(monitor: &SlaMonitor, interval: StdDuration, shutdown: &AtomicBool) {
    let granularity = StdDuration::from_secs(SLEEP_GRANULARITY_SECS).min(interval);
    let ticks = (interval.as_secs() / granularity.as_secs().max(1)).max(1);

    loop {
        // Sleep in small increments for responsive shutdown
        for _ in 0..ticks {
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("SLA scheduler shutting down");
                return;
            }
            std::thread::sleep(granularity);
        }

        match monitor.check() {
            Ok(created) if created > 0 => {
                tracing::info!("SLA scan created {created} notification(s)");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("SLA scan failed, will retry next interval: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::parse_ts;
    use crate::db::sqlite::open_memory_database;
    use crate::workflow::{CreateFileRequest, WorkflowEngine};

    fn ts(s: &str) -> NaiveDateTime {
        parse_ts(s).unwrap()
    }

    fn setup() -> (Db, WorkflowEngine, SlaMonitor) {
        let db = Db::new(open_memory_database().unwrap());
        db.conn()
            .unwrap()
            .execute(
                "INSERT INTO officers (name, email, created_at) VALUES ('Amina', 'amina@proc.gov', '2026-01-01 08:00:00')",
                [],
            )
            .unwrap();
        (db.clone(), WorkflowEngine::new(db.clone()), SlaMonitor::new(db))
    }

    fn request(pr: &str) -> CreateFileRequest {
        CreateFileRequest {
            pr_number: pr.to_string(),
            title: "Office chairs".to_string(),
            process_name: "Sole Source".to_string(),
            officer_id: 1,
            assigned_date: None,
            current_step_order: None,
        }
    }

    #[test]
    fn deadline_is_sla_days_later() {
        let d = deadline(ts("2026-03-01 09:00:00"), 3);
        assert_eq!(d, ts("2026-03-04 09:00:00"));
    }

    #[test]
    fn overdue_only_when_active_with_positive_sla_past_deadline() {
        let started = ts("2026-03-01 09:00:00");
        let past = ts("2026-03-05 09:00:01");
        let before = ts("2026-03-04 08:59:59");

        assert!(is_overdue(FileStatus::Active, 3, started, past));
        assert!(!is_overdue(FileStatus::Active, 3, started, before));
        assert!(!is_overdue(FileStatus::Active, 0, started, past));
        assert!(!is_overdue(FileStatus::Completed, 3, started, past));
    }

    #[test]
    fn deadline_boundary_is_strict() {
        let started = ts("2026-03-01 09:00:00");
        // Exactly at the deadline is not yet overdue
        assert!(!is_overdue(FileStatus::Active, 3, started, ts("2026-03-04 09:00:00")));
        assert!(is_overdue(FileStatus::Active, 3, started, ts("2026-03-04 09:00:01")));
    }

    #[test]
    fn sla_met_counts_whole_days() {
        let started = ts("2026-03-01 09:00:00");
        // 2 days 23h elapsed → 2 whole days → within a 2-day SLA
        assert!(sla_met(started, ts("2026-03-04 08:00:00"), 2));
        // 3 full days elapsed → outside a 2-day SLA
        assert!(!sla_met(started, ts("2026-03-04 09:00:00"), 2));
    }

    #[test]
    fn check_creates_one_notification_for_overdue_file() {
        let (db, engine, monitor) = setup();
        // Draft PR has a 2-day SLA
        engine.create_at(request("PR-100"), ts("2026-03-01 09:00:00")).unwrap();

        let created = monitor.check_at(ts("2026-03-06 09:00:00")).unwrap();
        assert_eq!(created, 1);

        let conn = db.conn().unwrap();
        let notifications = notification::list(&conn, None, false).unwrap();
        assert_eq!(notifications.len(), 1);
        // 5 days elapsed, SLA 2 → 3 days overdue
        assert!(notifications[0].message.contains("3 day(s) overdue"));
        assert!(notifications[0].message.contains("PR-100"));
        assert!(!notifications[0].is_read);
    }

    #[test]
    fn repeated_check_is_idempotent() {
        let (db, engine, monitor) = setup();
        engine.create_at(request("PR-100"), ts("2026-03-01 09:00:00")).unwrap();

        assert_eq!(monitor.check_at(ts("2026-03-06 09:00:00")).unwrap(), 1);
        assert_eq!(monitor.check_at(ts("2026-03-07 09:00:00")).unwrap(), 0);

        let conn = db.conn().unwrap();
        assert_eq!(notification::unread_count(&conn).unwrap(), 1);
    }

    #[test]
    fn file_within_sla_produces_nothing() {
        let (_db, engine, monitor) = setup();
        engine.create_at(request("PR-100"), ts("2026-03-01 09:00:00")).unwrap();

        assert_eq!(monitor.check_at(ts("2026-03-02 09:00:00")).unwrap(), 0);
    }

    #[test]
    fn advance_to_new_step_allows_new_notification() {
        let (_db, engine, monitor) = setup();
        let file = engine.create_at(request("PR-100"), ts("2026-03-01 09:00:00")).unwrap();

        assert_eq!(monitor.check_at(ts("2026-03-06 09:00:00")).unwrap(), 1);

        // Move to Justification Review (3-day SLA), let it go overdue too
        engine.advance_at(file.id, None, ts("2026-03-06 10:00:00")).unwrap();
        assert_eq!(monitor.check_at(ts("2026-03-12 09:00:00")).unwrap(), 1);
    }

    #[test]
    fn insert_race_loser_is_silent() {
        let (db, engine, _monitor) = setup();
        let file = engine.create_at(request("PR-100"), ts("2026-03-01 09:00:00")).unwrap();

        let conn = db.conn().unwrap();
        let first = notification::insert_if_absent(
            &conn, file.id, 1, file.current_step_id, "overdue", ts("2026-03-06 09:00:00"),
        )
        .unwrap();
        let second = notification::insert_if_absent(
            &conn, file.id, 1, file.current_step_id, "overdue", ts("2026-03-06 09:00:00"),
        )
        .unwrap();

        assert!(first);
        assert!(!second);
    }

    #[test]
    fn mark_read_flow() {
        let (db, engine, monitor) = setup();
        engine.create_at(request("PR-100"), ts("2026-03-01 09:00:00")).unwrap();
        monitor.check_at(ts("2026-03-06 09:00:00")).unwrap();

        let conn = db.conn().unwrap();
        let n = &notification::list(&conn, Some(1), true).unwrap()[0];
        assert!(notification::mark_read(&conn, n.id).unwrap());
        assert_eq!(notification::unread_count(&conn).unwrap(), 0);
        assert!(notification::list(&conn, Some(1), true).unwrap().is_empty());
    }

    #[test]
    fn scheduler_shuts_down_on_drop() {
        let (_db, _engine, monitor) = setup();
        let handle =
            start_sla_scheduler_with_interval(monitor, StdDuration::from_millis(50));
        std::thread::sleep(StdDuration::from_millis(120));
        drop(handle); // joins the thread; must not hang
    }
}
