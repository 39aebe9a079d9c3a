//! Deferred checks across cancellation, replacement, restarts and clock
//! changes, using the public storage and scheduler types.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use goalwatch_core::notify::Notification;
use goalwatch_core::scheduler::ScheduleReport;
use goalwatch_core::{
    CheckHandler, CheckKey, CheckOutcome, CheckQueue, CheckScheduler, Database, GoalStore, ManualClock,
    RecordingNotifier, ScheduleOutcome, TimeWindow, TimerExecutor,
};
use std::path::Path;
use std::sync::Arc;

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 9, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .unwrap()
}

fn windows() -> Vec<TimeWindow> {
    vec![TimeWindow::new(0, 7, 0, 8, 0), TimeWindow::new(1, 20, 0, 21, 0)]
}

fn report(outcome: ScheduleOutcome) -> ScheduleReport {
    match outcome {
        ScheduleOutcome::Scheduled(report) => report,
        other => panic!("expected a schedule, got {other:?}"),
    }
}

/// One process worth of wiring over a database file.
struct Process {
    db: Arc<Database>,
    queue: Arc<CheckQueue>,
    scheduler: CheckScheduler,
    handler: CheckHandler,
    sink: Arc<RecordingNotifier>,
}

fn start(path: &Path, clock: &Arc<ManualClock>) -> Process {
    let db = Arc::new(Database::open_at(path, clock.clone()).unwrap());
    let queue = Arc::new(CheckQueue::open(path, 4096).unwrap());
    let sink = Arc::new(RecordingNotifier::new());
    let scheduler = CheckScheduler::new(db.clone(), db.clone(), queue.clone(), clock.clone());
    let handler = CheckHandler::new(db.clone(), sink.clone());
    Process {
        db,
        queue,
        scheduler,
        handler,
        sink,
    }
}

#[test]
fn test_due_checks_notify_only_missed_windows() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(at(1, 6, 0)));
    let p = start(&dir.path().join("goalwatch.db"), &clock);

    let id = p.db.create_goal("Walk", 3, &windows()).unwrap();
    assert_eq!(report(p.scheduler.schedule(id).unwrap()).scheduled, 6);

    clock.set(at(1, 7, 30));
    p.db.record_press(id, 0, at(1, 0, 0).date()).unwrap();

    clock.set(at(1, 21, 0));
    let due = p.queue.take_due(at(1, 21, 0)).unwrap();
    assert_eq!(due.len(), 2);

    let outcomes: Vec<CheckOutcome> = due
        .iter()
        .map(|fired| {
            p.scheduler.fired(&fired.key).unwrap();
            p.handler.run(&fired.key)
        })
        .collect();
    assert_eq!(outcomes, [CheckOutcome::Pressed, CheckOutcome::Missed]);
    assert_eq!(
        p.sink.sent(),
        [Notification::MissedWindow {
            goal_title: "Walk".into(),
            window_index: 1,
        }]
    );
    assert_eq!(p.scheduler.live_checks(id).unwrap().len(), 4);
}

#[test]
fn test_restart_rebuilds_without_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("goalwatch.db");
    let clock = Arc::new(ManualClock::new(at(1, 6, 0)));

    let id = {
        let p = start(&path, &clock);
        let id = p.db.create_goal("Walk", 7, &windows()).unwrap();
        p.scheduler.schedule(id).unwrap();
        assert_eq!(p.queue.pending().unwrap(), 14);
        id
    };

    // Down for two days; comes back mid-morning on the third.
    clock.set(at(3, 10, 0));
    let p = start(&path, &clock);
    let rebuilt = report(p.scheduler.reschedule_active().unwrap().unwrap());
    assert_eq!(rebuilt.goal_id, id);
    assert_eq!(rebuilt.scheduled, 9);
    assert_eq!(rebuilt.skipped_elapsed, 1);
    assert_eq!(p.queue.pending().unwrap(), 9);

    let again = report(p.scheduler.reschedule(id).unwrap());
    assert_eq!(again.scheduled, 9);
    assert_eq!(p.queue.pending().unwrap(), 9);
    assert_eq!(p.scheduler.live_checks(id).unwrap().len(), 9);
}

#[test]
fn test_cancel_then_late_fire_is_stale() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(at(1, 6, 0)));
    let p = start(&dir.path().join("goalwatch.db"), &clock);

    let id = p.db.create_goal("Walk", 7, &windows()).unwrap();
    p.scheduler.schedule(id).unwrap();

    let cancelled = p.scheduler.cancel(id).unwrap();
    assert_eq!(cancelled.cancelled, 14);
    assert_eq!(p.queue.pending().unwrap(), 0);
    assert!(p.scheduler.live_checks(id).unwrap().is_empty());
    p.db.delete_goal(id).unwrap();

    let late = CheckKey {
        goal_id: id,
        window_index: 0,
        date: at(1, 0, 0).date(),
    };
    assert_eq!(p.handler.run(&late), CheckOutcome::Stale);
    assert!(p.sink.sent().is_empty());
}

#[test]
fn test_replaced_goal_checks_stay_quiet() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(at(1, 6, 0)));
    let p = start(&dir.path().join("goalwatch.db"), &clock);

    let old = p.db.create_goal("Walk", 7, &windows()).unwrap();
    p.scheduler.schedule(old).unwrap();
    p.scheduler.cancel(old).unwrap();
    p.db.delete_goal(old).unwrap();

    let new = p.db.create_goal("Swim", 2, &[TimeWindow::new(0, 12, 0, 13, 0)]).unwrap();
    assert_eq!(report(p.scheduler.schedule(new).unwrap()).scheduled, 2);
    assert!(matches!(
        p.scheduler.schedule(old).unwrap(),
        ScheduleOutcome::Stale { goal_id } if goal_id == old
    ));

    let old_key = CheckKey {
        goal_id: old,
        window_index: 1,
        date: at(1, 0, 0).date(),
    };
    assert_eq!(p.handler.run(&old_key), CheckOutcome::Stale);
    assert_eq!(p.queue.pending().unwrap(), 2);
}

#[test]
fn test_clock_set_forward_skips_elapsed_windows() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(at(1, 6, 0)));
    let p = start(&dir.path().join("goalwatch.db"), &clock);

    let id = p.db.create_goal("Walk", 2, &windows()).unwrap();
    p.scheduler.schedule(id).unwrap();

    clock.advance(Duration::hours(30));
    let rebuilt = report(p.scheduler.reschedule(id).unwrap());
    assert_eq!(rebuilt.scheduled, 1);
    assert_eq!(rebuilt.skipped_elapsed, 1);

    let live = p.scheduler.live_checks(id).unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].fire_at, at(2, 21, 0));
}

#[tokio::test(start_paused = true)]
async fn test_timer_executor_cancel_stops_firing() {
    let clock = Arc::new(ManualClock::new(at(1, 6, 0)));
    let db = Arc::new(Database::open_memory(clock.clone()).unwrap());
    let (executor, mut fired) = TimerExecutor::new(tokio::runtime::Handle::current(), clock.clone(), 64);
    let scheduler = CheckScheduler::new(db.clone(), db.clone(), Arc::new(executor), clock.clone());

    let id = db.create_goal("Walk", 2, &windows()).unwrap();
    assert_eq!(report(scheduler.schedule(id).unwrap()).scheduled, 4);
    assert_eq!(scheduler.pending(id), 4);

    tokio::time::advance(std::time::Duration::from_secs(2 * 3600 + 1)).await;
    tokio::task::yield_now().await;
    let first = fired.recv().await.unwrap();
    assert_eq!(first.key.window_index, 0);
    assert_eq!(first.key.date, at(1, 0, 0).date());

    scheduler.cancel(id).unwrap();
    assert_eq!(scheduler.pending(id), 0);

    tokio::time::advance(std::time::Duration::from_secs(3 * 86_400)).await;
    tokio::task::yield_now().await;
    assert!(fired.try_recv().is_err());
}

#[test]
fn test_two_writers_share_one_check_per_window() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("goalwatch.db");
    let clock = Arc::new(ManualClock::new(at(1, 6, 0)));
    let cli = start(&path, &clock);
    let daemon = start(&path, &clock);

    let id = cli.db.create_goal("Walk", 3, &windows()).unwrap();
    // The daemon notices the new goal before the creating process schedules it.
    daemon.scheduler.reschedule(id).unwrap();
    cli.scheduler.schedule(id).unwrap();

    assert_eq!(cli.queue.pending().unwrap(), 6);
    assert_eq!(cli.scheduler.live_checks(id).unwrap().len(), 6);

    for fired in daemon.queue.take_due(at(1, 21, 0)).unwrap() {
        daemon.scheduler.fired(&fired.key).unwrap();
        daemon.handler.run(&fired.key);
    }
    let missed: Vec<u32> = daemon
        .sink
        .sent()
        .into_iter()
        .filter_map(|n| match n {
            Notification::MissedWindow { window_index, .. } => Some(window_index),
            _ => None,
        })
        .collect();
    assert_eq!(missed, [0, 1]);
}

#[test]
fn test_reschedule_then_cancel_leaves_no_checks() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(at(1, 6, 0)));
    let p = start(&dir.path().join("goalwatch.db"), &clock);

    let id = p.db.create_goal("Walk", 7, &windows()).unwrap();
    p.scheduler.schedule(id).unwrap();
    p.scheduler.reschedule(id).unwrap();
    p.scheduler.cancel(id).unwrap();

    assert_eq!(p.queue.pending().unwrap(), 0);
    assert!(p.scheduler.live_checks(id).unwrap().is_empty());
    assert!(p.queue.take_due(at(8, 0, 0)).unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timer_checks_overtaken_by_clock_jump_are_evaluated() {
    let clock = Arc::new(ManualClock::new(at(1, 6, 0)));
    let db = Arc::new(Database::open_memory(clock.clone()).unwrap());
    let (executor, mut fired) = TimerExecutor::new(tokio::runtime::Handle::current(), clock.clone(), 64);
    let scheduler = CheckScheduler::new(db.clone(), db.clone(), Arc::new(executor), clock.clone());
    let sink = Arc::new(RecordingNotifier::new());
    let handler = CheckHandler::new(db.clone(), sink.clone());

    let id = db.create_goal("Walk", 3, &windows()).unwrap();
    scheduler.schedule(id).unwrap();

    // Resume on day 2 at 09:00 with no monotonic time having passed.
    clock.advance(Duration::hours(27));
    let overdue = scheduler.claim_overdue(id).unwrap();
    assert_eq!(overdue.len(), 3);
    let outcomes: Vec<CheckOutcome> = overdue.iter().map(|c| handler.run(&c.key)).collect();
    assert_eq!(outcomes, [CheckOutcome::Missed, CheckOutcome::Missed, CheckOutcome::Missed]);

    let rebuilt = report(scheduler.reschedule(id).unwrap());
    assert_eq!(rebuilt.scheduled, 3);
    assert_eq!(scheduler.pending(id), 3);

    // The claimed timers are gone; the next delivery is day 2's evening window.
    tokio::time::advance(std::time::Duration::from_secs(12 * 3600 + 60)).await;
    tokio::task::yield_now().await;
    let next = fired.recv().await.unwrap();
    assert_eq!((next.key.date, next.key.window_index), (at(2, 0, 0).date(), 1));
    assert!(fired.try_recv().is_err());
    assert_eq!(sink.sent().len(), 3);
}
