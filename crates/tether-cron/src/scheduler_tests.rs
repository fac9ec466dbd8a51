    use super::*;
    use crate::clock::ManualClock;
    use crate::error::CronError;
    use chrono::NaiveDate;
    use std::sync::atomic::AtomicU32;
    use std::thread;

    /// Monday 2024-01-15 at the given time.
    fn monday(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    fn owned_scheduler(start: NaiveDateTime) -> (Scheduler, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        let scheduler = Scheduler::with_clock("test", clock.clone());
        scheduler.invoker().claim();
        (scheduler, clock)
    }

    fn counter() -> (Arc<AtomicU32>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_next_tick_truncated_to_minute() {
        let (scheduler, _clock) = owned_scheduler(monday(14, 30, 42));
        assert_eq!(*scheduler.next_tick.lock(), monday(14, 30, 0));
    }

    #[test]
    fn test_add_on_owner_is_immediate() {
        let (scheduler, _clock) = owned_scheduler(monday(14, 30, 0));
        let (_count, action) = counter();
        scheduler.add_task("* * * * *", action).unwrap();
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_add_from_other_thread_is_queued() {
        let scheduler = Arc::new(Scheduler::new("test"));
        scheduler.invoker().claim();

        let remote = scheduler.clone();
        thread::spawn(move || remote.add_task("0 * * * *", || {}))
            .join()
            .unwrap()
            .unwrap();
        assert_eq!(scheduler.len(), 0);
        assert_eq!(scheduler.invoker().pending(), 1);

        scheduler.invoker().poll_invokes().unwrap();
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_invalid_expression_registers_nothing() {
        let (scheduler, _clock) = owned_scheduler(monday(14, 30, 0));
        let result = scheduler.add_task("* * *", || {});
        assert!(matches!(result, Err(CronError::FieldCount { found: 3 })));
        let result = scheduler.add_task_fields("*", "24-1", "*", "*", "*", || {});
        assert!(matches!(result, Err(CronError::InvalidField { .. })));
        assert_eq!(scheduler.len(), 0);
        assert_eq!(scheduler.invoker().pending(), 0);
    }

    #[test]
    fn test_run_task_fires_matching_job() {
        let (scheduler, clock) = owned_scheduler(monday(14, 30, 0));
        let (count, action) = counter();
        scheduler.add_task("30 14 * * 1", action).unwrap();

        scheduler.run_task();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Next tick in the same minute matches again.
        clock.advance(TimeDelta::seconds(1));
        scheduler.run_task();
        assert_eq!(count.load(Ordering::SeqCst), 2);

        clock.set(monday(14, 31, 0));
        scheduler.run_task();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_once_per_minute_task_fires_once_across_ticks() {
        let (scheduler, clock) = owned_scheduler(monday(14, 30, 0));
        let (count, action) = counter();
        let task = CronTask::parse("30 14 * * 1", action).unwrap().once_per_minute();
        scheduler.add_cron_task(task).unwrap();

        for _ in 0..5 {
            scheduler.run_task();
            clock.advance(TimeDelta::seconds(1));
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_evaluation_capped_at_once_per_second() {
        let (scheduler, clock) = owned_scheduler(monday(9, 0, 0));
        let (count, action) = counter();
        scheduler.add_task("* * * * *", action).unwrap();

        scheduler.run_task();
        assert_eq!(*scheduler.next_tick.lock(), monday(9, 0, 1));
        // No time passed: the tick is not due.
        scheduler.run_task();
        assert_eq!(*scheduler.next_tick.lock(), monday(9, 0, 1));

        clock.set(monday(9, 1, 0));
        scheduler.run_task();
        assert_eq!(*scheduler.next_tick.lock(), monday(9, 0, 2));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_add_task_fields() {
        let (scheduler, _clock) = owned_scheduler(monday(14, 30, 0));
        let (count, action) = counter();
        scheduler
            .add_task_fields("30", "14", "*", "jan", "mon", action)
            .unwrap();
        scheduler.run_task();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_task() {
        let (scheduler, _clock) = owned_scheduler(monday(14, 30, 0));
        let (count, action) = counter();
        let id = scheduler.add_task("* * * * *", action).unwrap();
        let other = scheduler.add_task("0 0 1 1 *", || {}).unwrap();
        assert_ne!(id, other);

        scheduler.remove_task(id).unwrap();
        assert_eq!(scheduler.len(), 1);
        scheduler.remove_task(Uuid::new_v4()).unwrap();
        assert_eq!(scheduler.len(), 1);

        scheduler.run_task();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stop_halts_evaluation() {
        let (scheduler, _clock) = owned_scheduler(monday(14, 30, 0));
        let (count, action) = counter();
        scheduler.add_task("* * * * *", action).unwrap();

        ThreadTask::stop(&scheduler, false);
        assert!(scheduler.is_stopped());
        scheduler.run_task();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_never_matching_expression_is_accepted() {
        let (scheduler, _clock) = owned_scheduler(monday(14, 30, 0));
        scheduler.add_task("0 0 0 * *", || {}).unwrap();
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_name_comes_from_invoker() {
        let scheduler = Scheduler::new("cron");
        assert_eq!(ThreadTask::name(&scheduler), "Scheduler: cron");
    }
