    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::AtomicU32;

    /// 2024-01-15 was a Monday.
    fn at(day: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    fn counting(expr: &str) -> (CronTask, Arc<AtomicU32>) {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let task = CronTask::parse(expr, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        (task, count)
    }

    #[test]
    fn test_monday_afternoon_fires_only_then() {
        let (task, count) = counting("30 14 * * 1");
        assert!(task.check_task_time(&at(15, 14, 30, 0)));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(!task.check_task_time(&at(15, 14, 31, 0)));
        assert!(!task.check_task_time(&at(16, 14, 30, 0)));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fires_on_every_matching_check() {
        let (task, count) = counting("30 14 * * 1");
        assert!(!task.is_once_per_minute());
        assert!(task.check_task_time(&at(15, 14, 30, 0)));
        assert!(task.check_task_time(&at(15, 14, 30, 1)));
        assert!(task.check_task_time(&at(15, 14, 30, 1)));
        assert!(!task.check_task_time(&at(15, 14, 31, 0)));
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_once_per_minute_skips_repeat_checks() {
        let (task, count) = counting("* * * * *");
        let task = task.once_per_minute();
        assert!(task.is_once_per_minute());
        assert!(task.check_task_time(&at(15, 9, 0, 0)));
        assert!(!task.check_task_time(&at(15, 9, 0, 1)));
        assert!(!task.check_task_time(&at(15, 9, 0, 59)));
        assert!(task.check_task_time(&at(15, 9, 1, 0)));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_matches_fails_when_one_field_differs() {
        let schedule = CronSchedule::parse("30 14 15 1 1").unwrap();
        let hit = at(15, 14, 30, 0);
        assert!(schedule.matches(&hit));

        assert!(!schedule.matches(&at(15, 14, 29, 0)), "minute");
        assert!(!schedule.matches(&at(15, 13, 30, 0)), "hour");
        // 2024-01-22 is also a Monday, so only the day differs.
        assert!(!schedule.matches(&at(22, 14, 30, 0)), "day");
        let february = NaiveDate::from_ymd_opt(2024, 2, 15)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert!(!CronSchedule::parse("30 14 15 1 *").unwrap().matches(&february), "month");
        assert!(!CronSchedule::parse("30 14 15 1 2").unwrap().matches(&hit), "weekday");
    }

    #[test]
    fn test_sunday_is_zero_and_seven() {
        // 2024-01-14 was a Sunday.
        let sunday = at(14, 0, 0, 0);
        assert!(CronSchedule::parse("0 0 * * 0").unwrap().matches(&sunday));
        assert!(CronSchedule::parse("0 0 * * 7").unwrap().matches(&sunday));
        assert!(CronSchedule::parse("0 0 * * sun").unwrap().matches(&sunday));
    }

    #[test]
    fn test_field_count_errors() {
        for (expr, found) in [("", 0), ("* * * *", 4), ("* * * * * *", 6)] {
            match CronSchedule::parse(expr) {
                Err(CronError::FieldCount { found: n }) => assert_eq!(n, found, "{expr:?}"),
                other => panic!("expected FieldCount for {expr:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_extra_whitespace_between_fields() {
        let schedule = CronSchedule::parse("  0\t12  *  * \n *").unwrap();
        assert!(schedule.matches(&at(15, 12, 0, 0)));
    }

    #[test]
    fn test_both_constructors_agree() {
        let parsed = CronSchedule::parse("*/15 9-17 * jan-jun mon-fri").unwrap();
        let fields = CronSchedule::from_fields("*/15", "9-17", "*", "jan-jun", "mon-fri").unwrap();
        assert_eq!(parsed, fields);

        let task = CronTask::from_fields("0", "12", "*", "*", "*", || {}).unwrap();
        assert_eq!(task.expr(), "0 12 * * *");
    }

    #[test]
    fn test_invalid_field_builds_nothing() {
        let result = CronTask::parse("0 25-3 * * *", || {});
        match result {
            Err(CronError::InvalidField { field, .. }) => assert_eq!(field, FieldKind::Hour),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_is_never() {
        assert!(CronSchedule::parse("0 0 31 2 *").is_ok());
        assert!(CronSchedule::parse("99 * * * *").unwrap().is_never());
        assert!(!CronSchedule::parse("* * * * *").unwrap().is_never());
    }
