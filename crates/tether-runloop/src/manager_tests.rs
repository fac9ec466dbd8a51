    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::mpsc;
    use std::thread::JoinHandle;

    /// Drives a manager on its own thread until dropped.
    struct Spinner {
        stop: CancellationToken,
        thread_id: ThreadId,
        errors: Arc<AtomicU32>,
        handle: Option<JoinHandle<()>>,
    }

    impl Spinner {
        fn spawn(manager: &InvokeManager) -> Self {
            let manager = manager.clone();
            let stop = CancellationToken::new();
            let errors = Arc::new(AtomicU32::new(0));
            let (tx, rx) = mpsc::channel();
            let loop_stop = stop.clone();
            let loop_errors = errors.clone();
            let handle = thread::spawn(move || {
                Invokable::change_owner(&manager, thread::current().id());
                tx.send(thread::current().id()).unwrap();
                while !loop_stop.is_cancelled() {
                    if manager.poll(&loop_stop).is_err() {
                        loop_errors.fetch_add(1, Ordering::SeqCst);
                    }
                    thread::yield_now();
                }
            });
            let thread_id = rx.recv().unwrap();
            Self {
                stop,
                thread_id,
                errors,
                handle: Some(handle),
            }
        }
    }

    impl Drop for Spinner {
        fn drop(&mut self) {
            self.stop.cancel();
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(std::time::Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn item(name: &str) -> Arc<dyn Invokable> {
        Arc::new(Invoker::new(name))
    }

    #[test]
    fn test_register_from_owner_thread_is_immediate() {
        let manager = InvokeManager::new("Thread: a");
        Invokable::change_owner(&manager, thread::current().id());
        let child = item("child");
        manager.register(child.clone()).unwrap();
        assert!(manager.owns(&child));
        assert_eq!(child.invoker().owner(), Some(thread::current().id()));
        assert_eq!(child.invoker().manager_id(), Some(manager.id()));
    }

    #[test]
    fn test_register_from_other_thread_is_deferred() {
        let manager = InvokeManager::new("Thread: a");
        let child = item("child");
        manager.register(child.clone()).unwrap();
        assert!(!manager.owns(&child));

        Invokable::change_owner(&manager, thread::current().id());
        manager.poll_invokes().unwrap();
        assert!(manager.owns(&child));
        assert_eq!(manager.children_len(), 1);
    }

    #[test]
    fn test_register_twice_keeps_one_entry() {
        let manager = InvokeManager::new("Thread: a");
        Invokable::change_owner(&manager, thread::current().id());
        let child = item("child");
        manager.register(child.clone()).unwrap();
        manager.register(child.clone()).unwrap();
        assert_eq!(manager.children_len(), 1);
    }

    #[test]
    fn test_register_child_of_other_manager_fails() {
        let a = InvokeManager::new("Thread: a");
        let b = InvokeManager::new("Thread: b");
        Invokable::change_owner(&a, thread::current().id());
        Invokable::change_owner(&b, thread::current().id());
        let child = item("child");
        a.register(child.clone()).unwrap();
        let result = b.register(child.clone());
        assert!(matches!(result, Err(RunLoopError::NotOwned { .. })));
        assert!(a.owns(&child));
        assert!(!b.owns(&child));
    }

    #[test]
    fn test_poll_visits_children() {
        let manager = InvokeManager::new("Thread: a");
        let counter = Arc::new(AtomicU32::new(0));
        let children: Vec<Arc<dyn Invokable>> = (0..3).map(|i| item(&format!("child-{i}"))).collect();
        for child in &children {
            manager.register(child.clone()).unwrap();
            let c = counter.clone();
            child
                .invoker()
                .invoke_async(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap();
        }
        // Children are not adopted yet, so only the manager's queue counts.
        assert_eq!(manager.pending(), 3);

        Invokable::change_owner(&manager, thread::current().id());
        // First poll adopts the children, then polls each of them once.
        let executed = manager.poll_invokes().unwrap();
        assert_eq!(executed, 6);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(manager.pending(), 0);
    }

    #[test]
    fn test_change_owner_recurses_into_children() {
        let manager = InvokeManager::new("Thread: a");
        Invokable::change_owner(&manager, thread::current().id());
        let child = item("child");
        manager.register(child.clone()).unwrap();

        let other = thread::spawn(|| thread::current().id()).join().unwrap();
        Invokable::change_owner(&manager, other);
        assert_eq!(manager.invoker().owner(), Some(other));
        assert_eq!(child.invoker().owner(), Some(other));
    }

    #[test]
    fn test_transfer_unowned_item_fails() {
        let a = InvokeManager::new("Thread: a");
        let b = InvokeManager::new("Thread: b");
        let stray = item("stray");
        let result = a.transfer_to(&b, &stray);
        assert!(matches!(result, Err(RunLoopError::NotOwned { .. })));
    }

    #[test]
    fn test_transfer_on_same_thread_is_immediate() {
        let a = InvokeManager::new("Thread: a");
        let b = InvokeManager::new("Thread: b");
        Invokable::change_owner(&a, thread::current().id());
        Invokable::change_owner(&b, thread::current().id());
        let child = item("child");
        a.register(child.clone()).unwrap();

        a.transfer_to(&b, &child).unwrap();
        assert!(!a.owns(&child));
        assert!(b.owns(&child));
        assert_eq!(child.invoker().manager_id(), Some(b.id()));
    }

    #[test]
    fn test_transfer_between_threads_moves_pending_calls() {
        let a = InvokeManager::new("Thread: a");
        let b = InvokeManager::new("Thread: b");
        let child = item("child");
        a.register(child.clone()).unwrap();

        let spinner_a = Spinner::spawn(&a);
        wait_until(|| a.owns(&child));

        a.transfer_to(&b, &child).unwrap();
        // a's loop is now parked in the commit phase, waiting on b.
        wait_until(|| b.invoker().pending() == 1);

        let ran_on = Arc::new(Mutex::new(Vec::new()));
        let record = ran_on.clone();
        child
            .invoker()
            .invoke_async(move || {
                record.lock().push(thread::current().id());
                Ok(())
            })
            .unwrap();

        let spinner_b = Spinner::spawn(&b);
        wait_until(|| !ran_on.lock().is_empty());

        assert!(!a.owns(&child));
        assert!(b.owns(&child));
        assert_eq!(child.invoker().owner(), Some(spinner_b.thread_id));
        assert_eq!(*ran_on.lock(), vec![spinner_b.thread_id]);
        assert_ne!(spinner_a.thread_id, spinner_b.thread_id);
        assert_eq!(spinner_a.errors.load(Ordering::SeqCst), 0);

        // Exactly once.
        thread::sleep(Duration::from_millis(20));
        assert_eq!(ran_on.lock().len(), 1);
    }

    #[test]
    fn test_transfer_to_stalled_target_times_out() {
        let a = InvokeManager::with_transfer_timeout("Thread: a", Duration::from_millis(20));
        let b = InvokeManager::new("Thread: b");
        let child = item("child");
        a.register(child.clone()).unwrap();
        let spinner_a = Spinner::spawn(&a);
        wait_until(|| a.owns(&child));

        // Nobody drives b, so the commit is never picked up.
        a.transfer_to(&b, &child).unwrap();
        wait_until(|| spinner_a.errors.load(Ordering::SeqCst) == 1);

        assert!(a.owns(&child));
        assert!(!b.owns(&child));
        assert_eq!(child.invoker().owner(), Some(spinner_a.thread_id));

        // The withdrawn commit never runs, even once b starts.
        let _spinner_b = Spinner::spawn(&b);
        thread::sleep(Duration::from_millis(20));
        assert!(a.owns(&child));
        assert_eq!(b.children_len(), 0);
    }
