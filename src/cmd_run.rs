//! `tether run`: drive the configured cron jobs from one worker thread.

use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use tether_config::{Config, ConfigValidator, JobAction, ScheduledJob};
use tether_cron::{CronTask, Scheduler};
use tether_runloop::{StopOutcome, Thread};

/// Run the scheduler thread until Ctrl-C or until `duration` elapses.
pub(crate) async fn handle_run_command(
    config: Config,
    duration: Option<Duration>,
) -> Result<(), Box<dyn std::error::Error>> {
    let warnings = ConfigValidator::validate(&config).into_result()?;
    for warning in &warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }

    info!("Starting Tether v{}", env!("CARGO_PKG_VERSION"));

    let thread = Arc::new(Thread::new(
        config.thread.name.clone(),
        config.thread.runtime.clone(),
    ));
    let scheduler = Arc::new(Scheduler::new(&config.thread.name));

    if config.scheduler.enabled {
        for job in &config.scheduler.jobs {
            let mut task = CronTask::parse(&job.schedule, job_action(job))?;
            if job.once_per_minute {
                task = task.once_per_minute();
            }
            let id = scheduler.add_cron_task(task)?;
            info!(job = %job.id, schedule = %job.schedule, %id, "Job scheduled");
        }
    } else {
        info!("Scheduler disabled");
    }

    thread.attach(scheduler.clone())?;
    thread.start()?;
    info!(thread = thread.name(), jobs = config.scheduler.jobs.len(), "Thread running");

    let wait_for_deadline = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Received Ctrl-C, shutting down");
        }
        _ = wait_for_deadline => {
            info!("Run duration elapsed, shutting down");
        }
    }

    let timeout = config.thread.runtime.stop_timeout();
    let stopping = thread.clone();
    let outcome = tokio::task::spawn_blocking(move || stopping.stop(timeout)).await??;

    let snapshot = thread.metrics().snapshot();
    match outcome {
        StopOutcome::Graceful => info!(
            iterations = snapshot.iterations,
            invokes = snapshot.invokes_executed,
            task_runs = snapshot.task_runs,
            "Thread stopped"
        ),
        StopOutcome::Forced => warn!(
            timeout_secs = timeout.as_secs(),
            overruns = snapshot.task_overruns,
            "Thread did not exit in time and was force-stopped"
        ),
    }

    Ok(())
}

/// Build the closure a job runs on the worker thread.
fn job_action(job: &ScheduledJob) -> impl Fn() + Send + Sync + 'static {
    let id = job.id.clone();
    let action = job.action.clone();
    move || match &action {
        JobAction::Log { message } => info!(job = %id, "{}", message),
        JobAction::Command { program, args } => spawn_command(&id, program, args),
    }
}

/// Spawn a job's process and reap it off the worker thread.
fn spawn_command(id: &str, program: &str, args: &[String]) {
    match Command::new(program).args(args).spawn() {
        Ok(mut child) => {
            info!(job = %id, program, pid = child.id(), "Command spawned");
            let id = id.to_string();
            std::thread::spawn(move || match child.wait() {
                Ok(status) if status.success() => info!(job = %id, "Command finished"),
                Ok(status) => warn!(job = %id, %status, "Command exited with failure"),
                Err(e) => error!(job = %id, "Failed to wait for command: {}", e),
            });
        }
        Err(e) => error!(job = %id, program, "Failed to spawn command: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_action_runs() {
        let job = ScheduledJob {
            id: "log".to_string(),
            schedule: "* * * * *".to_string(),
            action: JobAction::Log {
                message: "alive".to_string(),
            },
            once_per_minute: true,
        };
        let action = job_action(&job);
        action();
        action();
    }

    #[test]
    fn test_missing_program_is_logged_not_panicking() {
        spawn_command("missing", "/nonexistent/tether-test-program", &[]);
    }

    #[tokio::test]
    async fn test_run_with_duration_stops_gracefully() {
        let mut config = Config::default();
        config.thread.name = "run-test".to_string();
        config.scheduler.jobs.push(ScheduledJob {
            id: "tick".to_string(),
            schedule: "* * * * *".to_string(),
            action: JobAction::Log {
                message: "tick".to_string(),
            },
            once_per_minute: true,
        });

        handle_run_command(config, Some(Duration::from_millis(50)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_schedule() {
        let mut config = Config::default();
        config.scheduler.jobs.push(ScheduledJob {
            id: "bad".to_string(),
            schedule: "* * *".to_string(),
            action: JobAction::Log {
                message: "never".to_string(),
            },
            once_per_minute: true,
        });

        let err = handle_run_command(config, Some(Duration::from_millis(10)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("scheduler.jobs[0].schedule"));
    }
}
