//! Periodic background loops: event dispatch, photo cleanup and the
//! snapshot rebuild.
//!
//! Each loop drains its task (bounded by `max_batch`), then sleeps for its
//! interval or until shutdown is signalled, whichever comes first.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, error, info};

use super::Error;

/// Async sleep, swappable in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// One unit of periodic work.
#[async_trait]
pub trait BackgroundTask: Send + Sync {
    fn name(&self) -> &'static str;

    /// Do one step. `Ok(true)` means more work may be waiting.
    async fn run_once(&self) -> Result<bool, Error>;
}

/// Schedule for one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSchedule {
    pub interval: Duration,
    pub max_batch: usize,
}

impl LoopSchedule {
    #[must_use]
    pub const fn new(interval: Duration, max_batch: usize) -> Self {
        Self {
            interval,
            max_batch,
        }
    }
}

/// Run `task` until it reports no more work or `max_batch` steps ran.
///
/// Returns the number of steps that did work.
pub async fn drain(task: &dyn BackgroundTask, max_batch: usize) -> Result<usize, Error> {
    let mut processed = 0;
    while processed < max_batch {
        if !task.run_once().await? {
            break;
        }
        processed += 1;
    }
    Ok(processed)
}

/// Drive `task` on `schedule` until `shutdown` flips to `true` or its
/// sender is dropped. Step errors are logged and the loop carries on.
pub async fn run_loop(
    task: Arc<dyn BackgroundTask>,
    sleeper: Arc<dyn Sleeper>,
    schedule: LoopSchedule,
    mut shutdown: watch::Receiver<bool>,
) {
    let name = task.name();
    info!(task = name, interval_ms = schedule.interval.as_millis(), "background loop started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        match drain(task.as_ref(), schedule.max_batch).await {
            Ok(0) => {}
            Ok(processed) => debug!(task = name, processed, "background batch finished"),
            Err(err) => error!(task = name, error = %err, "background step failed"),
        }
        tokio::select! {
            () = sleeper.sleep(schedule.interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    info!(task = name, "background loop stopped");
}
