//! [`PeriodicTask`] – start/stop lifecycle for a background loop.
//!
//! A periodic task is a tokio task whose body loops until its [`RunFlag`]
//! clears.  The lifecycle rules are:
//!
//! - [`start`][PeriodicTask::start] spawns the body with a fresh flag.  It is
//!   a no-op while a previous body is still running.
//! - [`stop`][PeriodicTask::stop] clears the flag and then waits a fixed
//!   grace period so the body can finish its current cycle.  The task is
//!   never aborted mid-cycle; a body that has not noticed the flag after the
//!   grace period is detached and exits on its next check.
//!
//! Because every start gets its own flag, a stop followed quickly by a start
//! cannot revive the old body.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use scs_runtime::task::PeriodicTask;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let task = PeriodicTask::new("ticker", Duration::from_millis(5));
//! assert!(task.start(|flag| async move {
//!     while flag.is_running() {
//!         tokio::time::sleep(Duration::from_millis(1)).await;
//!     }
//! }));
//! assert!(task.is_running());
//! task.stop().await;
//! assert!(!task.is_running());
//! # }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Cooperative stop signal handed to a task body.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    /// `false` once [`PeriodicTask::stop`] has been requested.
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

struct Run {
    flag: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Owner of at most one running background loop.
pub struct PeriodicTask {
    name: &'static str,
    grace: Duration,
    run: Mutex<Option<Run>>,
}

impl PeriodicTask {
    pub fn new(name: &'static str, grace: Duration) -> Self {
        Self {
            name,
            grace,
            run: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Spawn `body` unless a previous body is still running.
    ///
    /// Returns `true` if a new task was spawned.  Must be called from inside
    /// a tokio runtime.
    pub fn start<F, Fut>(&self, body: F) -> bool
    where
        F: FnOnce(RunFlag) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut run = self.lock();
        if run.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!(task = self.name, "already running, start ignored");
            return false;
        }

        let flag = Arc::new(AtomicBool::new(true));
        let handle = tokio::spawn(body(RunFlag(Arc::clone(&flag))));
        *run = Some(Run { flag, handle });
        info!(task = self.name, "task started");
        true
    }

    /// Request a stop and wait out the grace period.
    ///
    /// Returns `false` if nothing was running.
    pub async fn stop(&self) -> bool {
        let taken = self.lock().take();
        let Some(run) = taken else {
            return false;
        };

        run.flag.store(false, Ordering::Release);
        tokio::time::sleep(self.grace).await;

        if !run.handle.is_finished() {
            debug!(task = self.name, "body still finishing after grace period; detached");
        }
        info!(task = self.name, "task stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Option<Run>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if let Some(run) = self.lock().take() {
            run.flag.store(false, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn counting_body(
        counter: Arc<AtomicU32>,
    ) -> impl FnOnce(RunFlag) -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>> {
        move |flag| {
            Box::pin(async move {
                while flag.is_running() {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_a_no_op() {
        let task = PeriodicTask::new("test", Duration::from_millis(50));
        let counter = Arc::new(AtomicU32::new(0));

        assert!(task.start(counting_body(Arc::clone(&counter))));
        assert!(!task.start(counting_body(Arc::clone(&counter))));

        tokio::time::sleep(Duration::from_millis(95)).await;
        // One body ticking every 10 ms: 10 iterations (t = 0..=90).
        assert_eq!(counter.load(Ordering::SeqCst), 10);
        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_the_body_within_grace() {
        let task = PeriodicTask::new("test", Duration::from_millis(50));
        let counter = Arc::new(AtomicU32::new(0));
        task.start(counting_body(Arc::clone(&counter)));
        tokio::time::sleep(Duration::from_millis(35)).await;

        assert!(task.stop().await);
        assert!(!task.is_running());

        let frozen = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_without_start_returns_false() {
        let task = PeriodicTask::new("test", Duration::from_millis(50));
        assert!(!task.stop().await);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop_uses_a_fresh_flag() {
        let task = PeriodicTask::new("test", Duration::from_millis(50));
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        task.start(counting_body(Arc::clone(&first)));
        tokio::time::sleep(Duration::from_millis(15)).await;
        task.stop().await;
        let first_total = first.load(Ordering::SeqCst);

        assert!(task.start(counting_body(Arc::clone(&second))));
        tokio::time::sleep(Duration::from_millis(45)).await;
        assert_eq!(first.load(Ordering::SeqCst), first_total);
        assert!(second.load(Ordering::SeqCst) > 0);
        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn finished_body_does_not_block_restart() {
        let task = PeriodicTask::new("oneshot", Duration::from_millis(10));
        task.start(|_flag| async {});
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!task.is_running());
        assert!(task.start(|_flag| async {}));
    }
}
