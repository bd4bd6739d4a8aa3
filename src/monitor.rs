//! Background monitoring: periodic full runs on a worker thread.
//!
//! The worker loops run → sleep until stopped. The stop flag is checked
//! between runs and in short sleep slices, so `stop()` returns promptly
//! even with long intervals. Stopping waits a bounded time for the worker;
//! a scan still in flight is detached rather than blocked on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::engine::AnalysisEngine;
use crate::logging::EventLog;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoringState {
    Idle,
    Running,
}

impl MonitoringState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitoringState::Idle => "idle",
            MonitoringState::Running => "running",
        }
    }
}

impl std::fmt::Display for MonitoringState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

struct Worker {
    handle: JoinHandle<()>,
    done: Receiver<()>,
}

/// Drives an [`AnalysisEngine`] on a fixed interval.
pub struct Monitor {
    engine: Arc<AnalysisEngine>,
    log: Arc<dyn EventLog>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<Worker>>,
}

impl Monitor {
    pub fn new(engine: Arc<AnalysisEngine>, log: Arc<dyn EventLog>) -> Self {
        Self {
            engine,
            log,
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> MonitoringState {
        if self.running.load(Ordering::Acquire) {
            MonitoringState::Running
        } else {
            MonitoringState::Idle
        }
    }

    /// Spawn the worker. Calling while already running logs a warning and
    /// leaves the existing worker untouched.
    pub fn start(&self, interval: Duration) {
        if self.running.swap(true, Ordering::AcqRel) {
            self.log.warn("monitoring already running; start ignored");
            return;
        }
        self.engine.mark_monitoring(true);
        self.log.info(&format!(
            "monitoring started (interval {}s)",
            interval.as_secs()
        ));

        let engine = Arc::clone(&self.engine);
        let running = Arc::clone(&self.running);
        let log = Arc::clone(&self.log);
        let (done_tx, done_rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            while running.load(Ordering::Acquire) {
                let result = engine.run_once();
                log.debug(&format!(
                    "scan finished: {} error(s), {} warning(s), {} performance issue(s)",
                    result.summary.total_errors,
                    result.summary.total_warnings,
                    result.summary.total_performance_issues
                ));

                let deadline = Instant::now() + interval;
                loop {
                    if !running.load(Ordering::Acquire) {
                        break;
                    }
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    thread::sleep(POLL_INTERVAL.min(remaining));
                }
            }
            let _ = done_tx.send(());
        });

        *self.worker.lock().unwrap() = Some(Worker {
            handle,
            done: done_rx,
        });
    }

    /// Signal the worker and wait up to [`STOP_TIMEOUT`] for it to finish.
    /// Idempotent: stopping an idle monitor is a no-op.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.engine.mark_monitoring(false);

        let worker = self.worker.lock().unwrap().take();
        if let Some(worker) = worker {
            match worker.done.recv_timeout(STOP_TIMEOUT) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    let _ = worker.handle.join();
                    self.log.info("monitoring stopped");
                }
                Err(RecvTimeoutError::Timeout) => {
                    // A scan is still in flight; it will exit after finishing.
                    self.log
                        .warn("monitor worker still busy after 5s; detaching");
                }
            }
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}
