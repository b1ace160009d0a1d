// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Single-shot max-duration timers.
//!
//! A [`TimerService`] is one background thread owning a deadline table. It
//! receives `Arm` / `Cancel` commands over a channel and waits on the channel
//! with the nearest deadline, so arming never blocks the caller and an idle
//! service costs nothing. Several [`MaxTimer`]s may share one service.
//!
//! Every armed period ends with exactly one call to
//! [`MaxTimeoutHandler::on_max_timeout`]: `Expired` when the deadline
//! passed, `Cancelled` when it was stopped, replaced, or the service shut
//! down first. Handlers run on the service thread.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crate::error::XrceError;

/// Outcome of one armed timer period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    /// The deadline passed.
    Expired,
    /// The period was stopped or replaced before the deadline.
    Cancelled,
}

/// Receives the outcome of a [`MaxTimer`] period.
pub trait MaxTimeoutHandler: Send + Sync {
    fn on_max_timeout(&self, status: TimerStatus);
}

type TimerId = u64;

enum TimerCommand {
    Arm {
        id: TimerId,
        deadline: Instant,
        handler: Weak<dyn MaxTimeoutHandler>,
    },
    Cancel {
        id: TimerId,
        /// Signalled once the cancellation has been processed.
        ack: Option<Sender<()>>,
    },
}

struct PendingTimer {
    deadline: Instant,
    handler: Weak<dyn MaxTimeoutHandler>,
}

fn notify(handler: &Weak<dyn MaxTimeoutHandler>, status: TimerStatus) {
    if let Some(handler) = handler.upgrade() {
        handler.on_max_timeout(status);
    }
}

// ---------------------------------------------------------------------------
// Timer service
// ---------------------------------------------------------------------------

/// Execution context shared by max-duration timers.
///
/// Dropping the service cancels every pending period and joins the thread.
pub struct TimerService {
    commands: Option<Sender<TimerCommand>>,
    thread: Option<JoinHandle<()>>,
    thread_id: ThreadId,
    next_id: AtomicU64,
}

impl TimerService {
    /// Spawn the service thread.
    ///
    /// Fails with `XrceError::Resources` if the thread cannot be created.
    pub fn spawn(name: &str) -> Result<Arc<Self>, XrceError> {
        let (tx, rx) = channel::unbounded::<TimerCommand>();
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || timer_loop(rx))
            .map_err(|e| XrceError::Resources(format!("failed to spawn timer thread: {}", e)))?;
        let thread_id = handle.thread().id();
        log::debug!("[timer] service '{}' started", name);
        Ok(Arc::new(Self {
            commands: Some(tx),
            thread: Some(handle),
            thread_id,
            next_id: AtomicU64::new(1),
        }))
    }

    /// True when called from inside a timeout handler.
    pub fn is_service_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    fn arm(
        &self,
        deadline: Instant,
        handler: Weak<dyn MaxTimeoutHandler>,
    ) -> Result<TimerId, XrceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let sent = self.commands.as_ref().map(|tx| {
            tx.send(TimerCommand::Arm {
                id,
                deadline,
                handler,
            })
        });
        match sent {
            Some(Ok(())) => Ok(id),
            _ => Err(XrceError::Resources("timer service stopped".into())),
        }
    }

    /// Cancel a period and wait until the service has processed it, so that
    /// no handler call for `id` is still running when this returns. From the
    /// service thread itself the cancellation is queued without waiting.
    fn cancel(&self, id: TimerId) {
        let Some(tx) = self.commands.as_ref() else {
            return;
        };
        if self.is_service_thread() {
            let _ = tx.send(TimerCommand::Cancel { id, ack: None });
            return;
        }
        let (ack_tx, ack_rx) = channel::bounded(1);
        if tx
            .send(TimerCommand::Cancel {
                id,
                ack: Some(ack_tx),
            })
            .is_ok()
        {
            // Err means the service exited; nothing can fire any more.
            let _ = ack_rx.recv();
        }
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        // Disconnecting the channel makes the loop cancel everything and exit.
        drop(self.commands.take());
        if let Some(handle) = self.thread.take() {
            if handle.thread().id() != std::thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

fn timer_loop(commands: Receiver<TimerCommand>) {
    let mut pending: HashMap<TimerId, PendingTimer> = HashMap::new();

    loop {
        let next_deadline = pending.values().map(|p| p.deadline).min();
        let received = match next_deadline {
            Some(deadline) => commands.recv_deadline(deadline),
            None => commands.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(TimerCommand::Arm {
                id,
                deadline,
                handler,
            }) => {
                pending.insert(id, PendingTimer { deadline, handler });
            }
            Ok(TimerCommand::Cancel { id, ack }) => {
                if let Some(timer) = pending.remove(&id) {
                    notify(&timer.handler, TimerStatus::Cancelled);
                }
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                for (_, timer) in pending.drain() {
                    notify(&timer.handler, TimerStatus::Cancelled);
                }
                break;
            }
        }

        fire_expired(&mut pending);
    }

    log::debug!("[timer] service stopped");
}

fn fire_expired(pending: &mut HashMap<TimerId, PendingTimer>) {
    let now = Instant::now();
    let mut expired: Vec<(Instant, TimerId)> = pending
        .iter()
        .filter(|(_, p)| p.deadline <= now)
        .map(|(&id, p)| (p.deadline, id))
        .collect();
    expired.sort_unstable();
    for (_, id) in expired {
        if let Some(timer) = pending.remove(&id) {
            notify(&timer.handler, TimerStatus::Expired);
        }
    }
}

// ---------------------------------------------------------------------------
// Max timer
// ---------------------------------------------------------------------------

/// Single-shot countdown owned by one handler (e.g. a data reader).
///
/// Holds at most one pending period; re-arming cancels the previous one.
pub struct MaxTimer {
    service: Mutex<Option<Arc<TimerService>>>,
    thread_name: String,
    handler: Weak<dyn MaxTimeoutHandler>,
    pending: Mutex<Option<TimerId>>,
}

impl MaxTimer {
    /// Timer with its own service thread, spawned on first arm.
    pub fn standalone(
        thread_name: impl Into<String>,
        handler: Weak<dyn MaxTimeoutHandler>,
    ) -> Self {
        Self {
            service: Mutex::new(None),
            thread_name: thread_name.into(),
            handler,
            pending: Mutex::new(None),
        }
    }

    /// Timer running on a shared service.
    pub fn shared(service: Arc<TimerService>, handler: Weak<dyn MaxTimeoutHandler>) -> Self {
        Self {
            service: Mutex::new(Some(service)),
            thread_name: String::new(),
            handler,
            pending: Mutex::new(None),
        }
    }

    fn service(&self) -> Result<Arc<TimerService>, XrceError> {
        let mut slot = self.service.lock();
        if let Some(service) = slot.as_ref() {
            return Ok(Arc::clone(service));
        }
        let service = TimerService::spawn(&self.thread_name)?;
        *slot = Some(Arc::clone(&service));
        Ok(service)
    }

    /// Arm the timer for `duration`, replacing any pending period.
    ///
    /// Reports `XrceError::Resources` when no execution context is available.
    pub fn init_max_timer(&self, duration: Duration) -> Result<(), XrceError> {
        let service = self.service()?;
        let previous = {
            let mut pending = self.pending.lock();
            let id = service.arm(Instant::now() + duration, self.handler.clone())?;
            pending.replace(id)
        };
        if let Some(previous) = previous {
            service.cancel(previous);
        }
        Ok(())
    }

    /// Arm the timer and let it run in the background; failures are logged.
    pub fn run_max_timer(&self, duration: Duration) {
        if let Err(e) = self.init_max_timer(duration) {
            log::warn!("[timer] cannot arm max timer ({:?}): {}", duration, e);
        }
    }

    /// Cancel the pending period. No-op if it already fired or none is armed.
    pub fn stop_max_timer(&self) {
        let Some(id) = self.pending.lock().take() else {
            return;
        };
        let service = self.service.lock().clone();
        if let Some(service) = service {
            service.cancel(id);
        }
    }
}

impl Drop for MaxTimer {
    fn drop(&mut self) {
        self.stop_max_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Recorder {
        expired: AtomicUsize,
        cancelled: AtomicUsize,
    }

    impl MaxTimeoutHandler for Recorder {
        fn on_max_timeout(&self, status: TimerStatus) {
            match status {
                TimerStatus::Expired => self.expired.fetch_add(1, Ordering::SeqCst),
                TimerStatus::Cancelled => self.cancelled.fetch_add(1, Ordering::SeqCst),
            };
        }
    }

    fn handler(recorder: &Arc<Recorder>) -> Weak<dyn MaxTimeoutHandler> {
        let weak: Weak<Recorder> = Arc::downgrade(recorder);
        weak
    }

    #[test]
    fn test_timer_fires_once() {
        let recorder = Arc::new(Recorder::default());
        let timer = MaxTimer::standalone("test-timer", handler(&recorder));

        timer.init_max_timer(Duration::from_millis(20)).unwrap();
        std::thread::sleep(Duration::from_millis(80));

        assert_eq!(recorder.expired.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.cancelled.load(Ordering::SeqCst), 0);

        // Stopping after expiry is a no-op.
        timer.stop_max_timer();
        assert_eq!(recorder.cancelled.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stop_reports_cancelled() {
        let recorder = Arc::new(Recorder::default());
        let timer = MaxTimer::standalone("test-timer", handler(&recorder));

        timer.init_max_timer(Duration::from_secs(5)).unwrap();
        timer.stop_max_timer();

        // stop_max_timer is synchronous: the outcome is already delivered.
        assert_eq!(recorder.cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.expired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_rearm_replaces_pending_deadline() {
        let recorder = Arc::new(Recorder::default());
        let timer = MaxTimer::standalone("test-timer", handler(&recorder));

        timer.init_max_timer(Duration::from_secs(5)).unwrap();
        timer.init_max_timer(Duration::from_millis(10)).unwrap();
        std::thread::sleep(Duration::from_millis(60));

        assert_eq!(recorder.cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.expired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_max_timer_does_not_block() {
        let recorder = Arc::new(Recorder::default());
        let timer = MaxTimer::standalone("test-timer", handler(&recorder));

        let start = Instant::now();
        timer.run_max_timer(Duration::from_millis(200));
        assert!(start.elapsed() < Duration::from_millis(100));
        timer.stop_max_timer();
        assert_eq!(recorder.cancelled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shared_service_orders_deadlines() {
        let service = TimerService::spawn("test-shared-timer").unwrap();
        let early = Arc::new(Recorder::default());
        let late = Arc::new(Recorder::default());
        let t_late = MaxTimer::shared(Arc::clone(&service), handler(&late));
        let t_early = MaxTimer::shared(Arc::clone(&service), handler(&early));

        t_late.init_max_timer(Duration::from_millis(120)).unwrap();
        t_early.init_max_timer(Duration::from_millis(10)).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(early.expired.load(Ordering::SeqCst), 1);
        assert_eq!(late.expired.load(Ordering::SeqCst), 0);

        drop(t_late);
        assert_eq!(late.cancelled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_service_shutdown_cancels_pending() {
        let recorder = Arc::new(Recorder::default());
        let service = TimerService::spawn("test-shutdown-timer").unwrap();
        let id = service
            .arm(Instant::now() + Duration::from_secs(5), handler(&recorder))
            .unwrap();
        assert!(id > 0);

        drop(service);
        assert_eq!(recorder.cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.expired.load(Ordering::SeqCst), 0);
    }

    struct SelfStopping {
        timer: Mutex<Option<Arc<MaxTimer>>>,
        calls: AtomicUsize,
    }

    impl MaxTimeoutHandler for SelfStopping {
        fn on_max_timeout(&self, _status: TimerStatus) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(timer) = self.timer.lock().as_ref() {
                timer.stop_max_timer();
            }
        }
    }

    #[test]
    fn test_stop_from_handler_does_not_deadlock() {
        let handler = Arc::new(SelfStopping {
            timer: Mutex::new(None),
            calls: AtomicUsize::new(0),
        });
        let weak: Weak<SelfStopping> = Arc::downgrade(&handler);
        let timer = Arc::new(MaxTimer::standalone("test-self-stop", weak));
        *handler.timer.lock() = Some(Arc::clone(&timer));

        timer.init_max_timer(Duration::from_millis(10)).unwrap();
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);

        // Break the cycle so both are freed.
        handler.timer.lock().take();
    }
}
