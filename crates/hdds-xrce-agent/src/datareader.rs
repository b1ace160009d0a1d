// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Data reader proxy and its asynchronous read loop.
//!
//! Each reader owns one long-lived worker thread. `read` hands the worker a
//! session (delivery bounds, callback, request context) over a channel and
//! returns immediately; the worker polls the middleware with a short
//! per-call timeout and invokes the callback for every sample, in order.
//!
//! A session ends when its sample budget is spent, when the max-duration
//! timer expires, on `stop_read`, or when the middleware reports an error
//! other than `Timeout`. All stop sources funnel into one flag guarded by
//! the reader mutex, and `stop_read` waits on the condvar until the worker
//! has left the session, so no callback runs once it returns.

use crossbeam::channel::{self, Sender};
use parking_lot::{Condvar, Mutex};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crate::config::{AgentConfig, RestartPolicy};
use crate::error::XrceError;
use crate::middleware::Middleware;
use crate::object::{release, Subscriber, Topic};
use crate::timer::{MaxTimeoutHandler, MaxTimer, TimerService, TimerStatus};
use crate::types::{
    CallbackContext, DeliveryControl, EntityId, ObjectKind, ReadCallback, Representation,
};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Per-reader knobs, usually derived from [`AgentConfig`].
#[derive(Clone)]
pub struct ReaderSettings {
    pub read_timeout: Duration,
    pub restart_policy: RestartPolicy,
    /// Shared timer thread; `None` spawns a private one on first use.
    pub timers: Option<Arc<TimerService>>,
    pub timer_thread_name: String,
}

impl ReaderSettings {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            read_timeout: config.read_timeout,
            restart_policy: config.restart_policy,
            timers: None,
            timer_thread_name: config.timer_thread_name.clone(),
        }
    }

    pub fn with_timer_service(mut self, timers: Arc<TimerService>) -> Self {
        self.timers = Some(timers);
        self
    }

    pub fn restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Shared read state
// ---------------------------------------------------------------------------

struct ReadSession {
    control: DeliveryControl,
    callback: ReadCallback,
    context: CallbackContext,
}

#[derive(Default)]
struct ReadFlags {
    running: bool,
    stop_requested: bool,
}

/// State shared by the reader handle, its worker and its timer.
struct ReadState {
    reader_id: EntityId,
    flags: Mutex<ReadFlags>,
    cond: Condvar,
}

impl ReadState {
    fn new(reader_id: EntityId) -> Self {
        Self {
            reader_id,
            flags: Mutex::new(ReadFlags::default()),
            cond: Condvar::new(),
        }
    }

    fn is_running(&self) -> bool {
        self.flags.lock().running
    }

    fn begin(&self) {
        let mut flags = self.flags.lock();
        flags.running = true;
        flags.stop_requested = false;
    }

    fn finish(&self) {
        let mut flags = self.flags.lock();
        flags.running = false;
        flags.stop_requested = false;
        self.cond.notify_all();
    }

    fn stop_requested(&self) -> bool {
        self.flags.lock().stop_requested
    }

    /// Flag the running session to stop. Returns whether one was running.
    fn request_stop(&self) -> bool {
        let mut flags = self.flags.lock();
        if !flags.running {
            return false;
        }
        flags.stop_requested = true;
        self.cond.notify_all();
        true
    }

    /// Flag the running session to stop and wait until the worker left it.
    fn stop_and_wait(&self) -> bool {
        let mut flags = self.flags.lock();
        if !flags.running {
            return false;
        }
        flags.stop_requested = true;
        self.cond.notify_all();
        while flags.running {
            self.cond.wait(&mut flags);
        }
        true
    }

    /// Sleep up to `delay`, waking early on stop. Returns true if stopped.
    fn pause(&self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        let mut flags = self.flags.lock();
        while !flags.stop_requested {
            if self.cond.wait_until(&mut flags, deadline).timed_out() {
                break;
            }
        }
        flags.stop_requested
    }
}

impl MaxTimeoutHandler for ReadState {
    fn on_max_timeout(&self, status: TimerStatus) {
        match status {
            TimerStatus::Expired => {
                if self.request_stop() {
                    log::debug!(
                        "[reader] datareader {:#06x} max elapsed time reached",
                        self.reader_id
                    );
                }
            }
            TimerStatus::Cancelled => {}
        }
    }
}

/// Clears `running` even if the callback panics.
struct SessionGuard<'a>(&'a ReadState);

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

fn read_task(
    state: &ReadState,
    middleware: &dyn Middleware,
    read_timeout: Duration,
    session: ReadSession,
) {
    let _guard = SessionGuard(state);
    let reader_id = state.reader_id;
    let control = session.control;
    let mut delivered: u32 = 0;
    let mut last: Option<(Instant, usize)> = None;

    log::debug!(
        "[reader] datareader {:#06x} session started (request {})",
        reader_id,
        session.context.request_id
    );

    loop {
        if let Some((at, size)) = last {
            let delay = control.throttle_delay(size, at.elapsed());
            if !delay.is_zero() && state.pause(delay) {
                break;
            }
        }
        if state.stop_requested() {
            break;
        }

        match middleware.read_data(reader_id, read_timeout) {
            Ok(sample) => {
                // Delivered even if a stop raced the read: the middleware
                // has already consumed it, and the stopper waits for us.
                let size = sample.len();
                log::trace!(
                    "[reader] datareader {:#06x} delivering {} bytes",
                    reader_id,
                    size
                );
                (session.callback)(&session.context, sample);
                delivered += 1;
                last = Some((Instant::now(), size));
                if control.samples_exhausted(delivered) || state.stop_requested() {
                    break;
                }
            }
            Err(XrceError::Timeout) => {}
            Err(e) => {
                log::debug!("[reader] datareader {:#06x} read failed: {}", reader_id, e);
                break;
            }
        }
    }

    log::debug!(
        "[reader] datareader {:#06x} session ended after {} sample(s)",
        reader_id,
        delivered
    );
}

// ---------------------------------------------------------------------------
// DataReader
// ---------------------------------------------------------------------------

/// Proxy of a middleware data reader, with its read worker and max timer.
pub struct DataReader {
    id: EntityId,
    subscriber: Arc<Subscriber>,
    topic: Arc<Topic>,
    settings: ReaderSettings,
    state: Arc<ReadState>,
    timer: MaxTimer,
    /// Serializes `read` / `stop_read`.
    control: Mutex<()>,
    sessions: Option<Sender<ReadSession>>,
    worker: Option<JoinHandle<()>>,
    worker_thread: ThreadId,
}

impl DataReader {
    /// Create the middleware reader with default settings.
    pub fn create(
        id: EntityId,
        subscriber: Arc<Subscriber>,
        representation: &Representation,
        topic_lookup: impl FnOnce(EntityId) -> Option<Arc<Topic>>,
    ) -> Result<Arc<Self>, XrceError> {
        Self::create_with_settings(
            id,
            subscriber,
            representation,
            topic_lookup,
            ReaderSettings::default(),
        )
    }

    /// Create the middleware reader, resolve its topic proxy and start the
    /// worker. The middleware entity is deleted again on failure.
    pub fn create_with_settings(
        id: EntityId,
        subscriber: Arc<Subscriber>,
        representation: &Representation,
        topic_lookup: impl FnOnce(EntityId) -> Option<Arc<Topic>>,
        settings: ReaderSettings,
    ) -> Result<Arc<Self>, XrceError> {
        let middleware = Arc::clone(subscriber.middleware());
        let topic_id = match representation {
            Representation::ByReference(r) => {
                middleware.create_datareader_by_ref(id, subscriber.id(), r)?
            }
            Representation::ByXml(xml) => {
                middleware.create_datareader_by_xml(id, subscriber.id(), xml)?
            }
        };

        let Some(topic) = topic_lookup(topic_id) else {
            release(ObjectKind::DataReader, id, middleware.delete_datareader(id));
            return Err(XrceError::Unresolvable(format!(
                "datareader {:#06x} is bound to unknown topic object {:#06x}",
                id, topic_id
            )));
        };

        let state = Arc::new(ReadState::new(id));
        let (tx, rx) = channel::unbounded::<ReadSession>();
        let worker_state = Arc::clone(&state);
        let worker_middleware = Arc::clone(&middleware);
        let read_timeout = settings.read_timeout;

        let spawned = thread::Builder::new()
            .name(format!("hdds-xrce-rd-{:04x}", id))
            .spawn(move || {
                // Exits once the reader drops its sender.
                for session in rx.iter() {
                    read_task(&worker_state, worker_middleware.as_ref(), read_timeout, session);
                }
            });
        let worker = match spawned {
            Ok(worker) => worker,
            Err(e) => {
                release(ObjectKind::DataReader, id, middleware.delete_datareader(id));
                return Err(XrceError::Resources(format!(
                    "failed to spawn reader worker: {}",
                    e
                )));
            }
        };

        let handler: Arc<dyn MaxTimeoutHandler> = state.clone();
        let handler: Weak<dyn MaxTimeoutHandler> = Arc::downgrade(&handler);
        let timer = match &settings.timers {
            Some(service) => MaxTimer::shared(Arc::clone(service), handler),
            None => MaxTimer::standalone(settings.timer_thread_name.clone(), handler),
        };

        Ok(Arc::new(Self {
            id,
            subscriber,
            topic,
            worker_thread: worker.thread().id(),
            settings,
            state,
            timer,
            control: Mutex::new(()),
            sessions: Some(tx),
            worker: Some(worker),
        }))
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn subscriber(&self) -> &Arc<Subscriber> {
        &self.subscriber
    }

    pub fn topic(&self) -> &Arc<Topic> {
        &self.topic
    }

    fn middleware(&self) -> &Arc<dyn Middleware> {
        self.subscriber.middleware()
    }

    pub fn matched(&self, representation: &Representation) -> bool {
        match representation {
            Representation::ByReference(r) => {
                self.middleware().matched_datareader_from_ref(self.id, r)
            }
            Representation::ByXml(xml) => {
                self.middleware().matched_datareader_from_xml(self.id, xml)
            }
        }
    }

    /// Whether a read session is in progress.
    pub fn is_reading(&self) -> bool {
        self.state.is_running()
    }

    fn on_worker(&self) -> bool {
        thread::current().id() == self.worker_thread
    }

    /// Start a read session and return without waiting for samples.
    ///
    /// Samples are passed to `callback` on the reader's worker, tagged with
    /// `context`. A session already in progress is replaced or rejected
    /// according to the reader's [`RestartPolicy`].
    pub fn read(
        &self,
        control: DeliveryControl,
        callback: ReadCallback,
        context: CallbackContext,
    ) -> Result<(), XrceError> {
        control.validate()?;
        if !self.middleware().has_datareader(self.id) {
            return Err(XrceError::NotFound {
                kind: ObjectKind::DataReader,
                id: self.id,
            });
        }

        // A callback may not restart its own session, and must not wait on
        // `control`: its holder may be waiting for this very callback.
        if self.on_worker() {
            log::warn!(
                "[reader] datareader {:#06x} read request {} from its own callback rejected",
                self.id,
                context.request_id
            );
            return Err(XrceError::Busy(self.id));
        }

        let _control = self.control.lock();
        if self.state.is_running() {
            if self.settings.restart_policy == RestartPolicy::Reject {
                log::warn!(
                    "[reader] datareader {:#06x} busy, read request {} rejected",
                    self.id,
                    context.request_id
                );
                return Err(XrceError::Busy(self.id));
            }
            log::debug!(
                "[reader] datareader {:#06x} replacing running session",
                self.id
            );
            self.state.stop_and_wait();
        }

        // Any pending period belongs to a finished session.
        self.timer.stop_max_timer();
        self.state.begin();

        if let Some(max_elapsed) = control.max_elapsed() {
            if let Err(e) = self.timer.init_max_timer(max_elapsed) {
                self.state.finish();
                return Err(e);
            }
        }

        let session = ReadSession {
            control,
            callback,
            context,
        };
        let sent = self
            .sessions
            .as_ref()
            .is_some_and(|tx| tx.send(session).is_ok());
        if !sent {
            self.timer.stop_max_timer();
            self.state.finish();
            return Err(XrceError::Resources(format!(
                "datareader {:#06x} worker is gone",
                self.id
            )));
        }
        Ok(())
    }

    /// Stop the running session. Returns false if none was active.
    ///
    /// Blocks until the worker has left the session: no callback of this
    /// reader runs after it returns. Called from inside a callback it only
    /// requests the stop.
    pub fn stop_read(&self) -> bool {
        if self.on_worker() {
            return self.state.request_stop();
        }
        let _control = self.control.lock();
        let stopped = self.state.stop_and_wait();
        self.timer.stop_max_timer();
        if stopped {
            log::debug!("[reader] datareader {:#06x} read stopped", self.id);
        }
        stopped
    }

    /// Timer hook: `Expired` ends the running session.
    pub fn on_max_timeout(&self, status: TimerStatus) {
        self.state.on_max_timeout(status);
    }
}

impl Drop for DataReader {
    fn drop(&mut self) {
        self.stop_read();
        self.sessions.take();
        if let Some(worker) = self.worker.take() {
            if self.on_worker() {
                // Last handle released from a callback; the worker exits on
                // its own once the session returns.
                drop(worker);
            } else if worker.join().is_err() {
                log::warn!("[reader] datareader {:#06x} worker panicked", self.id);
            }
        }
        self.timer.stop_max_timer();
        release(
            ObjectKind::DataReader,
            self.id,
            self.middleware().delete_datareader(self.id),
        );
    }
}
