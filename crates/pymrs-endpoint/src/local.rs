//! A [`Scheduler`] on a tokio [`LocalSet`](tokio::task::LocalSet).
//!
//! Endpoints are `!Send`, so their timers run as local tasks. Every method
//! that schedules must be called from inside a `LocalSet`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::host::{Scheduler, TimerId};

/// Timers as local tokio tasks, each cancelled through its own token.
pub struct LocalScheduler {
    start: Instant,
    next_id: Cell<TimerId>,
    timers: Rc<RefCell<HashMap<TimerId, CancellationToken>>>,
}

impl LocalScheduler {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            next_id: Cell::new(0),
            timers: Rc::default(),
        }
    }

    /// Number of timers that have not fired (timeouts) or been cleared.
    pub fn active_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    fn register(&self) -> (TimerId, CancellationToken) {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let token = CancellationToken::new();
        self.timers.borrow_mut().insert(id, token.clone());
        (id, token)
    }
}

impl Default for LocalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for LocalScheduler {
    fn set_interval(&self, period: Duration, mut task: Box<dyn FnMut()>) -> TimerId {
        let (id, token) = self.register();
        let period = period.max(Duration::from_millis(1));

        tokio::task::spawn_local(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => task(),
                }
            }
            trace!(timer = id, "interval stopped");
        });
        id
    }

    fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerId {
        let (id, token) = self.register();
        let timers = Rc::downgrade(&self.timers);

        tokio::task::spawn_local(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Some(timers) = timers.upgrade() {
                        timers.borrow_mut().remove(&id);
                    }
                    task();
                }
            }
        });
        id
    }

    fn clear_timer(&self, id: TimerId) {
        if let Some(token) = self.timers.borrow_mut().remove(&id) {
            token.cancel();
        }
    }

    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for LocalScheduler {
    fn drop(&mut self) {
        for (_, token) in self.timers.borrow_mut().drain() {
            token.cancel();
        }
    }
}

impl std::fmt::Debug for LocalScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalScheduler")
            .field("active_timers", &self.active_timers())
            .finish()
    }
}
