use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::host::{Scheduler, TimerId};

#[derive(Default)]
struct State {
    last_run: Cell<Option<Duration>>,
    timer: Cell<Option<TimerId>>,
    pending: RefCell<Option<Box<dyn FnOnce()>>>,
}

/// Runs a task at most once per `wait`.
///
/// The first call runs immediately. Calls inside the window collapse into a
/// single trailing run at the end of it, using the most recent task.
pub(crate) struct Throttle {
    wait: Duration,
    state: Rc<State>,
}

impl Throttle {
    pub(crate) fn new(wait: Duration) -> Self {
        Self {
            wait,
            state: Rc::default(),
        }
    }

    pub(crate) fn call<S: Scheduler + ?Sized>(&self, scheduler: &S, task: impl FnOnce() + 'static) {
        let now = scheduler.now();
        let elapsed = self
            .state
            .last_run
            .get()
            .map(|last| now.saturating_sub(last));

        let ready = elapsed.is_none_or(|elapsed| elapsed >= self.wait);
        if ready && self.state.timer.get().is_none() {
            self.state.last_run.set(Some(now));
            task();
            return;
        }

        *self.state.pending.borrow_mut() = Some(Box::new(task));
        if self.state.timer.get().is_some() {
            return;
        }

        let delay = self.wait.saturating_sub(elapsed.unwrap_or_default());
        let fire_at = now + delay;
        let state = Rc::downgrade(&self.state);
        let id = scheduler.set_timeout(
            delay,
            Box::new(move || {
                let Some(state) = state.upgrade() else {
                    return;
                };
                state.timer.set(None);
                state.last_run.set(Some(fire_at));
                let task = state.pending.borrow_mut().take();
                if let Some(task) = task {
                    task();
                }
            }),
        );
        self.state.timer.set(Some(id));
    }

    /// Drop any trailing run.
    pub(crate) fn cancel<S: Scheduler + ?Sized>(&self, scheduler: &S) {
        if let Some(id) = self.state.timer.take() {
            scheduler.clear_timer(id);
        }
        self.state.pending.borrow_mut().take();
    }
}
