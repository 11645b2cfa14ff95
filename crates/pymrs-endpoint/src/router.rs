use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

use pymrs_frame::{Message, MessageKind};
use tracing::warn;

/// Error returned by a message callback.
pub type CallbackError = Box<dyn std::error::Error>;

/// Result of a message callback.
pub type CallbackResult = Result<(), CallbackError>;

type Callback = Rc<dyn Fn(&str) -> CallbackResult>;

/// Dispatch table from message kind to ordered callbacks.
///
/// Callbacks are isolated from each other: an `Err` or a panic in one is
/// logged and the rest still run. No borrow is held while callbacks run, so a
/// callback may register further callbacks or clear the router.
#[derive(Default)]
pub struct MessageRouter {
    routes: RefCell<HashMap<MessageKind, Vec<Callback>>>,
    generation: Cell<u64>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback for `kind`. Callbacks run in registration order.
    pub fn register(
        &self,
        kind: MessageKind,
        callback: impl Fn(&str) -> CallbackResult + 'static,
    ) {
        self.routes
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push(Rc::new(callback));
    }

    /// Invoke every callback registered for the message's kind.
    ///
    /// Returns how many callbacks were invoked. Unknown kinds are ignored.
    pub fn dispatch(&self, message: &Message) -> usize {
        let callbacks: Vec<Callback> = match self.routes.borrow().get(&message.kind) {
            Some(callbacks) => callbacks.clone(),
            None => return 0,
        };

        let generation = self.generation.get();
        let mut invoked = 0;
        for callback in callbacks {
            // Cleared by an earlier callback (teardown mid-dispatch).
            if self.generation.get() != generation {
                break;
            }
            invoked += 1;
            match std::panic::catch_unwind(AssertUnwindSafe(|| callback(&message.payload))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(kind = %message.kind, error = %err, "message callback failed");
                }
                Err(_) => {
                    warn!(kind = %message.kind, "message callback panicked");
                }
            }
        }
        invoked
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.routes.borrow_mut().clear();
        self.generation.set(self.generation.get().wrapping_add(1));
    }

    /// Number of callbacks registered for `kind`.
    pub fn callback_count(&self, kind: &MessageKind) -> usize {
        self.routes.borrow().get(kind).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.routes.borrow().values().all(Vec::is_empty)
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes = self.routes.borrow();
        let mut kinds: Vec<(&str, usize)> = routes
            .iter()
            .map(|(kind, callbacks)| (kind.as_str(), callbacks.len()))
            .collect();
        kinds.sort_unstable();
        f.debug_struct("MessageRouter").field("routes", &kinds).finish()
    }
}
