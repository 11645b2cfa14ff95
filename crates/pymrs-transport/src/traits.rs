use crate::error::Result;

/// Identifies a listener registered with a host window.
pub type ListenerId = u64;

/// Callback invoked for every inbound message event.
pub type MessageListener = Box<dyn FnMut(&MessageEvent)>;

/// An inbound cross-window message as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// Origin of the sending window (`scheme://host[:port]`).
    pub origin: String,
    /// The posted string.
    pub data: String,
}

impl MessageEvent {
    pub fn new(origin: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            data: data.into(),
        }
    }
}

/// A window other contexts can post messages into.
///
/// Delivery is asynchronous and unacknowledged. The host silently drops
/// messages whose `target_origin` does not match the window's origin.
pub trait MessageTarget {
    /// Post `data` to this window, restricted to `target_origin` (`"*"` for any).
    fn post_message(&self, data: &str, target_origin: &str) -> Result<()>;

    /// Whether the window has been closed or unloaded.
    fn is_closed(&self) -> bool {
        false
    }
}

/// A window that delivers inbound message events to registered listeners.
pub trait MessageSource {
    fn add_message_listener(&self, listener: MessageListener) -> ListenerId;

    /// Remove a listener. Returns `false` if it was not registered.
    fn remove_message_listener(&self, id: ListenerId) -> bool;
}
