//! Host environment traits.
//!
//! These are the black-box collaborators an endpoint needs from the page it
//! runs in: timers, window events, layout queries and DOM mutation. Hosts are
//! single-threaded; every callback runs to completion on the host's event loop.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use pymrs_transport::{ListenerId, MessageSource, MessageTarget};

/// Identifies a scheduled timer.
pub type TimerId = u64;

/// Timer scheduling on the host event loop.
pub trait Scheduler {
    /// Run `task` every `period` until cleared.
    fn set_interval(&self, period: Duration, task: Box<dyn FnMut()>) -> TimerId;

    /// Run `task` once after `delay` unless cleared first.
    fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerId;

    /// Cancel a timer. Unknown or already-fired ids are ignored.
    fn clear_timer(&self, id: TimerId);

    /// Monotonic time since the host started.
    fn now(&self) -> Duration;
}

/// Window-level events endpoints subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowEvent {
    Resize,
    Scroll,
    /// The document content changed (DOM mutation or element resize).
    Mutation,
}

/// The window an endpoint lives in.
pub trait HostWindow: MessageSource + Scheduler {
    /// Full URL of this window's document.
    fn location(&self) -> String;

    fn add_event_listener(&self, event: WindowEvent, listener: Box<dyn FnMut()>) -> ListenerId;

    /// Remove a listener. Returns `false` if it was not registered.
    fn remove_event_listener(&self, id: ListenerId) -> bool;
}

/// The iframe document's environment.
pub trait ChildHost: HostWindow {
    /// The embedding window, if any. The host keeps it alive; endpoints only
    /// hold weak references.
    fn parent_window(&self) -> Option<Rc<dyn MessageTarget>>;

    /// Current height of the document content in pixels.
    fn content_height(&self) -> f64;

    /// Offset of an element from the top of the document, if it exists.
    fn element_offset(&self, id: &str) -> Option<f64>;
}

/// A bounding rectangle relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl Rect {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Attributes for the iframe element a Parent creates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IframeAttributes {
    pub src: String,
    pub title: Option<String>,
    pub name: Option<String>,
    pub id: Option<String>,
    pub sandbox: Option<String>,
    pub allow_fullscreen: bool,
}

impl IframeAttributes {
    /// Every attribute to set on the element, including the fixed layout ones.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("src", self.src.clone()),
            ("width", "100%".to_string()),
            ("scrolling", "no".to_string()),
            ("marginheight", "0".to_string()),
            ("frameborder", "0".to_string()),
        ];
        if let Some(title) = &self.title {
            pairs.push(("title", title.clone()));
        }
        if let Some(name) = &self.name {
            pairs.push(("name", name.clone()));
        }
        if let Some(id) = &self.id {
            pairs.push(("id", id.clone()));
        }
        if let Some(sandbox) = &self.sandbox {
            pairs.push(("sandbox", sandbox.clone()));
        }
        if self.allow_fullscreen {
            pairs.push(("allowfullscreen", "true".to_string()));
        }
        pairs
    }
}

/// An iframe element created by the host on behalf of a Parent.
pub trait IFrameElement {
    /// The iframe's window. The element keeps it alive while it is attached.
    fn content_window(&self) -> Option<Rc<dyn MessageTarget>>;

    /// Set the element's `height` style (e.g. `"450px"`).
    fn set_height_style(&self, value: &str);

    /// Rendered width of the element in pixels.
    fn width(&self) -> f64;

    /// Bounding rect relative to the viewport.
    fn bounding_rect(&self) -> Rect;

    /// Detach the element from the document.
    fn remove(&self);
}

/// A container element found by an auto-init scan.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AutoInitContainer {
    pub id: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

/// The hosting page's environment.
pub trait ParentHost: HostWindow {
    fn title(&self) -> String;

    /// Width of a container element, or `None` if no such element exists.
    fn container_width(&self, container_id: &str) -> Option<f64>;

    /// Create an iframe inside a container and insert it into the document.
    fn create_iframe(
        &self,
        container_id: &str,
        attributes: &IframeAttributes,
    ) -> Option<Rc<dyn IFrameElement>>;

    fn viewport(&self) -> Viewport;

    /// Vertical scroll offset of the page.
    fn page_y_offset(&self) -> f64;

    fn scroll_to(&self, x: f64, y: f64);

    /// Navigate the page. A leading `#` jumps to an anchor.
    fn navigate(&self, url: &str);

    /// Containers carrying `data-pym-*` attributes, for auto-init.
    fn auto_init_containers(&self) -> Vec<AutoInitContainer> {
        Vec::new()
    }

    /// Flag a container as handled by auto-init.
    fn mark_auto_initialized(&self, _container_id: &str) {}
}
