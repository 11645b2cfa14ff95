//! Deterministic single-threaded browser.
//!
//! [`SimBrowser`] owns a virtual clock, a FIFO queue of posted messages and a
//! timer table. Nothing happens until the browser is driven with
//! [`SimBrowser::run_until_idle`] or [`SimBrowser::advance`], so tests and the
//! CLI see every message in a reproducible order.
//!
//! A [`SimPage`] is the hosting page ([`ParentHost`]). Iframes it creates are
//! [`SimIFrame`] elements whose documents are [`SimFrame`]s ([`ChildHost`]).
//! Window origins come from their URLs; a post whose `targetOrigin` does not
//! match the receiving window is recorded and dropped, as browsers do.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};
use std::time::Duration;

use pymrs_frame::{decode_envelope, Envelope};
use pymrs_transport::{
    origin_of, ListenerId, MessageEvent, MessageListener, MessageSource, MessageTarget,
    TransportError, WILDCARD,
};
use serde::Serialize;
use tracing::{debug, trace};

use crate::host::{
    AutoInitContainer, ChildHost, HostWindow, IFrameElement, IframeAttributes, ParentHost, Rect,
    Scheduler, TimerId, Viewport, WindowEvent,
};

/// Label of the page window in the transcript.
pub const PAGE_LABEL: &str = "page";

const OPAQUE_ORIGIN: &str = "null";
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// One `postMessage` call observed by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    /// Virtual time of the post in milliseconds.
    pub at_ms: u64,
    pub from: String,
    pub to: String,
    pub target_origin: String,
    pub data: String,
    /// `false` when the receiving window's origin did not match `target_origin`.
    pub delivered: bool,
}

impl TranscriptEntry {
    pub fn envelope(&self) -> Option<Envelope> {
        decode_envelope(&self.data)
    }
}

enum TimerTask {
    Once(Box<dyn FnOnce()>),
    Repeat {
        period: Duration,
        task: Box<dyn FnMut()>,
    },
}

struct Timer {
    due: Duration,
    task: TimerTask,
}

struct Delivery {
    target: Weak<WindowCore>,
    event: MessageEvent,
}

#[derive(Default)]
struct BrowserCore {
    now: Cell<Duration>,
    next_timer: Cell<TimerId>,
    queue: RefCell<VecDeque<Delivery>>,
    timers: RefCell<BTreeMap<TimerId, Timer>>,
    running: Cell<Option<TimerId>>,
    running_cleared: Cell<bool>,
    transcript: RefCell<Vec<TranscriptEntry>>,
}

impl BrowserCore {
    fn deliver_next(&self) -> bool {
        let delivery = self.queue.borrow_mut().pop_front();
        let Some(delivery) = delivery else {
            return false;
        };
        if let Some(window) = delivery.target.upgrade() {
            window.dispatch_message(&delivery.event);
        }
        true
    }

    fn drain(&self) -> usize {
        let mut delivered = 0;
        while self.deliver_next() {
            delivered += 1;
        }
        delivered
    }

    fn next_due(&self, limit: Duration) -> Option<TimerId> {
        self.timers
            .borrow()
            .iter()
            .filter(|(_, timer)| timer.due <= limit)
            .min_by_key(|(id, timer)| (timer.due, **id))
            .map(|(id, _)| *id)
    }

    fn fire(&self, id: TimerId) {
        let timer = self.timers.borrow_mut().remove(&id);
        let Some(timer) = timer else {
            return;
        };
        if timer.due > self.now.get() {
            self.now.set(timer.due);
        }

        match timer.task {
            TimerTask::Once(task) => task(),
            TimerTask::Repeat { period, mut task } => {
                self.running.set(Some(id));
                self.running_cleared.set(false);
                task();
                self.running.set(None);
                if !self.running_cleared.get() {
                    self.timers.borrow_mut().insert(
                        id,
                        Timer {
                            due: timer.due + period,
                            task: TimerTask::Repeat { period, task },
                        },
                    );
                }
            }
        }
    }

    fn schedule(&self, due: Duration, task: TimerTask) -> TimerId {
        let id = self.next_timer.get() + 1;
        self.next_timer.set(id);
        self.timers.borrow_mut().insert(id, Timer { due, task });
        id
    }
}

impl Scheduler for BrowserCore {
    fn set_interval(&self, period: Duration, task: Box<dyn FnMut()>) -> TimerId {
        let period = period.max(MIN_INTERVAL);
        self.schedule(self.now.get() + period, TimerTask::Repeat { period, task })
    }

    fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerId {
        self.schedule(self.now.get() + delay, TimerTask::Once(task))
    }

    fn clear_timer(&self, id: TimerId) {
        if self.running.get() == Some(id) {
            self.running_cleared.set(true);
        }
        self.timers.borrow_mut().remove(&id);
    }

    fn now(&self) -> Duration {
        self.now.get()
    }
}

type EventListener = Rc<RefCell<Box<dyn FnMut()>>>;

struct WindowCore {
    label: String,
    origin: String,
    location: RefCell<String>,
    browser: Weak<BrowserCore>,
    next_listener: Cell<ListenerId>,
    message_listeners: RefCell<BTreeMap<ListenerId, Rc<RefCell<MessageListener>>>>,
    event_listeners: RefCell<BTreeMap<ListenerId, (WindowEvent, EventListener)>>,
    closed: Cell<bool>,
}

impl WindowCore {
    fn new(browser: &Rc<BrowserCore>, label: String, location: &str) -> Rc<Self> {
        Rc::new(Self {
            label,
            origin: origin_of(location).unwrap_or_else(|| OPAQUE_ORIGIN.to_string()),
            location: RefCell::new(location.to_string()),
            browser: Rc::downgrade(browser),
            next_listener: Cell::new(0),
            message_listeners: RefCell::new(BTreeMap::new()),
            event_listeners: RefCell::new(BTreeMap::new()),
            closed: Cell::new(false),
        })
    }

    fn next_listener_id(&self) -> ListenerId {
        let id = self.next_listener.get() + 1;
        self.next_listener.set(id);
        id
    }

    fn add_message_listener(&self, listener: MessageListener) -> ListenerId {
        let id = self.next_listener_id();
        self.message_listeners
            .borrow_mut()
            .insert(id, Rc::new(RefCell::new(listener)));
        id
    }

    fn remove_message_listener(&self, id: ListenerId) -> bool {
        self.message_listeners.borrow_mut().remove(&id).is_some()
    }

    fn add_event_listener(&self, event: WindowEvent, listener: Box<dyn FnMut()>) -> ListenerId {
        let id = self.next_listener_id();
        self.event_listeners
            .borrow_mut()
            .insert(id, (event, Rc::new(RefCell::new(listener))));
        id
    }

    fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.event_listeners.borrow_mut().remove(&id).is_some()
    }

    fn dispatch_message(&self, event: &MessageEvent) {
        if self.closed.get() {
            return;
        }
        trace!(window = %self.label, origin = %event.origin, "delivering message");

        let snapshot: Vec<(ListenerId, Rc<RefCell<MessageListener>>)> = self
            .message_listeners
            .borrow()
            .iter()
            .map(|(id, listener)| (*id, listener.clone()))
            .collect();
        for (id, listener) in snapshot {
            // Removed by an earlier listener of this dispatch.
            if !self.message_listeners.borrow().contains_key(&id) {
                continue;
            }
            if let Ok(mut listener) = listener.try_borrow_mut() {
                (*listener)(event);
            }
        }
    }

    fn fire_event(&self, event: WindowEvent) {
        if self.closed.get() {
            return;
        }
        let snapshot: Vec<(ListenerId, EventListener)> = self
            .event_listeners
            .borrow()
            .iter()
            .filter(|(_, (kind, _))| *kind == event)
            .map(|(id, (_, listener))| (*id, listener.clone()))
            .collect();
        for (id, listener) in snapshot {
            if !self.event_listeners.borrow().contains_key(&id) {
                continue;
            }
            if let Ok(mut listener) = listener.try_borrow_mut() {
                (*listener)();
            }
        }
    }

    fn enqueue(self: &Rc<Self>, origin: &str, data: &str) {
        if let Some(browser) = self.browser.upgrade() {
            browser.queue.borrow_mut().push_back(Delivery {
                target: Rc::downgrade(self),
                event: MessageEvent::new(origin, data),
            });
        }
    }

    fn listener_count(&self) -> usize {
        self.message_listeners.borrow().len()
    }
}

/// A reference to another window, bound to the window posting through it.
struct WindowProxy {
    target: Weak<WindowCore>,
    from_label: String,
    from_origin: String,
    browser: Weak<BrowserCore>,
}

impl WindowProxy {
    fn new(browser: &Rc<BrowserCore>, from: &WindowCore, to: &Rc<WindowCore>) -> Rc<Self> {
        Rc::new(Self {
            target: Rc::downgrade(to),
            from_label: from.label.clone(),
            from_origin: from.origin.clone(),
            browser: Rc::downgrade(browser),
        })
    }
}

impl MessageTarget for WindowProxy {
    fn post_message(&self, data: &str, target_origin: &str) -> pymrs_transport::Result<()> {
        let target = self
            .target
            .upgrade()
            .filter(|window| !window.closed.get())
            .ok_or(TransportError::TargetClosed)?;
        let browser = self
            .browser
            .upgrade()
            .ok_or(TransportError::TargetUnavailable)?;

        let delivered = target_origin == WILDCARD || target_origin == target.origin;
        browser.transcript.borrow_mut().push(TranscriptEntry {
            at_ms: u64::try_from(browser.now.get().as_millis()).unwrap_or(u64::MAX),
            from: self.from_label.clone(),
            to: target.label.clone(),
            target_origin: target_origin.to_string(),
            data: data.to_string(),
            delivered,
        });

        if delivered {
            target.enqueue(&self.from_origin, data);
        } else {
            debug!(
                target_origin,
                actual = %target.origin,
                "target origin mismatch, message not delivered"
            );
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.target
            .upgrade()
            .is_none_or(|window| window.closed.get())
    }
}

/// The simulated browser: clock, message queue and timers.
#[derive(Clone, Default)]
pub struct SimBrowser {
    core: Rc<BrowserCore>,
}

impl SimBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a hosting page at `location`.
    pub fn page(&self, location: &str, title: &str) -> Rc<SimPage> {
        Rc::new(SimPage {
            browser: self.core.clone(),
            window: WindowCore::new(&self.core, PAGE_LABEL.to_string(), location),
            title: title.to_string(),
            containers: RefCell::new(BTreeMap::new()),
            viewport: Cell::new(Viewport {
                width: 1024.0,
                height: 768.0,
            }),
            scroll_y: Rc::new(Cell::new(0.0)),
            navigations: RefCell::new(Vec::new()),
            scrolls: RefCell::new(Vec::new()),
        })
    }

    /// A document at `location` that is not embedded in any page.
    pub fn detached_frame(&self, location: &str) -> Rc<SimFrame> {
        Rc::new(SimFrame {
            browser: self.core.clone(),
            window: WindowCore::new(&self.core, format!("frame:{location}"), location),
            parent: None,
            content_height: Cell::new(0.0),
            elements: RefCell::new(BTreeMap::new()),
        })
    }

    /// Deliver queued messages until the queue is empty. Time does not move.
    pub fn run_until_idle(&self) -> usize {
        self.core.drain()
    }

    /// Move the clock forward, firing due timers and delivering messages in order.
    pub fn advance(&self, by: Duration) {
        let target = self.core.now.get() + by;
        loop {
            self.core.drain();
            let Some(id) = self.core.next_due(target) else {
                break;
            };
            self.core.fire(id);
        }
        self.core.now.set(target);
    }

    pub fn now(&self) -> Duration {
        self.core.now.get()
    }

    pub fn pending_messages(&self) -> usize {
        self.core.queue.borrow().len()
    }

    pub fn pending_timers(&self) -> usize {
        self.core.timers.borrow().len()
    }

    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.core.transcript.borrow().clone()
    }

    pub fn clear_transcript(&self) {
        self.core.transcript.borrow_mut().clear();
    }
}

impl std::fmt::Debug for SimBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimBrowser")
            .field("now", &self.core.now.get())
            .field("pending_messages", &self.pending_messages())
            .field("pending_timers", &self.pending_timers())
            .finish()
    }
}

macro_rules! impl_host_window {
    ($ty:ty) => {
        impl MessageSource for $ty {
            fn add_message_listener(&self, listener: MessageListener) -> ListenerId {
                self.window.add_message_listener(listener)
            }

            fn remove_message_listener(&self, id: ListenerId) -> bool {
                self.window.remove_message_listener(id)
            }
        }

        impl Scheduler for $ty {
            fn set_interval(&self, period: Duration, task: Box<dyn FnMut()>) -> TimerId {
                self.browser.set_interval(period, task)
            }

            fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerId {
                self.browser.set_timeout(delay, task)
            }

            fn clear_timer(&self, id: TimerId) {
                self.browser.clear_timer(id)
            }

            fn now(&self) -> Duration {
                self.browser.now.get()
            }
        }

        impl HostWindow for $ty {
            fn location(&self) -> String {
                self.window.location.borrow().clone()
            }

            fn add_event_listener(
                &self,
                event: WindowEvent,
                listener: Box<dyn FnMut()>,
            ) -> ListenerId {
                self.window.add_event_listener(event, listener)
            }

            fn remove_event_listener(&self, id: ListenerId) -> bool {
                self.window.remove_event_listener(id)
            }
        }

        impl $ty {
            /// Queue a raw message to this window as if posted from `origin`.
            pub fn deliver_from(&self, origin: &str, data: &str) {
                self.window.enqueue(origin, data);
            }

            /// Number of `message` listeners registered on this window.
            pub fn message_listener_count(&self) -> usize {
                self.window.listener_count()
            }

            pub fn origin(&self) -> &str {
                &self.window.origin
            }
        }
    };
}

struct Container {
    width: f64,
    top: f64,
    attributes: BTreeMap<String, String>,
    iframe: Option<Rc<SimIFrame>>,
}

/// A hosting page.
pub struct SimPage {
    browser: Rc<BrowserCore>,
    window: Rc<WindowCore>,
    title: String,
    containers: RefCell<BTreeMap<String, Container>>,
    viewport: Cell<Viewport>,
    scroll_y: Rc<Cell<f64>>,
    navigations: RefCell<Vec<String>>,
    scrolls: RefCell<Vec<(f64, f64)>>,
}

impl_host_window!(SimPage);

impl SimPage {
    /// Add a container element `width` pixels wide, `top` pixels down the page.
    pub fn add_container(&self, id: &str, width: f64, top: f64) {
        self.add_container_with_attributes(id, width, top, BTreeMap::new());
    }

    /// Add a container carrying element attributes such as `data-pym-src`.
    pub fn add_container_with_attributes(
        &self,
        id: &str,
        width: f64,
        top: f64,
        attributes: BTreeMap<String, String>,
    ) {
        self.containers.borrow_mut().insert(
            id.to_string(),
            Container {
                width,
                top,
                attributes,
                iframe: None,
            },
        );
    }

    /// The iframe most recently created in a container.
    pub fn iframe(&self, container_id: &str) -> Option<Rc<SimIFrame>> {
        self.containers
            .borrow()
            .get(container_id)
            .and_then(|container| container.iframe.clone())
    }

    /// The document inside a container's iframe.
    pub fn frame(&self, container_id: &str) -> Option<Rc<SimFrame>> {
        self.iframe(container_id).map(|iframe| iframe.frame())
    }

    pub fn container_attribute(&self, container_id: &str, name: &str) -> Option<String> {
        self.containers
            .borrow()
            .get(container_id)
            .and_then(|container| container.attributes.get(name).cloned())
    }

    /// Resize the window, firing `resize`.
    pub fn resize(&self, viewport: Viewport) {
        self.viewport.set(viewport);
        self.window.fire_event(WindowEvent::Resize);
    }

    /// Change a container's width (and its iframe's) without firing events.
    pub fn set_container_width(&self, container_id: &str, width: f64) {
        if let Some(container) = self.containers.borrow_mut().get_mut(container_id) {
            container.width = width;
            if let Some(iframe) = &container.iframe {
                iframe.width.set(width);
            }
        }
    }

    /// Scroll as the user would, firing `scroll`.
    pub fn user_scroll(&self, y: f64) {
        self.scroll_y.set(y.max(0.0));
        self.window.fire_event(WindowEvent::Scroll);
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y.get()
    }

    /// Every `navigate` call so far.
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.borrow().clone()
    }

    /// Every programmatic `scroll_to` call so far.
    pub fn scrolls(&self) -> Vec<(f64, f64)> {
        self.scrolls.borrow().clone()
    }
}

impl ParentHost for SimPage {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn container_width(&self, container_id: &str) -> Option<f64> {
        self.containers
            .borrow()
            .get(container_id)
            .map(|container| container.width)
    }

    fn create_iframe(
        &self,
        container_id: &str,
        attributes: &IframeAttributes,
    ) -> Option<Rc<dyn IFrameElement>> {
        let mut containers = self.containers.borrow_mut();
        let container = containers.get_mut(container_id)?;

        let child_window = WindowCore::new(
            &self.browser,
            format!("iframe#{container_id}"),
            &attributes.src,
        );
        let frame = Rc::new(SimFrame {
            browser: self.browser.clone(),
            parent: Some(WindowProxy::new(&self.browser, &child_window, &self.window)),
            window: child_window,
            content_height: Cell::new(0.0),
            elements: RefCell::new(BTreeMap::new()),
        });
        let iframe = Rc::new(SimIFrame {
            attributes: attributes
                .to_pairs()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            to_child: WindowProxy::new(&self.browser, &self.window, &frame.window),
            frame,
            width: Cell::new(container.width),
            page_top: container.top,
            scroll_y: self.scroll_y.clone(),
            height_style: RefCell::new(String::new()),
            removed: Cell::new(false),
        });

        // Replaces whatever the container held before.
        if let Some(previous) = container.iframe.replace(iframe.clone()) {
            previous.remove();
        }
        debug!(container = container_id, src = %attributes.src, "iframe created");

        let element: Rc<dyn IFrameElement> = iframe;
        Some(element)
    }

    fn viewport(&self) -> Viewport {
        self.viewport.get()
    }

    fn page_y_offset(&self) -> f64 {
        self.scroll_y.get()
    }

    fn scroll_to(&self, x: f64, y: f64) {
        self.scrolls.borrow_mut().push((x, y));
        self.scroll_y.set(y.max(0.0));
        self.window.fire_event(WindowEvent::Scroll);
    }

    fn navigate(&self, url: &str) {
        self.navigations.borrow_mut().push(url.to_string());
        if !url.starts_with('#') {
            *self.window.location.borrow_mut() = url.to_string();
        }
    }

    fn auto_init_containers(&self) -> Vec<AutoInitContainer> {
        self.containers
            .borrow()
            .iter()
            .filter(|(_, container)| !container.attributes.is_empty())
            .map(|(id, container)| AutoInitContainer {
                id: Some(id.clone()),
                attributes: container.attributes.clone(),
            })
            .collect()
    }

    fn mark_auto_initialized(&self, container_id: &str) {
        if let Some(container) = self.containers.borrow_mut().get_mut(container_id) {
            container
                .attributes
                .insert(crate::AUTO_INITIALIZED_ATTRIBUTE.to_string(), "true".to_string());
        }
    }
}

/// An iframe element in a [`SimPage`].
pub struct SimIFrame {
    attributes: BTreeMap<String, String>,
    to_child: Rc<WindowProxy>,
    frame: Rc<SimFrame>,
    width: Cell<f64>,
    page_top: f64,
    scroll_y: Rc<Cell<f64>>,
    height_style: RefCell<String>,
    removed: Cell<bool>,
}

impl SimIFrame {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn src(&self) -> &str {
        self.attribute("src").unwrap_or_default()
    }

    /// The current `height` style, empty until the first resize.
    pub fn height_style(&self) -> String {
        self.height_style.borrow().clone()
    }

    pub fn frame(&self) -> Rc<SimFrame> {
        self.frame.clone()
    }

    pub fn is_removed(&self) -> bool {
        self.removed.get()
    }

    fn rendered_height(&self) -> f64 {
        self.height_style
            .borrow()
            .strip_suffix("px")
            .and_then(|value| value.parse().ok())
            .unwrap_or(0.0)
    }
}

impl IFrameElement for SimIFrame {
    fn content_window(&self) -> Option<Rc<dyn MessageTarget>> {
        if self.removed.get() {
            return None;
        }
        let window: Rc<dyn MessageTarget> = self.to_child.clone();
        Some(window)
    }

    fn set_height_style(&self, value: &str) {
        *self.height_style.borrow_mut() = value.to_string();
    }

    fn width(&self) -> f64 {
        self.width.get()
    }

    fn bounding_rect(&self) -> Rect {
        let top = self.page_top - self.scroll_y.get();
        Rect {
            top,
            left: 0.0,
            bottom: top + self.rendered_height(),
            right: self.width.get(),
        }
    }

    fn remove(&self) {
        if !self.removed.replace(true) {
            self.frame.window.closed.set(true);
        }
    }
}

/// The document inside an iframe.
pub struct SimFrame {
    browser: Rc<BrowserCore>,
    window: Rc<WindowCore>,
    parent: Option<Rc<WindowProxy>>,
    content_height: Cell<f64>,
    elements: RefCell<BTreeMap<String, f64>>,
}

impl_host_window!(SimFrame);

impl SimFrame {
    /// Change the content height, firing a mutation event.
    pub fn set_content_height(&self, height: f64) {
        self.content_height.set(height);
        self.window.fire_event(WindowEvent::Mutation);
    }

    /// Add an element `offset` pixels from the top of the document.
    pub fn add_element(&self, id: &str, offset: f64) {
        self.elements.borrow_mut().insert(id.to_string(), offset);
    }

    /// Fire `resize` in this document.
    pub fn resize(&self) {
        self.window.fire_event(WindowEvent::Resize);
    }

    pub fn is_closed(&self) -> bool {
        self.window.closed.get()
    }
}

impl ChildHost for SimFrame {
    fn parent_window(&self) -> Option<Rc<dyn MessageTarget>> {
        let parent: Rc<dyn MessageTarget> = self.parent.clone()?;
        Some(parent)
    }

    fn content_height(&self) -> f64 {
        self.content_height.get()
    }

    fn element_offset(&self, id: &str) -> Option<f64> {
        self.elements.borrow().get(id).copied()
    }
}
