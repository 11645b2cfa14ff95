//! The iframe side of a responsive embed.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use pymrs_frame::kind::WIDTH;
use pymrs_frame::{parse_dimension, validate_kind, MessageKind, ReservedKind, ScrollTarget};
use pymrs_transport::{origin_of, ListenerId, OriginPolicy, Transport, TransportConfig, WILDCARD};
use tracing::{debug, warn};

use crate::config::{ChildConfig, RenderCallback};
use crate::error::{ConfigurationError, EndpointError, Result};
use crate::host::{ChildHost, TimerId, WindowEvent};
use crate::query::{ChildQuery, DEFAULT_PARENT_URL_PARAM};
use crate::router::{CallbackResult, MessageRouter};

/// Reports the iframe's height to its [`Parent`](crate::Parent) and relays
/// navigation and scroll requests to the hosting page.
///
/// Dropping the Child tears it down like [`Child::remove`].
#[must_use = "dropping a Child removes it"]
pub struct Child<H: ChildHost + 'static> {
    inner: Rc<ChildInner<H>>,
}

struct ChildInner<H: ChildHost + 'static> {
    host: Rc<H>,
    id: String,
    parent_url: Option<String>,
    parent_title: Option<String>,
    initial_width: Option<f64>,
    transport: Transport,
    router: MessageRouter,
    render_callback: Option<RenderCallback>,
    polling: Option<Duration>,
    timer: Cell<Option<TimerId>>,
    window_listeners: RefCell<Vec<ListenerId>>,
    removed: Cell<bool>,
}

impl<H: ChildHost + 'static> Child<H> {
    /// Set up the Child inside `host` and send the initial height.
    pub fn new(host: Rc<H>, config: ChildConfig) -> Result<Self> {
        let param = config
            .parent_url_param
            .as_deref()
            .filter(|param| !param.is_empty())
            .unwrap_or(DEFAULT_PARENT_URL_PARAM);
        let query = ChildQuery::parse(&host.location(), param)?;

        let id = query
            .child_id
            .or(config.id)
            .ok_or(ConfigurationError::MissingChildId)?;

        let policy = match config.xdomain.as_deref() {
            Some(xdomain) => OriginPolicy::parse(xdomain),
            None => OriginPolicy::Any,
        };
        if policy.is_wildcard() {
            debug!(instance = %id, "no xdomain restriction, accepting messages from any origin");
        }
        let target_origin = query
            .parent_url
            .as_deref()
            .and_then(origin_of)
            .unwrap_or_else(|| WILDCARD.to_string());

        let transport = Transport::new(
            TransportConfig {
                instance_id: id.clone(),
                policy,
                target_origin,
            },
            host.clone(),
        )?;
        transport.retarget(host.parent_window().as_ref());

        let inner = Rc::new(ChildInner {
            host,
            id,
            parent_url: query.parent_url,
            parent_title: query.parent_title,
            initial_width: query.initial_width,
            transport,
            router: MessageRouter::new(),
            render_callback: config.render_callback,
            polling: config.polling,
            timer: Cell::new(None),
            window_listeners: RefCell::new(Vec::new()),
            removed: Cell::new(false),
        });

        let weak = Rc::downgrade(&inner);
        inner
            .router
            .register(ReservedKind::Width.into(), move |payload| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_width(payload);
                }
                Ok(())
            });

        let weak = Rc::downgrade(&inner);
        inner.transport.listen(move |message| {
            if let Some(inner) = weak.upgrade() {
                inner.router.dispatch(&message);
            }
        })?;

        inner.send_height();
        inner.start_height_updates(&Rc::downgrade(&inner));

        debug!(instance = %inner.id, polling = ?inner.polling, "child initialized");
        Ok(Self { inner })
    }

    /// Measure the content and send it to the Parent as `height`.
    pub fn send_height(&self) {
        self.inner.send_height();
    }

    /// Send a custom message. `width` is handled by the Parent side and is refused.
    pub fn send_message(&self, kind: &str, message: &str) -> Result<()> {
        if self.inner.removed.get() {
            return Ok(());
        }
        let kind = MessageKind::parse(kind);
        if kind == MessageKind::Reserved(ReservedKind::Width) {
            return Err(EndpointError::ReservedKind(WIDTH.to_string()));
        }
        validate_kind(&kind)?;
        self.inner.send(&kind, message);
        Ok(())
    }

    /// Register a callback for a message kind. `width` is refused.
    pub fn on_message(
        &self,
        kind: &str,
        callback: impl Fn(&str) -> CallbackResult + 'static,
    ) -> Result<()> {
        if self.inner.removed.get() {
            return Ok(());
        }
        let kind = MessageKind::parse(kind);
        if kind == MessageKind::Reserved(ReservedKind::Width) {
            warn!(instance = %self.inner.id, "refusing callback for reserved kind `width`");
            return Err(EndpointError::ReservedKind(WIDTH.to_string()));
        }
        self.inner.router.register(kind, callback);
        Ok(())
    }

    /// Ask the hosting page to navigate to `url`.
    pub fn navigate_parent_to(&self, url: &str) {
        self.inner.send(&ReservedKind::NavigateTo.into(), url);
    }

    /// Ask the hosting page to jump to one of its own anchors.
    pub fn scroll_parent_to(&self, hash: &str) {
        let hash = hash.trim_start_matches('#');
        if hash.is_empty() {
            debug!(instance = %self.inner.id, "ignoring scroll to empty hash");
            return;
        }
        self.inner.scroll(ScrollTarget::Hash(hash.to_string()));
    }

    /// Ask the hosting page to scroll so that element `id` of this document is in view.
    pub fn scroll_parent_to_child_el(&self, id: &str) {
        if self.inner.removed.get() {
            return;
        }
        let Some(offset) = self.inner.host.element_offset(id) else {
            debug!(instance = %self.inner.id, element = id, "no such element, not scrolling");
            return;
        };
        self.inner.scroll(ScrollTarget::ChildElement {
            id: id.to_string(),
            offset,
        });
    }

    /// Ask the hosting page to scroll to `position` pixels into this document.
    pub fn scroll_parent_to_child_pos(&self, position: f64) {
        if !position.is_finite() {
            debug!(instance = %self.inner.id, position, "ignoring non-finite scroll position");
            return;
        }
        self.inner.scroll(ScrollTarget::ChildPosition(position));
    }

    /// Ask the Parent for a `viewport-iframe-position` report.
    pub fn get_parent_position_info(&self) {
        self.inner.send(&ReservedKind::ParentPositionInfo.into(), "");
    }

    /// Stop height updates, unregister listeners and clear callbacks. Idempotent.
    pub fn remove(&self) {
        self.inner.remove();
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn parent_url(&self) -> Option<&str> {
        self.inner.parent_url.as_deref()
    }

    pub fn parent_title(&self) -> Option<&str> {
        self.inner.parent_title.as_deref()
    }

    pub fn initial_width(&self) -> Option<f64> {
        self.inner.initial_width
    }

    pub fn is_removed(&self) -> bool {
        self.inner.removed.get()
    }
}

impl<H: ChildHost + 'static> ChildInner<H> {
    fn send(&self, kind: &MessageKind, payload: &str) {
        if self.removed.get() {
            return;
        }
        self.transport.send(kind, payload);
    }

    fn send_height(&self) {
        let height = self.host.content_height();
        self.send(&ReservedKind::Height.into(), &height.to_string());
    }

    fn scroll(&self, target: ScrollTarget) {
        self.send(&ReservedKind::ScrollTo.into(), &target.encode());
    }

    fn on_width(&self, payload: &str) {
        let width = match parse_dimension(WIDTH, payload) {
            Ok(width) => width,
            Err(err) => {
                debug!(instance = %self.id, error = %err, "ignoring malformed width");
                return;
            }
        };
        if let Some(render) = &self.render_callback {
            render(width);
        }
        self.send_height();
    }

    fn start_height_updates(&self, weak: &Weak<Self>) {
        if let Some(period) = self.polling {
            let weak = weak.clone();
            let id = self.host.set_interval(
                period,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.send_height();
                    }
                }),
            );
            self.timer.set(Some(id));
            return;
        }

        let mut listeners = self.window_listeners.borrow_mut();
        for event in [WindowEvent::Resize, WindowEvent::Mutation] {
            let weak = weak.clone();
            listeners.push(self.host.add_event_listener(
                event,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.send_height();
                    }
                }),
            ));
        }
    }

    fn remove(&self) {
        if self.removed.replace(true) {
            return;
        }
        if let Some(id) = self.timer.take() {
            self.host.clear_timer(id);
        }
        let listeners = std::mem::take(&mut *self.window_listeners.borrow_mut());
        for id in listeners {
            self.host.remove_event_listener(id);
        }
        self.transport.close();
        self.router.clear();
        debug!(instance = %self.id, "child removed");
    }
}

impl<H: ChildHost + 'static> Drop for Child<H> {
    fn drop(&mut self) {
        self.inner.remove();
    }
}

impl<H: ChildHost + 'static> std::fmt::Debug for Child<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Child")
            .field("id", &self.inner.id)
            .field("parent_url", &self.inner.parent_url)
            .field("polling", &self.inner.polling)
            .field("transport", &self.inner.transport)
            .field("removed", &self.inner.removed.get())
            .finish_non_exhaustive()
    }
}
