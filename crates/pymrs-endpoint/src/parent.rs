//! The hosting-page side of a responsive embed.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use pymrs_frame::kind::HEIGHT;
use pymrs_frame::{
    parse_dimension, validate_instance_id, validate_kind, MessageKind, ReservedKind, ScrollTarget,
    ViewportPosition,
};
use pymrs_transport::{ListenerId, Transport, TransportConfig};
use tracing::{debug, warn};

use crate::config::ParentConfig;
use crate::error::{ConfigurationError, Result};
use crate::host::{IFrameElement, IframeAttributes, ParentHost, WindowEvent};
use crate::query::{build_iframe_src, IframeSrc};
use crate::router::{CallbackResult, MessageRouter};
use crate::throttle::Throttle;

/// Owns an iframe inside a container element and keeps it sized to the
/// [`Child`](crate::Child) document it hosts.
///
/// Dropping the Parent tears it down like [`Parent::remove`], which also
/// detaches the iframe.
#[must_use = "dropping a Parent removes its iframe"]
pub struct Parent<H: ParentHost + 'static> {
    inner: Rc<ParentInner<H>>,
}

struct ParentInner<H: ParentHost + 'static> {
    host: Rc<H>,
    id: String,
    url: String,
    iframe_src: String,
    iframe: Rc<dyn IFrameElement>,
    transport: Transport,
    router: MessageRouter,
    track_scroll: bool,
    throttle: Throttle,
    window_listeners: RefCell<Vec<ListenerId>>,
    removed: Cell<bool>,
}

impl<H: ParentHost + 'static> Parent<H> {
    /// Render `url` into the container `container_id`.
    ///
    /// Fails without touching the document when the container does not exist.
    pub fn new(host: Rc<H>, container_id: &str, url: &str, config: ParentConfig) -> Result<Self> {
        let width = host
            .container_width(container_id)
            .ok_or_else(|| ConfigurationError::MissingContainer(container_id.to_string()))?;
        validate_instance_id(container_id)?;

        let location = host.location();
        let title = host.title();
        let parent_url_value = config.parent_url_value.as_deref().unwrap_or(&location);
        let iframe_src = build_iframe_src(
            &location,
            &IframeSrc {
                url,
                child_id: container_id,
                initial_width: width,
                parent_title: &title,
                parent_url_param: config.parent_url_param(),
                parent_url_value,
                optional_params: config.optional_params.as_deref(),
            },
        )?;

        let attributes = IframeAttributes {
            src: iframe_src.clone(),
            title: config.title.clone(),
            name: config.name.clone(),
            id: config.id.clone(),
            sandbox: config.sandbox.clone(),
            allow_fullscreen: config.allow_fullscreen,
        };
        let iframe = host
            .create_iframe(container_id, &attributes)
            .ok_or_else(|| ConfigurationError::IframeCreationFailed(container_id.to_string()))?;

        let policy = config.origin_policy();
        let target_origin = policy.target_origin().to_string();
        let transport = match Transport::new(
            TransportConfig {
                instance_id: container_id.to_string(),
                policy,
                target_origin,
            },
            host.clone(),
        ) {
            Ok(transport) => transport,
            Err(err) => {
                iframe.remove();
                return Err(err.into());
            }
        };
        transport.retarget(iframe.content_window().as_ref());

        let inner = Rc::new(ParentInner {
            host,
            id: container_id.to_string(),
            url: url.to_string(),
            iframe_src,
            iframe,
            transport,
            router: MessageRouter::new(),
            track_scroll: config.track_scroll,
            throttle: Throttle::new(config.scroll_wait()),
            window_listeners: RefCell::new(Vec::new()),
            removed: Cell::new(false),
        });

        inner.register_handlers(&Rc::downgrade(&inner));
        inner.add_window_listeners(&Rc::downgrade(&inner));

        let weak = Rc::downgrade(&inner);
        if let Err(err) = inner.transport.listen(move |message| {
            if let Some(inner) = weak.upgrade() {
                inner.router.dispatch(&message);
            }
        }) {
            inner.remove();
            return Err(err.into());
        }

        debug!(instance = %inner.id, src = %inner.iframe_src, "parent initialized");
        Ok(Self { inner })
    }

    /// Send a message to the Child.
    pub fn send_message(&self, kind: &str, message: &str) -> Result<()> {
        if self.inner.removed.get() {
            return Ok(());
        }
        let kind = MessageKind::parse(kind);
        validate_kind(&kind)?;
        self.inner.send(&kind, message);
        Ok(())
    }

    /// Send the viewport size and the iframe's bounding rect to the Child.
    pub fn send_viewport_and_iframe_position(&self) {
        self.inner.send_viewport_and_iframe_position();
    }

    /// Send the iframe's current width to the Child.
    pub fn send_width(&self) {
        self.inner.send_width();
    }

    /// Register a callback for messages of `kind` from the Child.
    pub fn on_message(&self, kind: &str, callback: impl Fn(&str) -> CallbackResult + 'static) {
        if self.inner.removed.get() {
            return;
        }
        self.inner.router.register(MessageKind::parse(kind), callback);
    }

    /// Remove the iframe and every listener. Idempotent.
    pub fn remove(&self) {
        self.inner.remove();
    }

    /// The container id, shared with the Child as its instance id.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn iframe_src(&self) -> &str {
        &self.inner.iframe_src
    }

    pub fn iframe(&self) -> Rc<dyn IFrameElement> {
        self.inner.iframe.clone()
    }

    pub fn is_removed(&self) -> bool {
        self.inner.removed.get()
    }
}

impl<H: ParentHost + 'static> ParentInner<H> {
    fn send(&self, kind: &MessageKind, payload: &str) {
        if self.removed.get() {
            return;
        }
        self.transport.send(kind, payload);
    }

    fn send_width(&self) {
        let width = self.iframe.width();
        self.send(&ReservedKind::Width.into(), &width.to_string());
    }

    fn send_viewport_and_iframe_position(&self) {
        let viewport = self.host.viewport();
        let rect = self.iframe.bounding_rect();
        let position = ViewportPosition {
            viewport_width: viewport.width,
            viewport_height: viewport.height,
            top: rect.top,
            left: rect.left,
            bottom: rect.bottom,
            right: rect.right,
        };
        self.send(&ReservedKind::ViewportIframePosition.into(), &position.encode());
    }

    fn register_handlers(&self, weak: &Weak<Self>) {
        let handlers: [(ReservedKind, fn(&Self, &str)); 4] = [
            (ReservedKind::Height, Self::on_height),
            (ReservedKind::NavigateTo, Self::on_navigate_to),
            (ReservedKind::ScrollTo, Self::on_scroll_to),
            (ReservedKind::ParentPositionInfo, |inner, _| {
                inner.send_viewport_and_iframe_position()
            }),
        ];
        for (kind, handler) in handlers {
            let weak = weak.clone();
            self.router.register(kind.into(), move |payload| {
                if let Some(inner) = weak.upgrade() {
                    handler(&inner, payload);
                }
                Ok(())
            });
        }
    }

    fn add_window_listeners(&self, weak: &Weak<Self>) {
        let mut listeners = self.window_listeners.borrow_mut();

        let on_resize = weak.clone();
        listeners.push(self.host.add_event_listener(
            WindowEvent::Resize,
            Box::new(move || {
                if let Some(inner) = on_resize.upgrade() {
                    inner.send_width();
                    if inner.track_scroll {
                        inner.report_position_throttled();
                    }
                }
            }),
        ));

        if self.track_scroll {
            let on_scroll = weak.clone();
            listeners.push(self.host.add_event_listener(
                WindowEvent::Scroll,
                Box::new(move || {
                    if let Some(inner) = on_scroll.upgrade() {
                        inner.report_position_throttled();
                    }
                }),
            ));
        }
    }

    fn report_position_throttled(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        self.throttle.call(&*self.host, move || {
            if let Some(inner) = weak.upgrade() {
                inner.send_viewport_and_iframe_position();
            }
        });
    }

    fn on_height(&self, payload: &str) {
        match parse_dimension(HEIGHT, payload) {
            Ok(height) => self.iframe.set_height_style(&height_style(height)),
            Err(err) => debug!(instance = %self.id, error = %err, "ignoring malformed height"),
        }
    }

    fn on_navigate_to(&self, url: &str) {
        if url.is_empty() {
            debug!(instance = %self.id, "ignoring navigation to empty url");
            return;
        }
        debug!(instance = %self.id, url, "child requested navigation");
        self.host.navigate(url);
    }

    fn on_scroll_to(&self, payload: &str) {
        let target = match ScrollTarget::parse(payload) {
            Ok(target) => target,
            Err(err) => {
                warn!(instance = %self.id, error = %err, "ignoring malformed scroll request");
                return;
            }
        };

        match target.child_offset() {
            None => {
                if let ScrollTarget::Hash(hash) = &target {
                    self.host.navigate(&format!("#{hash}"));
                }
            }
            Some(offset) => {
                let iframe_top = self.iframe.bounding_rect().top + self.host.page_y_offset();
                self.host.scroll_to(0.0, iframe_top + offset);
            }
        }
    }

    fn remove(&self) {
        if self.removed.replace(true) {
            return;
        }
        self.throttle.cancel(&*self.host);
        let listeners = std::mem::take(&mut *self.window_listeners.borrow_mut());
        for id in listeners {
            self.host.remove_event_listener(id);
        }
        self.transport.close();
        self.router.clear();
        self.iframe.remove();
        debug!(instance = %self.id, "parent removed");
    }
}

/// CSS height for a reported content height. Never negative.
fn height_style(height: f64) -> String {
    if height > 0.0 {
        format!("{height}px")
    } else {
        "0px".to_string()
    }
}

impl<H: ParentHost + 'static> Drop for Parent<H> {
    fn drop(&mut self) {
        self.inner.remove();
    }
}

impl<H: ParentHost + 'static> std::fmt::Debug for Parent<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parent")
            .field("id", &self.inner.id)
            .field("url", &self.inner.url)
            .field("iframe_src", &self.inner.iframe_src)
            .field("track_scroll", &self.inner.track_scroll)
            .field("transport", &self.inner.transport)
            .field("removed", &self.inner.removed.get())
            .finish_non_exhaustive()
    }
}
