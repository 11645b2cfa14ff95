use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use pymrs_frame::{decode_envelope, encode_envelope, validate_instance_id, Message, MessageKind};
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::origin::OriginPolicy;
use crate::traits::{ListenerId, MessageEvent, MessageSource, MessageTarget};

/// Settings for one endpoint's transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Id shared by the Parent/Child pair; foreign ids are ignored.
    pub instance_id: String,
    /// Which sender origins are accepted.
    pub policy: OriginPolicy,
    /// `targetOrigin` used when posting.
    pub target_origin: String,
}

/// Inbound half of a transport: origin check, envelope check, decode.
#[derive(Debug, Clone)]
pub struct InboundFilter {
    instance_id: String,
    policy: OriginPolicy,
}

impl InboundFilter {
    /// Decode an inbound event, or `None` if it must be dropped.
    pub fn accept(&self, event: &MessageEvent) -> Option<Message> {
        if !self.policy.allows(&event.origin) {
            debug!(origin = %event.origin, "dropping message from rejected origin");
            return None;
        }

        let envelope = decode_envelope(&event.data)?;
        if envelope.instance_id != self.instance_id {
            trace!(
                instance = %envelope.instance_id,
                expected = %self.instance_id,
                "ignoring message for another instance"
            );
            return None;
        }

        trace!(
            instance = %self.instance_id,
            kind = %envelope.message.kind,
            "received message"
        );
        Some(envelope.message)
    }
}

/// Origin-checked, instance-scoped messaging between two windows.
///
/// The transport holds only a weak reference to its target window: the host
/// owns window lifetimes. It registers at most one listener on its source
/// window, removed again by [`Transport::close`].
pub struct Transport {
    filter: InboundFilter,
    target_origin: String,
    source: Rc<dyn MessageSource>,
    target: RefCell<Option<Weak<dyn MessageTarget>>>,
    listener: Cell<Option<ListenerId>>,
    closed: Cell<bool>,
}

impl Transport {
    /// Create a transport receiving on `source`. Attach a target with
    /// [`Transport::retarget`] before sending.
    pub fn new(config: TransportConfig, source: Rc<dyn MessageSource>) -> Result<Self> {
        validate_instance_id(&config.instance_id)?;
        Ok(Self {
            filter: InboundFilter {
                instance_id: config.instance_id,
                policy: config.policy,
            },
            target_origin: config.target_origin,
            source,
            target: RefCell::new(None),
            listener: Cell::new(None),
            closed: Cell::new(false),
        })
    }

    /// Point outgoing messages at `target`, or detach with `None`.
    pub fn retarget(&self, target: Option<&Rc<dyn MessageTarget>>) {
        *self.target.borrow_mut() = target.map(Rc::downgrade);
    }

    /// Send a message, dropping it silently if it cannot be delivered.
    pub fn send(&self, kind: &MessageKind, payload: &str) {
        if let Err(err) = self.try_send(kind, payload) {
            debug!(
                instance = %self.filter.instance_id,
                %kind,
                error = %err,
                "message dropped"
            );
        }
    }

    /// Send a message, reporting why it could not be posted.
    pub fn try_send(&self, kind: &MessageKind, payload: &str) -> Result<()> {
        if self.closed.get() {
            return Err(TransportError::Closed);
        }

        let target = self
            .target
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(TransportError::TargetUnavailable)?;
        if target.is_closed() {
            return Err(TransportError::TargetClosed);
        }

        let data = encode_envelope(&self.filter.instance_id, kind, payload)?;
        trace!(instance = %self.filter.instance_id, %kind, "sending message");
        target.post_message(&data, &self.target_origin)
    }

    /// Decode an inbound event without going through the window listener.
    pub fn receive(&self, event: &MessageEvent) -> Option<Message> {
        if self.closed.get() {
            return None;
        }
        self.filter.accept(event)
    }

    /// Register the window listener. `handler` sees only accepted messages.
    pub fn listen(&self, mut handler: impl FnMut(Message) + 'static) -> Result<()> {
        if self.closed.get() {
            return Err(TransportError::Closed);
        }
        if self.listener.get().is_some() {
            return Err(TransportError::AlreadyListening);
        }

        let filter = self.filter.clone();
        let id = self.source.add_message_listener(Box::new(move |event| {
            if let Some(message) = filter.accept(event) {
                handler(message);
            }
        }));
        self.listener.set(Some(id));
        Ok(())
    }

    /// Unregister the window listener and refuse further sends. Idempotent.
    pub fn close(&self) {
        self.closed.set(true);
        if let Some(id) = self.listener.take() {
            self.source.remove_message_listener(id);
            debug!(instance = %self.filter.instance_id, "transport listener removed");
        }
        self.target.borrow_mut().take();
    }

    pub fn instance_id(&self) -> &str {
        &self.filter.instance_id
    }

    pub fn policy(&self) -> &OriginPolicy {
        &self.filter.policy
    }

    pub fn target_origin(&self) -> &str {
        &self.target_origin
    }

    pub fn is_listening(&self) -> bool {
        self.listener.get().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("instance_id", &self.filter.instance_id)
            .field("policy", &self.filter.policy)
            .field("target_origin", &self.target_origin)
            .field("listening", &self.is_listening())
            .field("closed", &self.closed.get())
            .finish()
    }
}
