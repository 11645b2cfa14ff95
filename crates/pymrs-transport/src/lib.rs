//! Window messaging transport.
//!
//! Abstracts the host's cross-window messaging primitive behind two traits:
//! - [`MessageTarget`]: a window other contexts can post text into
//! - [`MessageSource`]: a window delivering inbound [`MessageEvent`]s
//!
//! [`Transport`] sits on top: it frames outgoing messages, checks inbound
//! origins against an [`OriginPolicy`], and filters traffic for other instances.

pub mod error;
pub mod origin;
pub mod traits;
pub mod transport;

pub use error::{Result, TransportError};
pub use origin::{origin_of, OriginPolicy, WILDCARD};
pub use traits::{ListenerId, MessageEvent, MessageListener, MessageSource, MessageTarget};
pub use transport::{InboundFilter, Transport, TransportConfig};
