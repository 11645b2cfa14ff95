//! Parent and Child endpoints for responsive cross-origin iframes.
//!
//! This is the "just works" layer. A [`Parent`] embeds an iframe into a
//! container and resizes it as the [`Child`] inside reports its height; the
//! Child can also ask the hosting page to navigate or scroll.
//!
//! Both endpoints are written against the host traits in [`host`], so they run
//! in a browser binding, in a test double, or in the deterministic [`sim`]ulator.

pub mod autoinit;
pub mod child;
pub mod config;
pub mod error;
pub mod host;
#[cfg(feature = "tokio")]
pub mod local;
pub mod parent;
pub mod query;
pub mod router;
pub mod sim;
mod throttle;

pub use autoinit::{auto_init, AUTO_INITIALIZED_ATTRIBUTE, AUTO_INIT_SRC_ATTRIBUTE};
pub use child::Child;
pub use config::{ChildConfig, ParentConfig, RenderCallback, DEFAULT_SCROLL_WAIT};
pub use error::{ConfigurationError, EndpointError, Result};
pub use host::{
    AutoInitContainer, ChildHost, HostWindow, IFrameElement, IframeAttributes, ParentHost, Rect,
    Scheduler, TimerId, Viewport, WindowEvent,
};
#[cfg(feature = "tokio")]
pub use local::LocalScheduler;
pub use parent::Parent;
pub use query::{build_iframe_src, ChildQuery, IframeSrc, DEFAULT_PARENT_URL_PARAM};
pub use router::{CallbackError, CallbackResult, MessageRouter};
