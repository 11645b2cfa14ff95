//! Responsive cross-origin iframes.
//!
//! A [`Parent`] on the hosting page creates an iframe and keeps its height in
//! sync with the [`Child`] document inside it. The two sides talk over the
//! window messaging channel using a small text protocol.
//!
//! # Crate Structure
//!
//! - [`frame`]: wire codec (delimiter, envelope, message kinds, reserved payloads)
//! - [`transport`]: window messaging traits, origin policy, instance-scoped transport
//! - [`endpoint`]: `Parent`, `Child`, message routing, host traits and the simulator

/// Re-export frame types.
pub mod frame {
    pub use pymrs_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use pymrs_transport::*;
}

/// Re-export endpoint types.
pub mod endpoint {
    pub use pymrs_endpoint::*;
}

pub use pymrs_endpoint::{
    auto_init, Child, ChildConfig, ConfigurationError, EndpointError, MessageRouter, Parent,
    ParentConfig,
};
