//! Text framing for responsive iframe messaging.
//!
//! Every message crossing the window boundary is a single string:
//! - An envelope tag (`pym`) so foreign `postMessage` traffic is ignored
//! - The instance id shared by one Parent/Child pair
//! - The message kind and its payload
//!
//! All parts are joined by [`DELIMITER`]. Reserved kinds carry structured
//! payloads ([`ScrollTarget`], [`ViewportPosition`], dimensions).

pub mod codec;
pub mod error;
pub mod kind;
pub mod scroll;
pub mod viewport;

pub use codec::{
    decode_envelope, decode_message, encode_envelope, encode_message, parse_dimension,
    validate_instance_id, validate_kind, Envelope, Message, DELIMITER, ENVELOPE_TAG,
};
pub use error::{FrameError, Result};
pub use kind::{MessageKind, ReservedKind};
pub use scroll::ScrollTarget;
pub use viewport::ViewportPosition;
