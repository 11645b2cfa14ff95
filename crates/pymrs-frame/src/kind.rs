//! Message kinds.
//!
//! Reserved kinds have built-in handling on one side of the channel.
//! Everything else is an application-defined [`MessageKind::Custom`] kind.

use std::fmt;

/// Child -> Parent: content height in pixels.
pub const HEIGHT: &str = "height";

/// Parent -> Child: iframe width in pixels.
pub const WIDTH: &str = "width";

/// Child -> Parent: navigate the hosting page.
pub const NAVIGATE_TO: &str = "navigateTo";

/// Child -> Parent: scroll the hosting page.
pub const SCROLL_TO: &str = "scrollTo";

/// Parent -> Child: viewport size and iframe bounding rect.
pub const VIEWPORT_IFRAME_POSITION: &str = "viewport-iframe-position";

/// Child -> Parent: request a `viewport-iframe-position` message.
pub const PARENT_POSITION_INFO: &str = "parentPositionInfo";

/// Kind assigned to inbound bodies that carry no delimiter.
pub const DEFAULT_KIND: &str = "message";

/// Kinds with predefined handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedKind {
    Height,
    Width,
    NavigateTo,
    ScrollTo,
    ViewportIframePosition,
    ParentPositionInfo,
    Default,
}

impl ReservedKind {
    pub const ALL: [ReservedKind; 7] = [
        ReservedKind::Height,
        ReservedKind::Width,
        ReservedKind::NavigateTo,
        ReservedKind::ScrollTo,
        ReservedKind::ViewportIframePosition,
        ReservedKind::ParentPositionInfo,
        ReservedKind::Default,
    ];

    /// Wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ReservedKind::Height => HEIGHT,
            ReservedKind::Width => WIDTH,
            ReservedKind::NavigateTo => NAVIGATE_TO,
            ReservedKind::ScrollTo => SCROLL_TO,
            ReservedKind::ViewportIframePosition => VIEWPORT_IFRAME_POSITION,
            ReservedKind::ParentPositionInfo => PARENT_POSITION_INFO,
            ReservedKind::Default => DEFAULT_KIND,
        }
    }

    /// Look up a reserved kind by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

/// The kind of a message: reserved or application-defined.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Reserved(ReservedKind),
    Custom(String),
}

impl MessageKind {
    /// Classify a wire name. Reserved names always map to the reserved variant.
    pub fn parse(name: &str) -> Self {
        match ReservedKind::from_name(name) {
            Some(kind) => MessageKind::Reserved(kind),
            None => MessageKind::Custom(name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Reserved(kind) => kind.as_str(),
            MessageKind::Custom(name) => name,
        }
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self, MessageKind::Reserved(_))
    }
}

impl From<ReservedKind> for MessageKind {
    fn from(kind: ReservedKind) -> Self {
        MessageKind::Reserved(kind)
    }
}

impl From<&str> for MessageKind {
    fn from(name: &str) -> Self {
        MessageKind::parse(name)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
