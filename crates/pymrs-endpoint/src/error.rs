/// Setup mistakes reported to the caller at construction time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// The container element the iframe should be rendered into does not exist.
    #[error("container element {0:?} not found")]
    MissingContainer(String),

    /// The child could not determine its instance id.
    #[error("no `childId` query parameter and no configured id")]
    MissingChildId,

    /// The iframe URL could not be turned into a `src`.
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The host refused to create the iframe element.
    #[error("host could not create an iframe in {0:?}")]
    IframeCreationFailed(String),
}

/// Errors that can occur in endpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// Construction-time configuration error.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The message kind is handled internally and cannot be used here.
    #[error("message kind {0:?} is reserved")]
    ReservedKind(String),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] pymrs_frame::FrameError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] pymrs_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, EndpointError>;
