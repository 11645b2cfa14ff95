/// Errors that can occur in window messaging.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No target window is attached, or it has been dropped by the host.
    #[error("target window unavailable")]
    TargetUnavailable,

    /// The target window exists but has been closed.
    #[error("target window closed")]
    TargetClosed,

    /// The transport already has its window listener registered.
    #[error("transport already listening")]
    AlreadyListening,

    /// The transport has been closed.
    #[error("transport closed")]
    Closed,

    /// The message could not be framed.
    #[error("frame error: {0}")]
    Frame(#[from] pymrs_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, TransportError>;
