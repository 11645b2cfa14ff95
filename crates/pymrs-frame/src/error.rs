/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The message kind is empty, overlaps the delimiter, or reuses a reserved name.
    #[error("invalid message kind {0:?}")]
    InvalidKind(String),

    /// The instance id is empty or overlaps the delimiter.
    #[error("invalid instance id {0:?}")]
    InvalidInstanceId(String),

    /// A reserved payload does not have the expected structure.
    #[error("malformed {kind} payload: {reason}")]
    Malformed { kind: &'static str, reason: String },
}

impl FrameError {
    pub(crate) fn malformed(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            kind,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
