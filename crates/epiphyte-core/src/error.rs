use thiserror::Error;

pub type EpiphyteResult<T> = Result<T, EpiphyteError>;

/// Every failure the protocol can surface.
///
/// An absent storage record is not in here: end-of-chain is an ordinary
/// `None` from the storage layer.
#[derive(Debug, Error)]
pub enum EpiphyteError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("connection timeout: {0}")]
    Timeout(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("invalid padding (corrupted or foreign frame)")]
    InvalidPadding,

    #[error("decode error: {0}")]
    Decode(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("stale seal: the chain tail moved after the chunk was sealed")]
    StaleSeal,

    #[error("key derivation failed: {0}")]
    Kdf(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse failure class, used to categorize errors for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection failure or timeout. Never retried internally.
    TransientIo,
    /// Unexpected storage response, or a frame that does not decode.
    ProtocolViolation,
    /// The chosen storage key is already occupied.
    Conflict,
    Other,
}

impl EpiphyteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) | Self::Timeout(_) => ErrorKind::TransientIo,
            Self::InvalidResponse(_)
            | Self::MalformedFrame(_)
            | Self::InvalidPadding
            | Self::Decode(_) => ErrorKind::ProtocolViolation,
            Self::AlreadyExists(_) => ErrorKind::Conflict,
            Self::StaleSeal
            | Self::Kdf(_)
            | Self::Config(_)
            | Self::Storage(_)
            | Self::Io(_)
            | Self::Other(_) => ErrorKind::Other,
        }
    }
}
