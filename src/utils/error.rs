use std::io::Error as IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Connect error: {0}")]
    Connect(String),

    #[error("Handshake error: {0}")]
    Handshake(String),

    #[error("Connect rejected: {code} ({description})")]
    ConnectRejected { code: String, description: String },

    #[error("Publish rejected: {code} ({description})")]
    PublishRejected { code: String, description: String },

    #[error("Play rejected: {code} ({description})")]
    PlayRejected { code: String, description: String },

    #[error("Chunk format error: {0}")]
    ChunkFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("AMF decode error: {0}")]
    AmfDecode(String),

    #[error("AMF encode error: {0}")]
    AmfEncode(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create an invalid URL error
    pub fn invalid_url(msg: impl Into<String>) -> Self {
        Error::InvalidUrl(msg.into())
    }

    /// Create a connect (dial/transport) error
    pub fn connect(msg: impl Into<String>) -> Self {
        Error::Connect(msg.into())
    }

    /// Create a handshake error
    pub fn handshake(msg: impl Into<String>) -> Self {
        Error::Handshake(msg.into())
    }

    /// Create a connect rejection carrying the peer's status
    pub fn connect_rejected(code: impl Into<String>, description: impl Into<String>) -> Self {
        Error::ConnectRejected { code: code.into(), description: description.into() }
    }

    /// Create a publish rejection carrying the peer's status
    pub fn publish_rejected(code: impl Into<String>, description: impl Into<String>) -> Self {
        Error::PublishRejected { code: code.into(), description: description.into() }
    }

    /// Create a play rejection carrying the peer's status
    pub fn play_rejected(code: impl Into<String>, description: impl Into<String>) -> Self {
        Error::PlayRejected { code: code.into(), description: description.into() }
    }

    /// Create a chunk format error
    pub fn chunk_format(msg: impl Into<String>) -> Self {
        Error::ChunkFormat(msg.into())
    }

    /// Create an IO error from message
    pub fn io(msg: impl Into<String>) -> Self {
        Error::Io(IoError::other(msg.into()))
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create an AMF decode error
    pub fn amf_decode(msg: impl Into<String>) -> Self {
        Error::AmfDecode(msg.into())
    }

    /// Create an AMF encode error
    pub fn amf_encode(msg: impl Into<String>) -> Self {
        Error::AmfEncode(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Status code supplied by the peer, if this is a rejection
    pub fn peer_code(&self) -> Option<&str> {
        match self {
            Error::ConnectRejected { code, .. }
            | Error::PublishRejected { code, .. }
            | Error::PlayRejected { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    /// Whether the connection must be torn down after this error.
    ///
    /// Everything except configuration and URL mistakes (which happen before
    /// any socket exists) leaves the connection unusable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::InvalidUrl(_) | Error::Configuration(_))
    }
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
