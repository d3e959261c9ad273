use std::time::Duration;
use crate::{Error, Result, HandshakeMode, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_WINDOW_SIZE};

/// Default `flashVer` sent in `connect`
pub const DEFAULT_FLASH_VER: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connection timeout (TCP connect and TLS handshake)
    pub connect_timeout: Duration,

    /// Read timeout
    pub read_timeout: Duration,

    /// Write timeout
    pub write_timeout: Duration,

    /// Chunk size announced to the peer and used for writing
    pub chunk_size: u32,

    /// Window acknowledgement size announced after connect
    pub window_ack_size: u32,

    /// Largest inbound message accepted
    pub max_message_size: u32,

    /// `flashVer` field of the connect command
    pub flash_ver: String,

    pub handshake_mode: HandshakeMode,

    /// Compress chunk headers against the previous message
    pub compress_headers: bool,

    /// Accept invalid TLS certificates for rtmps
    pub tls_accept_invalid_certs: bool,

    /// Buffer time in milliseconds, sent after play
    pub buffer_time: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            chunk_size: 4096,
            window_ack_size: DEFAULT_WINDOW_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            flash_ver: DEFAULT_FLASH_VER.to_string(),
            handshake_mode: HandshakeMode::Simple,
            compress_headers: true,
            tls_accept_invalid_certs: false,
            buffer_time: 1000,
        }
    }
}

impl ClientConfig {
    /// Create config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size < 128 {
            return Err(Error::config("Chunk size must be at least 128"));
        }

        if self.chunk_size > 65536 {
            return Err(Error::config("Chunk size must not exceed 65536"));
        }

        if self.window_ack_size == 0 {
            return Err(Error::config("Window acknowledgement size must be positive"));
        }

        if self.max_message_size == 0 {
            return Err(Error::config("Maximum message size must be positive"));
        }

        if self.connect_timeout.is_zero() || self.read_timeout.is_zero() || self.write_timeout.is_zero() {
            return Err(Error::config("Timeouts must be non-zero"));
        }

        Ok(())
    }
}

/// Builder for ClientConfig
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create new builder
    pub fn new() -> Self {
        ClientConfigBuilder {
            config: ClientConfig::default(),
        }
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    /// Set chunk size
    pub fn chunk_size(mut self, size: u32) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn window_ack_size(mut self, size: u32) -> Self {
        self.config.window_ack_size = size;
        self
    }

    pub fn max_message_size(mut self, size: u32) -> Self {
        self.config.max_message_size = size;
        self
    }

    pub fn flash_ver(mut self, flash_ver: impl Into<String>) -> Self {
        self.config.flash_ver = flash_ver.into();
        self
    }

    pub fn handshake_mode(mut self, mode: HandshakeMode) -> Self {
        self.config.handshake_mode = mode;
        self
    }

    pub fn compress_headers(mut self, enabled: bool) -> Self {
        self.config.compress_headers = enabled;
        self
    }

    pub fn tls_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.tls_accept_invalid_certs = accept;
        self
    }

    /// Set buffer time
    pub fn buffer_time(mut self, ms: u32) -> Self {
        self.config.buffer_time = ms;
        self
    }

    /// Build configuration
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
