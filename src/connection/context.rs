use crate::client::RtmpUrl;

/// Identity of an established connection, handed to session hooks
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Short id prefixed to every log line of this connection
    pub id: String,

    /// Address the connection was made for
    pub url: RtmpUrl,
}

impl ConnectionInfo {
    pub fn app(&self) -> &str {
        self.url.app()
    }

    pub fn tc_url(&self) -> String {
        self.url.tc_url()
    }
}
