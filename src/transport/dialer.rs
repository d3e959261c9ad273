use std::time::Duration;
use async_trait::async_trait;
use log::debug;
use tokio::net::TcpStream;
use tokio::time::timeout;
use crate::{Error, Result};
use crate::transport::{BoxedStream, Endpoint};

/// Opens the byte stream for a session
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, endpoint: &Endpoint) -> Result<BoxedStream>;
}

/// Dials TCP, wrapping in TLS for `rtmps`
#[derive(Debug, Clone)]
pub struct TcpDialer {
    connect_timeout: Duration,
    accept_invalid_certs: bool,
}

impl TcpDialer {
    pub fn new(connect_timeout: Duration) -> Self {
        TcpDialer {
            connect_timeout,
            accept_invalid_certs: false,
        }
    }

    /// Skip certificate validation for rtmps (testing against self-signed servers)
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    async fn connect_tcp(&self, endpoint: &Endpoint) -> Result<TcpStream> {
        let addr = (endpoint.host.as_str(), endpoint.port);
        let stream = match timeout(self.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(Error::connect(format!("Connection to {} failed: {}", endpoint, e))),
            Err(_) => return Err(Error::timeout(format!("Connection to {} timed out", endpoint))),
        };
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, endpoint: &Endpoint) -> Result<BoxedStream> {
        let tcp = self.connect_tcp(endpoint).await?;
        debug!("TCP connected to {}", endpoint);

        if !endpoint.tls {
            return Ok(Box::new(tcp));
        }

        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()
            .map_err(|e| Error::connect(format!("TLS setup failed: {}", e)))?;
        let connector = tokio_native_tls::TlsConnector::from(connector);

        let tls = match timeout(self.connect_timeout, connector.connect(&endpoint.host, tcp)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(Error::connect(format!("TLS handshake with {} failed: {}", endpoint, e))),
            Err(_) => return Err(Error::timeout(format!("TLS handshake with {} timed out", endpoint))),
        };
        debug!("TLS established with {}", endpoint);

        Ok(Box::new(tls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_dial_plain_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let dialer = TcpDialer::new(Duration::from_secs(1));
        assert!(dialer.dial(&Endpoint::new("127.0.0.1", port, false)).await.is_ok());
    }

    #[tokio::test]
    async fn test_dial_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let dialer = TcpDialer::new(Duration::from_secs(1));
        let err = dialer.dial(&Endpoint::new("127.0.0.1", port, false)).await.err().unwrap();
        assert!(matches!(err, Error::Connect(_) | Error::Timeout(_)));
    }
}
