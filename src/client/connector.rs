use std::sync::Arc;
use log::{debug, info, warn};
use crate::{
    client_handshake, ClientConfig, Connection, ConnectParams, ControlMessage, Epoch, Error, Result,
    RtmpCommand, ServerCommand,
};
use crate::client::url::RtmpUrl;
use crate::protocol::constants::status_codes;
use crate::transport::{Dialer, TcpDialer};
use crate::utils::with_timeout;

/// Dials, handshakes and runs the `connect` command.
///
/// Shared by pushers and pullers; what happens after `connect` is theirs.
#[derive(Clone)]
pub struct SessionConnector {
    config: Arc<ClientConfig>,
    dialer: Arc<dyn Dialer>,
}

impl SessionConnector {
    /// Connector dialing plain TCP/TLS according to `config`
    pub fn new(config: ClientConfig) -> Self {
        let dialer = TcpDialer::new(config.connect_timeout)
            .accept_invalid_certs(config.tls_accept_invalid_certs);
        SessionConnector::with_dialer(config, Arc::new(dialer))
    }

    pub fn with_dialer(config: ClientConfig, dialer: Arc<dyn Dialer>) -> Self {
        SessionConnector {
            config: Arc::new(config),
            dialer,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Establish a connection for `addr` up to a successful `connect`.
    ///
    /// The URL is checked before anything is dialed. Any failure after the
    /// dial closes the socket.
    pub async fn connect(&self, addr: &str) -> Result<Connection> {
        let url = RtmpUrl::parse(addr)?;
        self.config.validate()?;
        self.connect_url(url).await
    }

    pub async fn connect_url(&self, url: RtmpUrl) -> Result<Connection> {
        let endpoint = url.endpoint().clone();
        debug!("Dialing {}", endpoint);

        let mut stream = with_timeout(
            self.config.connect_timeout,
            "Dial",
            self.dialer.dial(&endpoint),
        )
        .await?;

        let epoch = Epoch::now();
        client_handshake(
            &mut stream,
            self.config.handshake_mode,
            &epoch,
            self.config.read_timeout,
            self.config.write_timeout,
        )
        .await?;

        let mut connection = Connection::new(stream, url, &self.config, epoch);
        match self.run_connect(&mut connection).await {
            Ok(()) => {
                info!(
                    "[{}] Connected to {} (app '{}')",
                    connection.id(),
                    endpoint,
                    connection.url().app()
                );
                Ok(connection)
            }
            Err(e) => {
                warn!("[{}] Connect to {} failed: {}", connection.id(), endpoint, e);
                let _ = connection.close().await;
                Err(match e {
                    Error::Io(io) => Error::connect(io.to_string()),
                    other => other,
                })
            }
        }
    }

    async fn run_connect(&self, connection: &mut Connection) -> Result<()> {
        let sender = connection.sender();
        sender.set_chunk_size(self.config.chunk_size).await?;

        let url = connection.url().clone();
        let params = ConnectParams {
            app: url.app().to_string(),
            flash_ver: self.config.flash_ver.clone(),
            swf_url: url.swf_url().to_string(),
            tc_url: url.tc_url(),
        };
        let transaction_id = connection.next_transaction_id();
        sender.send_command(0, &RtmpCommand::connect(transaction_id, &params)).await?;
        sender.send_control(ControlMessage::WindowAckSize(self.config.window_ack_size)).await?;

        let command = connection.recv_command().await?;
        match command {
            ServerCommand::Result { transaction_id: tx, status: Some(status), .. }
                if tx == transaction_id && status.code == status_codes::CONNECT_SUCCESS =>
            {
                Ok(())
            }
            other => {
                let (code, description) = match other.status() {
                    Some(status) => (status.code.clone(), status.description.clone()),
                    None => (other.name().to_string(), String::new()),
                };
                Err(Error::connect_rejected(code, description))
            }
        }
    }
}
