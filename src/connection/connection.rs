use std::sync::Arc;
use std::time::Duration;
use log::{debug, warn};
use tokio::io::{self, ReadHalf};
use uuid::Uuid;
use crate::{ChunkDecoder, ChunkEncoder, ClientConfig, Epoch, Error, Result};
use crate::protocol::{
    validate_peer_chunk_size, ControlMessage, Message, RtmpCommand, ServerCommand, UserControlEvent,
};
use crate::connection::context::ConnectionInfo;
use crate::connection::sender::MessageSender;
use crate::client::RtmpUrl;
use crate::transport::BoxedStream;

/// An established RTMP connection, after the handshake.
///
/// Owns the read half and its chunk decoder. Writes go through the
/// [`MessageSender`], which can be cloned out to other tasks.
pub struct Connection {
    /// Connection ID
    id: Arc<str>,

    info: ConnectionInfo,

    /// Dropped on close
    reader: Option<ReadHalf<BoxedStream>>,

    decoder: ChunkDecoder,

    sender: MessageSender,

    /// `None` waits forever
    read_timeout: Option<Duration>,

    /// Window announced by the peer; 0 until it sends one
    peer_window: u32,

    /// Byte count at the last acknowledgement we sent
    last_ack: u64,

    next_transaction_id: f64,

    epoch: Epoch,
}

impl Connection {
    /// Wrap a stream that has completed the handshake
    pub fn new(stream: BoxedStream, url: RtmpUrl, config: &ClientConfig, epoch: Epoch) -> Self {
        let id: Arc<str> = Arc::from(&Uuid::new_v4().simple().to_string()[..8]);
        let (reader, writer) = io::split(stream);

        let mut encoder = ChunkEncoder::new();
        encoder.set_header_compression(config.compress_headers);

        Connection {
            info: ConnectionInfo { id: id.to_string(), url },
            reader: Some(reader),
            decoder: ChunkDecoder::new().with_max_message_size(config.max_message_size),
            sender: MessageSender::new(writer, encoder, config.write_timeout, id.clone()),
            read_timeout: Some(config.read_timeout),
            peer_window: 0,
            last_ack: 0,
            next_transaction_id: 1.0,
            epoch,
            id,
        }
    }

    /// Get connection ID
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    pub fn url(&self) -> &RtmpUrl {
        &self.info.url
    }

    /// Clone of the write handle
    pub fn sender(&self) -> MessageSender {
        self.sender.clone()
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    pub fn read_chunk_size(&self) -> usize {
        self.decoder.chunk_size()
    }

    pub fn bytes_read(&self) -> u64 {
        self.decoder.bytes_read()
    }

    /// Allocate the next transaction id (1, 2, ...)
    pub fn next_transaction_id(&mut self) -> f64 {
        let id = self.next_transaction_id;
        self.next_transaction_id += 1.0;
        id
    }

    pub async fn send_command(&self, message_stream_id: u32, command: &RtmpCommand) -> Result<()> {
        self.sender.send_command(message_stream_id, command).await
    }

    /// Next non-control message.
    ///
    /// Protocol control and user control messages are handled here and
    /// never returned: chunk size and abort drive the decoder, pings are
    /// answered, and acknowledgements are sent as the peer's window fills.
    pub async fn recv_message(&mut self) -> Result<Message> {
        loop {
            let message = self.read_one().await?;
            self.acknowledge_if_due().await?;

            match ControlMessage::parse(&message)? {
                Some(control) => self.handle_control(control).await?,
                None => return Ok(message),
            }
        }
    }

    /// Next AMF0 command; other messages are dropped
    pub async fn recv_command(&mut self) -> Result<ServerCommand> {
        loop {
            let message = self.recv_message().await?;
            if message.is_command() {
                return ServerCommand::decode(&message.payload);
            }
            debug!(
                "[{}] Dropping message type {} while waiting for a command",
                self.id,
                message.message_type()
            );
        }
    }

    /// Shut down the write half and drop the read half.
    ///
    /// Later reads fail with `InvalidState`, as do sends through any
    /// cloned [`MessageSender`].
    pub async fn close(&mut self) -> Result<()> {
        debug!("[{}] Closing connection", self.id);
        self.reader = None;
        self.sender.close().await
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    async fn read_one(&mut self) -> Result<Message> {
        let reader = self.reader.as_mut().ok_or_else(|| {
            Error::invalid_state(format!("Connection {} is closed", self.id))
        })?;
        let read = self.decoder.read_message(reader);
        match self.read_timeout {
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(result) => result,
                Err(_) => Err(Error::timeout(format!("No message within {:?}", limit))),
            },
            None => read.await,
        }
    }

    async fn acknowledge_if_due(&mut self) -> Result<()> {
        let read = self.decoder.bytes_read();
        if self.peer_window == 0 || read - self.last_ack < self.peer_window as u64 {
            return Ok(());
        }
        self.last_ack = read;
        self.sender
            .send_control(ControlMessage::Acknowledgement { sequence_number: read as u32 })
            .await
    }

    async fn handle_control(&mut self, control: ControlMessage) -> Result<()> {
        match control {
            ControlMessage::SetChunkSize(size) => {
                let size = validate_peer_chunk_size(size)?;
                self.decoder.set_chunk_size(size as usize)?;
                debug!("[{}] Read chunk size set to {}", self.id, size);
            }
            ControlMessage::Abort { chunk_stream_id } => {
                debug!("[{}] Peer aborted message on chunk stream {}", self.id, chunk_stream_id);
                self.decoder.abort(chunk_stream_id);
            }
            ControlMessage::Acknowledgement { sequence_number } => {
                debug!("[{}] Peer acknowledged {} bytes", self.id, sequence_number);
            }
            ControlMessage::WindowAckSize(size) => {
                debug!("[{}] Peer window acknowledgement size {}", self.id, size);
                self.peer_window = size;
            }
            ControlMessage::SetPeerBandwidth { size, limit_type } => {
                debug!("[{}] Peer bandwidth {} (limit type {})", self.id, size, limit_type);
            }
            ControlMessage::UserControl(UserControlEvent::PingRequest(timestamp)) => {
                self.sender
                    .send_control(ControlMessage::UserControl(UserControlEvent::PingResponse(timestamp)))
                    .await?;
            }
            ControlMessage::UserControl(UserControlEvent::Other { event_type, .. }) => {
                warn!("[{}] Unknown user control event {}", self.id, event_type);
            }
            ControlMessage::UserControl(event) => {
                debug!("[{}] User control {:?}", self.id, event);
            }
        }
        Ok(())
    }
}
