use std::sync::Arc;
use std::time::Duration;
use log::debug;
use tokio::io::{AsyncWriteExt, WriteHalf};
use tokio::sync::Mutex;
use crate::{ChunkEncoder, ControlMessage, Error, Message, Result, RtmpCommand};
use crate::transport::BoxedStream;
use crate::utils::with_timeout;

struct WriteSide {
    encoder: ChunkEncoder,
    writer: WriteHalf<BoxedStream>,
    closed: bool,
}

/// Cloneable handle on the write half of a connection.
///
/// The chunk encoder lives under the same lock as the socket so chunk
/// header state always matches what actually went out.
#[derive(Clone)]
pub struct MessageSender {
    inner: Arc<Mutex<WriteSide>>,
    write_timeout: Duration,
    conn_id: Arc<str>,
}

impl MessageSender {
    pub(crate) fn new(
        writer: WriteHalf<BoxedStream>,
        encoder: ChunkEncoder,
        write_timeout: Duration,
        conn_id: Arc<str>,
    ) -> Self {
        MessageSender {
            inner: Arc::new(Mutex::new(WriteSide { encoder, writer, closed: false })),
            write_timeout,
            conn_id,
        }
    }

    /// Send one message
    pub async fn send(&self, message: &Message) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let side = &mut *guard;
        if side.closed {
            return Err(Error::invalid_state("Connection is closed"));
        }
        with_timeout(
            self.write_timeout,
            "Message write",
            side.encoder.write_message(message, &mut side.writer),
        )
        .await
    }

    /// Send an AMF0 command on `message_stream_id`
    pub async fn send_command(&self, message_stream_id: u32, command: &RtmpCommand) -> Result<()> {
        debug!(
            "[{}] Sending {} (tx {}) on stream {}",
            self.conn_id, command.name, command.transaction_id, message_stream_id
        );
        let payload = command.encode()?;
        self.send(&Message::command(message_stream_id, payload)).await
    }

    pub async fn send_control(&self, control: ControlMessage) -> Result<()> {
        self.send(&control.into_message()).await
    }

    /// Announce a new write chunk size and switch to it.
    ///
    /// The announcement itself still goes out in the old size.
    pub async fn set_chunk_size(&self, size: u32) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let side = &mut *guard;
        if side.closed {
            return Err(Error::invalid_state("Connection is closed"));
        }
        let message = ControlMessage::SetChunkSize(size).into_message();
        with_timeout(
            self.write_timeout,
            "Set chunk size write",
            side.encoder.write_message(&message, &mut side.writer),
        )
        .await?;
        side.encoder.set_chunk_size(size as usize)?;
        debug!("[{}] Write chunk size set to {}", self.conn_id, size);
        Ok(())
    }

    pub async fn chunk_size(&self) -> usize {
        self.inner.lock().await.encoder.chunk_size()
    }

    /// Shut the write half down. Later sends fail with `InvalidState`.
    pub async fn close(&self) -> Result<()> {
        let mut side = self.inner.lock().await;
        if side.closed {
            return Ok(());
        }
        side.closed = true;
        side.writer.shutdown().await?;
        Ok(())
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }
}
