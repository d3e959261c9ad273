use async_trait::async_trait;
use tokio::sync::watch;
use crate::{Amf0Object, Error, Message, MessageSender, Result, RtmpData, MSG_TYPE_DATA_AMF0};
use crate::connection::ConnectionInfo;

/// Asks a running session to stop. Cloneable; any clone can stop it.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        StopHandle { tx }
    }

    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn signal(&self) -> StopSignal {
        StopSignal { rx: self.tx.subscribe() }
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a [`StopHandle`]
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once stop was requested, or the handle is gone
    pub async fn stopped(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

/// Sends media on the stream id a pusher was granted
#[derive(Clone)]
pub struct MediaSender {
    sender: MessageSender,
    stream_id: u32,
}

impl MediaSender {
    pub(crate) fn new(sender: MessageSender, stream_id: u32) -> Self {
        MediaSender { sender, stream_id }
    }

    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    pub async fn send_audio(&self, timestamp: u32, payload: Vec<u8>) -> Result<()> {
        self.sender.send(&Message::audio(timestamp, self.stream_id, payload)).await
    }

    pub async fn send_video(&self, timestamp: u32, payload: Vec<u8>) -> Result<()> {
        self.sender.send(&Message::video(timestamp, self.stream_id, payload)).await
    }

    /// `@setDataFrame onMetaData` with the given properties
    pub async fn send_metadata(&self, metadata: Amf0Object) -> Result<()> {
        let payload = RtmpData::set_data_frame(metadata).encode()?;
        self.sender.send(&Message::data(0, self.stream_id, payload)).await
    }

    /// Forward an already encoded audio, video or data message
    pub async fn send_message(&self, message: &Message) -> Result<()> {
        if !(message.is_audio() || message.is_video() || message.message_type() == MSG_TYPE_DATA_AMF0) {
            return Err(Error::invalid_state(format!(
                "Message type {} cannot be sent as media",
                message.message_type()
            )));
        }
        let mut message = message.clone();
        message.header.message_stream_id = self.stream_id;
        self.sender.send(&message).await
    }
}

/// Produces the media a pusher publishes.
///
/// Runs in its own task once the server accepted the publish, and should
/// return when `stop` fires. Returning an error ends the session.
#[async_trait]
pub trait MediaPump: Send + 'static {
    async fn pump(&mut self, sender: MediaSender, stop: StopSignal) -> Result<()>;
}

/// Consumes the media a puller receives, in receipt order
#[async_trait]
pub trait MediaSink: Send {
    async fn receive_audio(&mut self, message: Message) -> Result<()>;

    async fn receive_video(&mut self, message: Message) -> Result<()>;

    /// AMF0 data messages such as `onMetaData`
    async fn receive_data(&mut self, _message: Message) -> Result<()> {
        Ok(())
    }
}

/// Lifecycle callbacks for the host application
pub trait SessionHooks: Send + Sync {
    /// The `connect` command succeeded
    fn on_connected(&self, _info: &ConnectionInfo) {}

    /// The session ended, with the error that ended it if any
    fn on_stop(&self, _error: Option<&Error>) {}
}

/// Hooks that do nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl SessionHooks for NoHooks {}
