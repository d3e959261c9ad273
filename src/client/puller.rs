use std::sync::Arc;
use log::{debug, info, warn};
use tokio::sync::watch;
use crate::{
    ClientConfig, Connection, ControlMessage, Error, Result, RtmpCommand, ServerCommand,
    StatusInfo, UserControlEvent, MSG_TYPE_AUDIO, MSG_TYPE_COMMAND_AMF0, MSG_TYPE_DATA_AMF0,
    MSG_TYPE_VIDEO,
};
use crate::client::connector::SessionConnector;
use crate::client::media::{MediaSink, NoHooks, SessionHooks, StopHandle};
use crate::client::state::{SessionState, StateCell};
use crate::protocol::constants::status_codes;

/// Plays a remote RTMP stream into a [`MediaSink`].
pub struct RtmpPuller {
    url: String,
    connector: SessionConnector,
    hooks: Arc<dyn SessionHooks>,
    state: StateCell,
    stop: StopHandle,
    connection: Option<Connection>,
}

impl RtmpPuller {
    pub fn new(url: impl Into<String>, config: ClientConfig) -> Self {
        RtmpPuller::with_connector(url, SessionConnector::new(config))
    }

    pub fn with_connector(url: impl Into<String>, connector: SessionConnector) -> Self {
        RtmpPuller {
            url: url.into(),
            connector,
            hooks: Arc::new(NoHooks),
            state: StateCell::new(),
            stop: StopHandle::new(),
            connection: None,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn SessionHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Dial, handshake and `connect`
    pub async fn connect(&mut self) -> Result<()> {
        if self.state.get() != SessionState::Idle {
            return Err(Error::invalid_state(format!("Cannot connect in state {:?}", self.state.get())));
        }
        self.state.transition(SessionState::AwaitingConnect);

        match self.connector.connect(&self.url).await {
            Ok(connection) => {
                info!("[{}] Puller connected to {}", connection.id(), self.url);
                self.hooks.on_connected(connection.info());
                self.connection = Some(connection);
                Ok(())
            }
            Err(e) => {
                self.state.transition(SessionState::Closed);
                Err(e)
            }
        }
    }

    /// Create the stream, `play` it and feed `sink` until the session ends.
    ///
    /// Returns `Ok` only when stopped through the [`StopHandle`].
    pub async fn pull<S: MediaSink>(&mut self, sink: &mut S) -> Result<()> {
        let mut connection = self.connection.take().ok_or_else(|| {
            Error::invalid_state(format!("Cannot pull in state {:?}", self.state.get()))
        })?;

        let result = self.run(&mut connection, sink).await;

        let _ = connection.close().await;
        self.state.transition(SessionState::Closed);
        match &result {
            Ok(()) => info!("[{}] Pull stopped", connection.id()),
            Err(e) => warn!("[{}] Pull ended: {}", connection.id(), e),
        }
        self.hooks.on_stop(result.as_ref().err());
        result
    }

    async fn run<S: MediaSink>(&self, connection: &mut Connection, sink: &mut S) -> Result<()> {
        self.state.transition(SessionState::AwaitingCreateStream);
        let transaction_id = connection.next_transaction_id();
        connection.send_command(0, &RtmpCommand::create_stream(transaction_id)).await?;

        let mut stream_id = None;
        let mut stop = self.stop.signal();
        loop {
            let message = tokio::select! {
                _ = stop.stopped() => return Ok(()),
                message = connection.recv_message() => message?,
            };

            match message.message_type() {
                MSG_TYPE_AUDIO => sink.receive_audio(message).await?,
                MSG_TYPE_VIDEO => sink.receive_video(message).await?,
                MSG_TYPE_DATA_AMF0 => sink.receive_data(message).await?,
                MSG_TYPE_COMMAND_AMF0 => {
                    let command = ServerCommand::decode(&message.payload)?;
                    self.on_command(connection, command, transaction_id, &mut stream_id).await?;
                }
                other => debug!("[{}] Dropping message type {}", connection.id(), other),
            }
        }
    }

    async fn on_command(
        &self,
        connection: &mut Connection,
        command: ServerCommand,
        transaction_id: f64,
        stream_id: &mut Option<u32>,
    ) -> Result<()> {
        match command {
            ServerCommand::StreamCreated { transaction_id: tx, stream_id: id }
                if tx == transaction_id && stream_id.is_none() =>
            {
                let name = connection.url().play_name();
                debug!("[{}] Stream {} created, playing '{}'", connection.id(), id, name);
                connection.send_command(id, &RtmpCommand::play(0.0, &name)).await?;

                let buffer = ControlMessage::UserControl(UserControlEvent::SetBufferLength {
                    stream_id: id,
                    buffer_ms: self.connector.config().buffer_time,
                });
                connection.sender().send_control(buffer).await?;

                *stream_id = Some(id);
                self.state.transition(SessionState::AwaitingStreamAck);
            }
            ServerCommand::Error { transaction_id: tx, status } if tx == transaction_id => {
                let status = status.unwrap_or_default();
                return Err(Error::play_rejected(status.code, status.description));
            }
            ServerCommand::OnStatus { status } => self.on_play_status(connection, status)?,
            other => debug!("[{}] Ignoring {} while playing", connection.id(), other.name()),
        }
        Ok(())
    }

    fn on_play_status(&self, connection: &Connection, status: StatusInfo) -> Result<()> {
        if status.is_error()
            || status.code == status_codes::PLAY_STREAM_NOT_FOUND
            || status.code == status_codes::PLAY_FAILED
        {
            return Err(Error::play_rejected(status.code, status.description));
        }

        if status.code == status_codes::PLAY_START {
            if self.state.transition(SessionState::Streaming) {
                info!("[{}] Playing", connection.id());
            }
        } else {
            debug!("[{}] Play status {}", connection.id(), status.code);
        }
        Ok(())
    }
}
