use std::sync::Arc;
use std::time::Duration;
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use crate::{ClientConfig, Connection, Error, Message, Result, RtmpCommand, ServerCommand};
use crate::client::connector::SessionConnector;
use crate::client::media::{MediaPump, MediaSender, NoHooks, SessionHooks, StopHandle};
use crate::client::state::{SessionState, StateCell};
use crate::protocol::constants::status_codes;

/// How long a stopped pump gets to return before it is aborted
const PUMP_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Publishes a local stream to a remote RTMP server.
///
/// `connect` establishes the connection, `push` creates the stream,
/// publishes it and runs the media pump until it finishes, fails, or the
/// [`StopHandle`] fires.
pub struct RtmpPusher {
    url: String,
    connector: SessionConnector,
    hooks: Arc<dyn SessionHooks>,
    state: StateCell,
    stop: StopHandle,
    connection: Option<Connection>,
}

impl RtmpPusher {
    pub fn new(url: impl Into<String>, config: ClientConfig) -> Self {
        RtmpPusher::with_connector(url, SessionConnector::new(config))
    }

    pub fn with_connector(url: impl Into<String>, connector: SessionConnector) -> Self {
        RtmpPusher {
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
                info!("[{}] Pusher connected to {}", connection.id(), self.url);
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

    /// Create and publish the stream, then run `pump` until the session ends.
    ///
    /// Always leaves the session closed and reports to `on_stop`.
    pub async fn push<P: MediaPump>(&mut self, pump: P) -> Result<()> {
        let mut connection = self.connection.take().ok_or_else(|| {
            Error::invalid_state(format!("Cannot push in state {:?}", self.state.get()))
        })?;

        let result = self.run(&mut connection, pump).await;

        self.stop.stop();
        let _ = connection.close().await;
        self.state.transition(SessionState::Closed);
        match &result {
            Ok(()) => info!("[{}] Push finished", connection.id()),
            Err(e) => warn!("[{}] Push ended: {}", connection.id(), e),
        }
        self.hooks.on_stop(result.as_ref().err());
        result
    }

    async fn run<P: MediaPump>(&self, connection: &mut Connection, pump: P) -> Result<()> {
        let stream_id = match self.publish(connection).await? {
            Some(stream_id) => stream_id,
            None => return Ok(()),
        };

        // The server is silent while we publish
        connection.set_read_timeout(None);

        let media = MediaSender::new(connection.sender(), stream_id);
        let signal = self.stop.signal();
        let mut pump = pump;
        let mut pump_task: JoinHandle<Result<()>> =
            tokio::spawn(async move { pump.pump(media, signal).await });
        self.state.transition(SessionState::Streaming);
        info!("[{}] Publishing on stream {}", connection.id(), stream_id);

        let mut stop = self.stop.signal();
        let outcome = loop {
            tokio::select! {
                _ = stop.stopped() => break None,
                joined = &mut pump_task => {
                    break Some(match joined {
                        Ok(result) => result,
                        Err(e) => Err(Error::protocol(format!("Media pump task failed: {}", e))),
                    });
                }
                message = connection.recv_message() => {
                    if let Err(e) = Self::on_streaming_message(connection, message) {
                        break Some(Err(e));
                    }
                }
            }
        };

        match outcome {
            Some(result) => {
                if !pump_task.is_finished() {
                    self.stop.stop();
                    Self::wait_for_pump(pump_task).await;
                }
                result
            }
            None => {
                Self::wait_for_pump(pump_task).await;
                Ok(())
            }
        }
    }

    /// `createStream` then `publish`; `None` when stopped before the server accepted
    async fn publish(&self, connection: &mut Connection) -> Result<Option<u32>> {
        self.state.transition(SessionState::AwaitingCreateStream);
        let transaction_id = connection.next_transaction_id();
        connection.send_command(0, &RtmpCommand::create_stream(transaction_id)).await?;

        let mut stream_id = None;
        let mut stop = self.stop.signal();
        loop {
            let command = tokio::select! {
                _ = stop.stopped() => return Ok(None),
                command = connection.recv_command() => command?,
            };

            match (stream_id, command) {
                (None, ServerCommand::StreamCreated { transaction_id: tx, stream_id: id })
                    if tx == transaction_id =>
                {
                    let path = connection.url().publish_path();
                    debug!("[{}] Stream {} created, publishing '{}'", connection.id(), id, path);
                    connection.send_command(id, &RtmpCommand::publish(0.0, &path, "live")).await?;
                    stream_id = Some(id);
                    self.state.transition(SessionState::AwaitingStreamAck);
                }
                (None, ServerCommand::Error { transaction_id: tx, status }) if tx == transaction_id => {
                    let status = status.unwrap_or_default();
                    return Err(Error::publish_rejected(status.code, status.description));
                }
                (Some(id), ServerCommand::OnStatus { status })
                | (Some(id), ServerCommand::Result { status: Some(status), .. }) => {
                    if status.code == status_codes::PUBLISH_START {
                        return Ok(Some(id));
                    }
                    return Err(Error::publish_rejected(status.code, status.description));
                }
                (Some(_), ServerCommand::Error { status, .. }) => {
                    let status = status.unwrap_or_default();
                    return Err(Error::publish_rejected(status.code, status.description));
                }
                (_, other) => {
                    debug!("[{}] Ignoring {} while publishing", connection.id(), other.name());
                }
            }
        }
    }

    fn on_streaming_message(connection: &Connection, message: Result<Message>) -> Result<()> {
        let message = message?;
        if !message.is_command() {
            debug!("[{}] Ignoring message type {} while publishing", connection.id(), message.message_type());
            return Ok(());
        }
        match ServerCommand::decode(&message.payload)? {
            ServerCommand::OnStatus { status } if status.is_error() => {
                Err(Error::publish_rejected(status.code, status.description))
            }
            other => {
                debug!("[{}] Server sent {} while publishing", connection.id(), other.name());
                Ok(())
            }
        }
    }

    async fn wait_for_pump(mut pump_task: JoinHandle<Result<()>>) {
        match tokio::time::timeout(PUMP_SHUTDOWN_GRACE, &mut pump_task).await {
            Ok(Ok(Err(e))) => debug!("Media pump returned after stop: {}", e),
            Ok(_) => {}
            Err(_) => pump_task.abort(),
        }
    }
}
