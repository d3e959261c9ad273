// Integration tests for the RTMP client
//
// Each test drives a pusher, puller or bare connector against a scripted
// server on an in-memory pipe.

mod common;

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use common::*;
use rtmp::{
    Amf0Value, ConnectionInfo, ControlMessage, Error, MediaPump, MediaSender, MediaSink, Message,
    Result, RtmpData, RtmpPuller, RtmpPusher, SessionHooks, SessionState, StopSignal,
    UserControlEvent, MSG_TYPE_AUDIO, MSG_TYPE_DATA_AMF0, MSG_TYPE_USER_CONTROL, MSG_TYPE_VIDEO,
};

#[derive(Default)]
struct RecordingHooks {
    connected: StdMutex<Vec<String>>,
    stopped: StdMutex<Vec<Option<String>>>,
}

impl SessionHooks for RecordingHooks {
    fn on_connected(&self, info: &ConnectionInfo) {
        self.connected.lock().unwrap().push(info.app().to_string());
    }

    fn on_stop(&self, error: Option<&Error>) {
        self.stopped.lock().unwrap().push(error.map(|e| e.to_string()));
    }
}

/// Sends metadata, one audio and one video frame, then finishes
struct OneShotPump;

#[async_trait]
impl MediaPump for OneShotPump {
    async fn pump(&mut self, sender: MediaSender, _stop: StopSignal) -> Result<()> {
        let metadata = [("width".to_string(), Amf0Value::Number(1280.0))].into_iter().collect();
        sender.send_metadata(metadata).await?;
        sender.send_audio(0, vec![0xAF, 0x00, 0x12, 0x10]).await?;
        sender.send_video(40, vec![0x17, 0x00, 0x00, 0x00, 0x00]).await?;
        Ok(())
    }
}

/// Sends audio every few milliseconds until stopped
struct LoopingPump;

#[async_trait]
impl MediaPump for LoopingPump {
    async fn pump(&mut self, sender: MediaSender, mut stop: StopSignal) -> Result<()> {
        let mut timestamp = 0;
        loop {
            tokio::select! {
                _ = stop.stopped() => return Ok(()),
                _ = tokio::time::sleep(Duration::from_millis(5)) => {
                    sender.send_audio(timestamp, vec![0xAF, 0x01]).await?;
                    timestamp += 23;
                }
            }
        }
    }
}

struct ChannelSink {
    tx: mpsc::UnboundedSender<(u8, u32, Vec<u8>)>,
}

#[async_trait]
impl MediaSink for ChannelSink {
    async fn receive_audio(&mut self, message: Message) -> Result<()> {
        let _ = self.tx.send((MSG_TYPE_AUDIO, message.timestamp(), message.payload));
        Ok(())
    }

    async fn receive_video(&mut self, message: Message) -> Result<()> {
        let _ = self.tx.send((MSG_TYPE_VIDEO, message.timestamp(), message.payload));
        Ok(())
    }

    async fn receive_data(&mut self, message: Message) -> Result<()> {
        let _ = self.tx.send((MSG_TYPE_DATA_AMF0, message.timestamp(), message.payload));
        Ok(())
    }
}

#[tokio::test]
async fn test_connect_sends_expected_command() {
    let (connector, dialer, mut server) = connector_pair();

    let (connection, connect) = tokio::join!(connector.connect(TEST_URL), server.accept_connect());
    let connection = connection.unwrap();

    assert_eq!(connect.transaction_id, 1.0);
    assert_eq!(connect.command_object.get_str("app"), Some("live"));
    assert_eq!(connect.command_object.get_str("tcUrl"), Some("rtmp://media.example.com/live"));
    assert_eq!(connect.command_object.get_str("swfUrl"), Some(TEST_URL));
    assert_eq!(connect.command_object.get_str("type"), Some("nonprivate"));
    assert!(connect.command_object.get_str("flashVer").unwrap().starts_with("rtmp-relay-client/"));

    assert_eq!(dialer.dial_count(), 1);
    let endpoint = dialer.last_endpoint().await.unwrap();
    assert_eq!((endpoint.host.as_str(), endpoint.port, endpoint.tls), ("media.example.com", 1935, false));

    assert_eq!(connection.info().app(), "live");
    assert_eq!(connection.sender().chunk_size().await, 4096);
    assert_eq!(connection.read_chunk_size(), 128);
}

#[tokio::test]
async fn test_connect_rejection_closes_socket() {
    let (connector, _dialer, mut server) = connector_pair();

    let script = async {
        server.accept_handshake().await;
        let (_, connect) = server.read_command().await;
        server.send_connect_result(connect.transaction_id, "NetConnection.Connect.Rejected").await;
        server.expect_eof().await;
    };

    let (result, _) = tokio::join!(connector.connect(TEST_URL), script);
    match result {
        Err(Error::ConnectRejected { code, description }) => {
            assert_eq!(code, "NetConnection.Connect.Rejected");
            assert_eq!(description, "scripted");
        }
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("connect should have been rejected"),
    }
}

#[tokio::test]
async fn test_connect_rejected_when_first_command_is_not_result() {
    let (connector, _dialer, mut server) = connector_pair();

    let script = async {
        server.accept_handshake().await;
        server.read_command().await;
        server.send_command(0, &rtmp::RtmpCommand::new("onBWDone", 0.0)).await;
        server.expect_eof().await;
    };

    let (result, _) = tokio::join!(connector.connect(TEST_URL), script);
    let err = result.err().unwrap();
    assert_eq!(err.peer_code(), Some("onBWDone"));
}

#[tokio::test]
async fn test_malformed_url_never_dials() {
    let (connector, dialer, _server) = connector_pair();

    for url in ["rtmp://media.example.com/live", "rtmp://media.example.com/live/", "http://x/a/b"] {
        let err = connector.connect(url).await.err().unwrap();
        assert!(matches!(err, Error::InvalidUrl(_)), "{}: {}", url, err);
    }
    assert_eq!(dialer.dial_count(), 0);
}

#[tokio::test]
async fn test_bad_server_version_fails_handshake() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (client, mut server) = tokio::io::duplex(64 * 1024);
    let connector = rtmp::SessionConnector::with_dialer(test_config(), Arc::new(SingleStream::new(client)));

    let script = async {
        let mut c0c1 = vec![0u8; 1537];
        server.read_exact(&mut c0c1).await.unwrap();
        server.write_all(&vec![6u8; 3073]).await.unwrap();
    };

    let (result, _) = tokio::join!(connector.connect(TEST_URL), script);
    assert!(matches!(result.err().unwrap(), Error::Handshake(_)));
}

struct SingleStream(tokio::sync::Mutex<Option<tokio::io::DuplexStream>>);

impl SingleStream {
    fn new(stream: tokio::io::DuplexStream) -> Self {
        SingleStream(tokio::sync::Mutex::new(Some(stream)))
    }
}

#[async_trait]
impl rtmp::Dialer for SingleStream {
    async fn dial(&self, _endpoint: &rtmp::Endpoint) -> Result<rtmp::BoxedStream> {
        let stream = self.0.lock().await.take().ok_or_else(|| Error::connect("already dialed"))?;
        Ok(Box::new(stream))
    }
}

#[tokio::test]
async fn test_connection_answers_ping_and_follows_peer_chunk_size() {
    let (connector, _dialer, mut server) = connector_pair();

    let (connection, _) = tokio::join!(connector.connect(TEST_URL), server.accept_connect());
    let mut connection = connection.unwrap();

    server.set_chunk_size(300).await;
    server
        .send(&ControlMessage::UserControl(UserControlEvent::PingRequest(42)).into_message())
        .await;
    server.send(&Message::video(0, 1, vec![0x27; 1000])).await;

    let message = connection.recv_message().await.unwrap();
    assert_eq!(message.message_type(), MSG_TYPE_VIDEO);
    assert_eq!(message.len(), 1000);
    assert_eq!(connection.read_chunk_size(), 300);
    assert_eq!(connection.sender().chunk_size().await, 4096);

    loop {
        let message = server.read_message().await;
        if message.message_type() == MSG_TYPE_USER_CONTROL {
            assert_eq!(
                ControlMessage::parse(&message).unwrap(),
                Some(ControlMessage::UserControl(UserControlEvent::PingResponse(42)))
            );
            break;
        }
    }
}

#[tokio::test]
async fn test_push_end_to_end() {
    let (connector, _dialer, mut server) = connector_pair();
    let hooks = Arc::new(RecordingHooks::default());
    let mut pusher = RtmpPusher::with_connector(TEST_URL, connector).with_hooks(hooks.clone());

    let client = async {
        pusher.connect().await?;
        pusher.push(OneShotPump).await
    };

    let script = async {
        server.accept_connect().await;

        let (stream, create) = server.read_command().await;
        assert_eq!((stream, create.name.as_str(), create.transaction_id), (0, "createStream", 2.0));

        // Unrelated results are ignored
        server.send_stream_created(7.0, 9).await;
        server.send_stream_created(2.0, 1).await;

        let (stream, publish) = server.read_command().await;
        assert_eq!(stream, 1);
        assert_eq!(publish.name, "publish");
        assert_eq!(publish.transaction_id, 0.0);
        assert_eq!(publish.arguments[0].as_str(), Some("room/cam1?token=abc"));
        assert_eq!(publish.arguments[1].as_str(), Some("live"));

        server.send_status(1, "status", "NetStream.Publish.Start").await;

        let metadata = server.read_media().await;
        assert_eq!(metadata.message_type(), MSG_TYPE_DATA_AMF0);
        assert_eq!(metadata.message_stream_id(), 1);
        let data = RtmpData::decode(&metadata.payload).unwrap();
        assert_eq!(data.handler, "@setDataFrame");
        assert_eq!(data.metadata().unwrap().get("width"), Some(&Amf0Value::Number(1280.0)));

        let audio = server.read_media().await;
        assert_eq!((audio.message_type(), audio.message_stream_id(), audio.timestamp()), (MSG_TYPE_AUDIO, 1, 0));

        let video = server.read_media().await;
        assert_eq!((video.message_type(), video.message_stream_id(), video.timestamp()), (MSG_TYPE_VIDEO, 1, 40));

        server.expect_eof().await;
    };

    let (result, _) = tokio::join!(client, script);
    result.unwrap();

    assert_eq!(pusher.state(), SessionState::Closed);
    assert_eq!(*hooks.connected.lock().unwrap(), vec!["live".to_string()]);
    assert_eq!(*hooks.stopped.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn test_stale_result_does_not_advance_push() {
    let (connector, _dialer, mut server) = connector_pair();
    let mut pusher = RtmpPusher::with_connector(TEST_URL, connector);
    let states = pusher.subscribe_state();

    let client = async {
        pusher.connect().await?;
        pusher.push(OneShotPump).await
    };

    let script = async {
        server.accept_connect().await;

        let (_, create) = server.read_command().await;
        assert_eq!(create.transaction_id, 2.0);

        server.send_unknown_command(0).await;
        server.send_stream_created(9.0, 9).await;
        server.send_stream_created(2.0, 1).await;

        let (stream, publish) = server.read_command().await;
        assert_eq!(stream, 1);
        assert_eq!(publish.name, "publish");

        server.send_unknown_command(1).await;
        server.send_status(1, "status", "NetStream.Publish.Start").await;

        let metadata = server.read_media().await;
        assert_eq!(metadata.message_stream_id(), 1);
        server.expect_eof().await;
    };

    let (result, _) = tokio::join!(client, script);
    result.unwrap();
    assert_eq!(*states.borrow(), SessionState::Closed);
}

#[tokio::test]
async fn test_publish_rejected() {
    let (connector, _dialer, mut server) = connector_pair();
    let hooks = Arc::new(RecordingHooks::default());
    let mut pusher = RtmpPusher::with_connector(TEST_URL, connector).with_hooks(hooks.clone());

    let client = async {
        pusher.connect().await?;
        pusher.push(OneShotPump).await
    };

    let script = async {
        server.accept_connect().await;
        let (_, create) = server.read_command().await;
        server.send_stream_created(create.transaction_id, 1).await;
        server.read_command().await;
        server.send_status(1, "error", "NetStream.Publish.BadName").await;
        server.expect_eof().await;
    };

    let (result, _) = tokio::join!(client, script);
    let err = result.unwrap_err();
    assert!(matches!(err, Error::PublishRejected { .. }));
    assert_eq!(err.peer_code(), Some("NetStream.Publish.BadName"));

    let stopped = hooks.stopped.lock().unwrap();
    assert_eq!(stopped.len(), 1);
    assert!(stopped[0].as_ref().unwrap().contains("BadName"));
}

#[tokio::test]
async fn test_create_stream_error_rejects_publish() {
    let (connector, _dialer, mut server) = connector_pair();
    let mut pusher = RtmpPusher::with_connector(TEST_URL, connector);

    let client = async {
        pusher.connect().await?;
        pusher.push(OneShotPump).await
    };

    let script = async {
        server.accept_connect().await;
        let (_, create) = server.read_command().await;
        let mut error = rtmp::RtmpCommand::new("_error", create.transaction_id);
        error.arguments.push(
            rtmp::StatusInfo::new("error", "NetConnection.Call.Failed", "no streams left").to_value(),
        );
        server.send_command(0, &error).await;
        server.expect_eof().await;
    };

    let (result, _) = tokio::join!(client, script);
    assert_eq!(result.unwrap_err().peer_code(), Some("NetConnection.Call.Failed"));
}

#[tokio::test]
async fn test_stop_handle_ends_push() {
    let (connector, _dialer, mut server) = connector_pair();
    let mut pusher = RtmpPusher::with_connector(TEST_URL, connector);
    let stop = pusher.stop_handle();
    let mut states = pusher.subscribe_state();

    let client = async {
        pusher.connect().await?;
        pusher.push(LoopingPump).await
    };

    let script = async {
        server.accept_connect().await;
        let (_, create) = server.read_command().await;
        server.send_stream_created(create.transaction_id, 1).await;
        server.read_command().await;
        server.send_status(1, "status", "NetStream.Publish.Start").await;

        for _ in 0..3 {
            assert_eq!(server.read_media().await.message_type(), MSG_TYPE_AUDIO);
        }
        assert_eq!(*states.borrow_and_update(), SessionState::Streaming);

        stop.stop();
        server.expect_eof().await;
    };

    let (result, _) = tokio::join!(client, script);
    result.unwrap();
    assert_eq!(pusher.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_pull_end_to_end() {
    let (connector, _dialer, mut server) = connector_pair();
    let mut puller = RtmpPuller::with_connector(TEST_URL, connector);
    let stop = puller.stop_handle();
    let states = puller.subscribe_state();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut sink = ChannelSink { tx };

    let client = async {
        puller.connect().await?;
        puller.pull(&mut sink).await
    };

    let script = async {
        server.accept_connect().await;

        let (_, create) = server.read_command().await;
        assert_eq!(create.transaction_id, 2.0);
        server.send_stream_created(2.0, 1).await;

        let (stream, play) = server.read_command().await;
        assert_eq!(stream, 1);
        assert_eq!(play.name, "play");
        assert_eq!(play.arguments[0].as_str(), Some("cam1?token=abc"));
        assert_eq!(play.arguments[1].as_number(), Some(-2.0));

        loop {
            let message = server.read_message().await;
            if let Ok(Some(ControlMessage::UserControl(UserControlEvent::SetBufferLength { stream_id, buffer_ms }))) =
                ControlMessage::parse(&message)
            {
                assert_eq!((stream_id, buffer_ms), (1, 1000));
                break;
            }
        }

        server.send_status(1, "status", "NetStream.Play.Reset").await;
        server.send_status(1, "status", "NetStream.Play.Start").await;

        let mut metadata = rtmp::Amf0Object::new();
        metadata.insert("duration".to_string(), Amf0Value::Number(0.0));
        let data = RtmpData::set_data_frame(metadata).encode().unwrap();
        server.send(&Message::data(0, 1, data)).await;
        server.send(&create_test_video_message(0, true)).await;
        server.send(&create_test_audio_message(0)).await;
        server.send(&create_test_video_message(40, false)).await;

        let mut received = Vec::new();
        for _ in 0..4 {
            let (kind, timestamp, _) = rx.recv().await.unwrap();
            received.push((kind, timestamp));
        }
        assert_eq!(
            received,
            vec![
                (MSG_TYPE_DATA_AMF0, 0),
                (MSG_TYPE_VIDEO, 0),
                (MSG_TYPE_AUDIO, 0),
                (MSG_TYPE_VIDEO, 40),
            ]
        );
        assert_eq!(*states.borrow(), SessionState::Streaming);

        stop.stop();
        server.expect_eof().await;
    };

    let (result, _) = tokio::join!(client, script);
    result.unwrap();
    assert_eq!(puller.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_stale_result_does_not_advance_pull() {
    let (connector, _dialer, mut server) = connector_pair();
    let mut puller = RtmpPuller::with_connector(TEST_URL, connector);
    let stop = puller.stop_handle();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut sink = ChannelSink { tx };

    let client = async {
        puller.connect().await?;
        puller.pull(&mut sink).await
    };

    let script = async {
        server.accept_connect().await;

        let (_, create) = server.read_command().await;
        assert_eq!(create.transaction_id, 2.0);

        server.send_unknown_command(0).await;
        server.send_stream_created(9.0, 9).await;
        server.send_stream_created(2.0, 3).await;

        let (stream, play) = server.read_command().await;
        assert_eq!(stream, 3);
        assert_eq!(play.name, "play");

        server.send_status(3, "status", "NetStream.Play.Start").await;
        server.send(&Message::audio(20, 3, vec![0xAF, 0x01])).await;
        let (kind, timestamp, _) = rx.recv().await.unwrap();
        assert_eq!((kind, timestamp), (MSG_TYPE_AUDIO, 20));

        stop.stop();
        server.expect_eof().await;
    };

    let (result, _) = tokio::join!(client, script);
    result.unwrap();
}

#[tokio::test]
async fn test_play_stream_not_found() {
    let (connector, _dialer, mut server) = connector_pair();
    let mut puller = RtmpPuller::with_connector(TEST_URL, connector);
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut sink = ChannelSink { tx };

    let client = async {
        puller.connect().await?;
        puller.pull(&mut sink).await
    };

    let script = async {
        server.accept_connect().await;
        let (_, create) = server.read_command().await;
        server.send_stream_created(create.transaction_id, 1).await;
        server.read_command().await;
        server.send_status(1, "error", "NetStream.Play.StreamNotFound").await;
        server.expect_eof().await;
    };

    let (result, _) = tokio::join!(client, script);
    let err = result.unwrap_err();
    assert!(matches!(err, Error::PlayRejected { .. }));
    assert_eq!(err.peer_code(), Some("NetStream.Play.StreamNotFound"));
}

#[tokio::test]
async fn test_play_failed_code_rejects_regardless_of_level() {
    let (connector, _dialer, mut server) = connector_pair();
    let mut puller = RtmpPuller::with_connector(TEST_URL, connector);
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut sink = ChannelSink { tx };

    let client = async {
        puller.connect().await?;
        puller.pull(&mut sink).await
    };

    let script = async {
        server.accept_connect().await;
        let (_, create) = server.read_command().await;
        server.send_stream_created(create.transaction_id, 1).await;
        server.read_command().await;
        server.send_status(1, "status", "NetStream.Play.Failed").await;
        server.expect_eof().await;
    };

    let (result, _) = tokio::join!(client, script);
    assert_eq!(result.unwrap_err().peer_code(), Some("NetStream.Play.Failed"));
}

#[tokio::test]
async fn test_push_before_connect_is_invalid() {
    let (connector, dialer, _server) = connector_pair();
    let mut pusher = RtmpPusher::with_connector(TEST_URL, connector);

    assert!(matches!(pusher.push(OneShotPump).await, Err(Error::InvalidState(_))));
    assert_eq!(dialer.dial_count(), 0);
}
