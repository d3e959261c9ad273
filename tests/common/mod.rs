// Common test utilities and helper functions
//
// A scripted RTMP server over an in-memory duplex pipe, plus a dialer that
// hands that pipe to the client under test.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::Mutex;

use rtmp::{
    Amf0Encoder, Amf0Value, BoxedStream, ChunkDecoder, ChunkEncoder, ClientConfig, ControlMessage, Dialer,
    Endpoint, Error, Message, Result, RtmpCommand, SessionConnector, StatusInfo, HANDSHAKE_SIZE,
    MSG_TYPE_COMMAND_AMF0, MSG_TYPE_SET_CHUNK_SIZE, RTMP_VERSION,
};

pub const TEST_URL: &str = "rtmp://media.example.com/live/room/cam1?token=abc";

/// Dialer handing out one pre-made in-memory stream and counting dials
pub struct MockDialer {
    stream: Mutex<Option<DuplexStream>>,
    dials: AtomicUsize,
    last_endpoint: Mutex<Option<Endpoint>>,
}

impl MockDialer {
    pub fn dial_count(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    pub async fn last_endpoint(&self) -> Option<Endpoint> {
        self.last_endpoint.lock().await.clone()
    }
}

#[async_trait]
impl Dialer for MockDialer {
    async fn dial(&self, endpoint: &Endpoint) -> Result<BoxedStream> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        *self.last_endpoint.lock().await = Some(endpoint.clone());
        match self.stream.lock().await.take() {
            Some(stream) => Ok(Box::new(stream)),
            None => Err(Error::connect("No stream left to dial")),
        }
    }
}

/// Short timeouts so a broken script fails fast
pub fn test_config() -> ClientConfig {
    ClientConfig::builder()
        .connect_timeout(Duration::from_secs(2))
        .read_timeout(Duration::from_secs(2))
        .write_timeout(Duration::from_secs(2))
        .chunk_size(4096)
        .build()
        .expect("valid test config")
}

/// A connector wired to a scripted server
pub fn connector_pair() -> (SessionConnector, Arc<MockDialer>, ScriptedServer) {
    let (client, server) = duplex(1024 * 1024);
    let dialer = Arc::new(MockDialer {
        stream: Mutex::new(Some(client)),
        dials: AtomicUsize::new(0),
        last_endpoint: Mutex::new(None),
    });
    let connector = SessionConnector::with_dialer(test_config(), dialer.clone());
    (connector, dialer, ScriptedServer::new(server))
}

/// Server side of the pipe, driven step by step by a test
pub struct ScriptedServer {
    stream: DuplexStream,
    decoder: ChunkDecoder,
    encoder: ChunkEncoder,
}

impl ScriptedServer {
    pub fn new(stream: DuplexStream) -> Self {
        ScriptedServer {
            stream,
            decoder: ChunkDecoder::new(),
            encoder: ChunkEncoder::new(),
        }
    }

    /// Simple handshake: S1 is fixed filler, S2 echoes C1
    pub async fn accept_handshake(&mut self) {
        let mut c0c1 = vec![0u8; 1 + HANDSHAKE_SIZE];
        self.stream.read_exact(&mut c0c1).await.expect("read C0+C1");
        assert_eq!(c0c1[0], RTMP_VERSION);

        let mut reply = vec![RTMP_VERSION];
        reply.extend_from_slice(&vec![0x11; HANDSHAKE_SIZE]);
        reply.extend_from_slice(&c0c1[1..]);
        self.stream.write_all(&reply).await.expect("write S0+S1+S2");

        let mut c2 = vec![0u8; HANDSHAKE_SIZE];
        self.stream.read_exact(&mut c2).await.expect("read C2");
    }

    /// Next message from the client; Set Chunk Size is applied and returned too
    pub async fn read_message(&mut self) -> Message {
        let message = self.decoder.read_message(&mut self.stream).await.expect("read message");
        if message.message_type() == MSG_TYPE_SET_CHUNK_SIZE {
            if let Ok(Some(ControlMessage::SetChunkSize(size))) = ControlMessage::parse(&message) {
                self.decoder.set_chunk_size(size as usize).expect("chunk size");
            }
        }
        message
    }

    /// Next AMF0 command from the client with its message stream id
    pub async fn read_command(&mut self) -> (u32, RtmpCommand) {
        loop {
            let message = self.read_message().await;
            if message.message_type() == MSG_TYPE_COMMAND_AMF0 {
                let command = RtmpCommand::decode(&message.payload).expect("decode command");
                return (message.message_stream_id(), command);
            }
        }
    }

    /// Next message that is not a command or protocol control message
    pub async fn read_media(&mut self) -> Message {
        loop {
            let message = self.read_message().await;
            if !message.is_command() && !message.is_control() {
                return message;
            }
        }
    }

    pub async fn send(&mut self, message: &Message) {
        self.encoder
            .write_message(message, &mut self.stream)
            .await
            .expect("write message");
    }

    pub async fn send_command(&mut self, message_stream_id: u32, command: &RtmpCommand) {
        let payload = command.encode().expect("encode command");
        self.send(&Message::command(message_stream_id, payload)).await;
    }

    pub async fn set_chunk_size(&mut self, size: u32) {
        self.send(&ControlMessage::SetChunkSize(size).into_message()).await;
        self.encoder.set_chunk_size(size as usize).expect("chunk size");
    }

    pub async fn send_connect_result(&mut self, transaction_id: f64, code: &str) {
        let level = if code.ends_with("Success") { "status" } else { "error" };
        let command = result_command(
            "_result",
            transaction_id,
            Amf0Value::object([("fmsVer", Amf0Value::from("FMS/3,5,7,7009"))]),
            StatusInfo::new(level, code, "scripted"),
        );
        self.send_command(0, &command).await;
    }

    pub async fn send_stream_created(&mut self, transaction_id: f64, stream_id: u32) {
        let mut command = RtmpCommand::new("_result", transaction_id);
        command.arguments.push(Amf0Value::Number(stream_id as f64));
        self.send_command(0, &command).await;
    }

    pub async fn send_status(&mut self, stream_id: u32, level: &str, code: &str) {
        let command = result_command("onStatus", 0.0, Amf0Value::Null, StatusInfo::new(level, code, "scripted"));
        self.send_command(stream_id, &command).await;
    }

    /// A command the client has never heard of, without a transaction id
    pub async fn send_unknown_command(&mut self, message_stream_id: u32) {
        let payload = Amf0Encoder::encode_all(&[
            Amf0Value::from("onFutureThing"),
            Amf0Value::from("x"),
        ])
        .expect("encode command");
        self.send(&Message::command(message_stream_id, payload)).await;
    }

    /// Handshake, read `connect`, accept it. Returns the connect command.
    pub async fn accept_connect(&mut self) -> RtmpCommand {
        self.accept_handshake().await;
        let (_, connect) = self.read_command().await;
        assert_eq!(connect.name, "connect");
        self.send(&ControlMessage::WindowAckSize(2_500_000).into_message()).await;
        self.send_connect_result(connect.transaction_id, "NetConnection.Connect.Success").await;
        connect
    }

    /// Wait for the client to close its side
    pub async fn expect_eof(&mut self) {
        let mut buf = [0u8; 1024];
        loop {
            match tokio::time::timeout(Duration::from_secs(2), self.stream.read(&mut buf)).await {
                Ok(Ok(0)) => return,
                Ok(Ok(_)) => continue,
                Ok(Err(_)) => return,
                Err(_) => panic!("client did not close the connection"),
            }
        }
    }
}

fn result_command(name: &str, transaction_id: f64, properties: Amf0Value, status: StatusInfo) -> RtmpCommand {
    let mut command = RtmpCommand::new(name, transaction_id);
    command.command_object = properties;
    command.arguments.push(status.to_value());
    command
}

/// Create a test video message with specified timestamp
pub fn create_test_video_message(timestamp: u32, is_keyframe: bool) -> Message {
    // AVC keyframe / inter frame, NALU packet
    let mut payload = vec![if is_keyframe { 0x17 } else { 0x27 }];
    payload.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]);
    Message::video(timestamp, 1, payload)
}

/// Create a test audio message with specified timestamp
pub fn create_test_audio_message(timestamp: u32) -> Message {
    // AAC, 44.1kHz, 16-bit, stereo, raw
    Message::audio(timestamp, 1, vec![0xAF, 0x01])
}
