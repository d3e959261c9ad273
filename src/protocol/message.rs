use crate::protocol::constants::*;

/// A reassembled RTMP message.
///
/// The chunk stream id is transport bookkeeping: senders pick the channel,
/// receivers learn which channel the peer used.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub header: MessageHeader,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub timestamp: u32,
    pub message_type: u8,
    pub message_stream_id: u32,
    pub chunk_stream_id: u32,
}

impl MessageHeader {
    pub fn new(timestamp: u32, message_type: u8, message_stream_id: u32, chunk_stream_id: u32) -> Self {
        MessageHeader {
            timestamp,
            message_type,
            message_stream_id,
            chunk_stream_id,
        }
    }
}

impl Message {
    pub fn new(header: MessageHeader, payload: Vec<u8>) -> Self {
        Message { header, payload }
    }

    /// Protocol control message (chunk stream 2, message stream 0)
    pub fn control(message_type: u8, payload: Vec<u8>) -> Self {
        Message::new(MessageHeader::new(0, message_type, 0, CHUNK_STREAM_PROTOCOL), payload)
    }

    /// AMF0 command on the command channel
    pub fn command(message_stream_id: u32, payload: Vec<u8>) -> Self {
        Message::new(
            MessageHeader::new(0, MSG_TYPE_COMMAND_AMF0, message_stream_id, CHUNK_STREAM_COMMAND),
            payload,
        )
    }

    pub fn audio(timestamp: u32, message_stream_id: u32, payload: Vec<u8>) -> Self {
        Message::new(
            MessageHeader::new(timestamp, MSG_TYPE_AUDIO, message_stream_id, CHUNK_STREAM_AUDIO),
            payload,
        )
    }

    pub fn video(timestamp: u32, message_stream_id: u32, payload: Vec<u8>) -> Self {
        Message::new(
            MessageHeader::new(timestamp, MSG_TYPE_VIDEO, message_stream_id, CHUNK_STREAM_VIDEO),
            payload,
        )
    }

    pub fn data(timestamp: u32, message_stream_id: u32, payload: Vec<u8>) -> Self {
        Message::new(
            MessageHeader::new(timestamp, MSG_TYPE_DATA_AMF0, message_stream_id, CHUNK_STREAM_DATA),
            payload,
        )
    }

    pub fn message_type(&self) -> u8 {
        self.header.message_type
    }

    pub fn message_stream_id(&self) -> u32 {
        self.header.message_stream_id
    }

    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn is_audio(&self) -> bool {
        self.header.message_type == MSG_TYPE_AUDIO
    }

    pub fn is_video(&self) -> bool {
        self.header.message_type == MSG_TYPE_VIDEO
    }

    pub fn is_command(&self) -> bool {
        self.header.message_type == MSG_TYPE_COMMAND_AMF0
    }

    pub fn is_control(&self) -> bool {
        matches!(self.header.message_type,
            MSG_TYPE_SET_CHUNK_SIZE |
            MSG_TYPE_ABORT |
            MSG_TYPE_ACK |
            MSG_TYPE_USER_CONTROL |
            MSG_TYPE_WINDOW_ACK |
            MSG_TYPE_SET_PEER_BW)
    }
}
