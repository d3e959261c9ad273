use crate::{ByteReader, BytesWriteExt, Error, Result};
use crate::protocol::constants::*;
use crate::protocol::message::Message;

/// Protocol control and user control messages (message types 1-6)
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    SetChunkSize(u32),
    Abort { chunk_stream_id: u32 },
    Acknowledgement { sequence_number: u32 },
    WindowAckSize(u32),
    SetPeerBandwidth { size: u32, limit_type: u8 },
    UserControl(UserControlEvent),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserControlEvent {
    StreamBegin(u32),
    StreamEof(u32),
    SetBufferLength { stream_id: u32, buffer_ms: u32 },
    PingRequest(u32),
    PingResponse(u32),
    Other { event_type: u16, data: Vec<u8> },
}

impl ControlMessage {
    /// Parse a control message; `None` when the type is not a control type
    pub fn parse(message: &Message) -> Result<Option<Self>> {
        let mut reader = ByteReader::new(&message.payload);
        let parsed = match message.message_type() {
            MSG_TYPE_SET_CHUNK_SIZE => ControlMessage::SetChunkSize(reader.read_u32_be()?),
            MSG_TYPE_ABORT => ControlMessage::Abort { chunk_stream_id: reader.read_u32_be()? },
            MSG_TYPE_ACK => ControlMessage::Acknowledgement { sequence_number: reader.read_u32_be()? },
            MSG_TYPE_WINDOW_ACK => ControlMessage::WindowAckSize(reader.read_u32_be()?),
            MSG_TYPE_SET_PEER_BW => ControlMessage::SetPeerBandwidth {
                size: reader.read_u32_be()?,
                limit_type: reader.read_u8()?,
            },
            MSG_TYPE_USER_CONTROL => ControlMessage::UserControl(parse_user_control(&mut reader)?),
            _ => return Ok(None),
        };
        Ok(Some(parsed))
    }

    pub fn into_message(self) -> Message {
        let mut payload = Vec::with_capacity(10);
        let message_type = match self {
            ControlMessage::SetChunkSize(size) => {
                payload.put_u32_be(size & 0x7FFF_FFFF);
                MSG_TYPE_SET_CHUNK_SIZE
            }
            ControlMessage::Abort { chunk_stream_id } => {
                payload.put_u32_be(chunk_stream_id);
                MSG_TYPE_ABORT
            }
            ControlMessage::Acknowledgement { sequence_number } => {
                payload.put_u32_be(sequence_number);
                MSG_TYPE_ACK
            }
            ControlMessage::WindowAckSize(size) => {
                payload.put_u32_be(size);
                MSG_TYPE_WINDOW_ACK
            }
            ControlMessage::SetPeerBandwidth { size, limit_type } => {
                payload.put_u32_be(size);
                payload.put_u8(limit_type);
                MSG_TYPE_SET_PEER_BW
            }
            ControlMessage::UserControl(event) => {
                write_user_control(&mut payload, event);
                MSG_TYPE_USER_CONTROL
            }
        };
        Message::control(message_type, payload)
    }
}

fn parse_user_control(reader: &mut ByteReader<'_>) -> Result<UserControlEvent> {
    let event_type = reader.read_u16_be()?;
    Ok(match event_type {
        USER_CONTROL_STREAM_BEGIN => UserControlEvent::StreamBegin(reader.read_u32_be()?),
        USER_CONTROL_STREAM_EOF => UserControlEvent::StreamEof(reader.read_u32_be()?),
        USER_CONTROL_SET_BUFFER_LENGTH => UserControlEvent::SetBufferLength {
            stream_id: reader.read_u32_be()?,
            buffer_ms: reader.read_u32_be()?,
        },
        USER_CONTROL_PING_REQUEST => UserControlEvent::PingRequest(reader.read_u32_be()?),
        USER_CONTROL_PING_RESPONSE => UserControlEvent::PingResponse(reader.read_u32_be()?),
        _ => UserControlEvent::Other {
            event_type,
            data: reader.read_slice(reader.remaining())?.to_vec(),
        },
    })
}

fn write_user_control(payload: &mut Vec<u8>, event: UserControlEvent) {
    match event {
        UserControlEvent::StreamBegin(id) => {
            payload.put_u16_be(USER_CONTROL_STREAM_BEGIN);
            payload.put_u32_be(id);
        }
        UserControlEvent::StreamEof(id) => {
            payload.put_u16_be(USER_CONTROL_STREAM_EOF);
            payload.put_u32_be(id);
        }
        UserControlEvent::SetBufferLength { stream_id, buffer_ms } => {
            payload.put_u16_be(USER_CONTROL_SET_BUFFER_LENGTH);
            payload.put_u32_be(stream_id);
            payload.put_u32_be(buffer_ms);
        }
        UserControlEvent::PingRequest(ts) => {
            payload.put_u16_be(USER_CONTROL_PING_REQUEST);
            payload.put_u32_be(ts);
        }
        UserControlEvent::PingResponse(ts) => {
            payload.put_u16_be(USER_CONTROL_PING_RESPONSE);
            payload.put_u32_be(ts);
        }
        UserControlEvent::Other { event_type, data } => {
            payload.put_u16_be(event_type);
            payload.extend_from_slice(&data);
        }
    }
}

/// Validate a chunk size announced by the peer
pub fn validate_peer_chunk_size(size: u32) -> Result<u32> {
    if size == 0 || size & 0x8000_0000 != 0 {
        return Err(Error::chunk_format(format!("Invalid chunk size announced by peer: {}", size)));
    }
    Ok(size)
}
