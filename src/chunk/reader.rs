use crate::{Error, Result, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_MESSAGE_SIZE, EXTENDED_TIMESTAMP_MARKER};
use crate::protocol::{Message, MessageHeader};
use crate::chunk::stream::ChunkStreamState;
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reassembles RTMP messages from the inbound chunk stream.
///
/// Holds the read-direction chunk size and per chunk stream state only; the
/// write direction lives in [`ChunkEncoder`](crate::ChunkEncoder).
pub struct ChunkDecoder {
    /// Chunk streams by ID
    chunk_streams: HashMap<u32, ChunkStreamState>,

    /// Current chunk size for reading
    chunk_size_in: usize,

    /// Largest message length accepted from the peer
    max_message_size: u32,

    /// Total bytes consumed from the transport
    bytes_read: u64,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        ChunkDecoder {
            chunk_streams: HashMap::new(),
            chunk_size_in: DEFAULT_CHUNK_SIZE as usize,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            bytes_read: 0,
        }
    }

    pub fn with_max_message_size(mut self, max: u32) -> Self {
        self.max_message_size = max;
        self
    }

    /// Set incoming chunk size
    pub fn set_chunk_size(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::chunk_format("Chunk size must be at least 1"));
        }
        self.chunk_size_in = size;
        Ok(())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size_in
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Discard the partially assembled message on `cs_id`
    pub fn abort(&mut self, cs_id: u32) {
        if let Some(state) = self.chunk_streams.get_mut(&cs_id) {
            state.discard();
        }
    }

    /// Read chunks until one message is complete
    pub async fn read_message<R: AsyncRead + Unpin>(&mut self, reader: &mut R) -> Result<Message> {
        loop {
            if let Some(message) = self.read_chunk(reader).await? {
                return Ok(message);
            }
        }
    }

    /// Read a single chunk; returns the message it completes, if any
    pub async fn read_chunk<R: AsyncRead + Unpin>(&mut self, reader: &mut R) -> Result<Option<Message>> {
        let first = self.read_u8(reader).await?;
        let fmt = first >> 6;
        let cs_id = match first & 0x3F {
            0 => self.read_u8(reader).await? as u32 + 64,
            1 => {
                let mut id = [0u8; 2];
                self.read_bytes(reader, &mut id).await?;
                u16::from_le_bytes(id) as u32 + 64
            }
            n => n as u32,
        };

        if fmt != 0 && !self.chunk_streams.contains_key(&cs_id) {
            return Err(Error::chunk_format(format!(
                "Type {} header on unopened chunk stream {}",
                fmt, cs_id
            )));
        }

        let mut header = [0u8; 11];
        let header_len = match fmt {
            0 => 11,
            1 => 7,
            2 => 3,
            _ => 0,
        };
        self.read_bytes(reader, &mut header[..header_len]).await?;

        let field = if header_len > 0 {
            u32::from_be_bytes([0, header[0], header[1], header[2]])
        } else {
            0
        };

        let state = self.chunk_streams.entry(cs_id).or_default();
        if fmt != 3 && state.is_assembling() {
            return Err(Error::chunk_format(format!(
                "Type {} header in the middle of a message on chunk stream {}",
                fmt, cs_id
            )));
        }

        let extended = if fmt == 3 {
            state.extended_timestamp
        } else {
            field == EXTENDED_TIMESTAMP_MARKER
        };
        let mut ext = [0u8; 4];
        if extended {
            self.read_bytes(reader, &mut ext).await?;
        }
        let time_value = if extended && fmt != 3 { u32::from_be_bytes(ext) } else { field };

        let state = self.chunk_streams.entry(cs_id).or_default();
        match fmt {
            0 => {
                state.timestamp = time_value;
                state.timestamp_delta = time_value;
                state.message_length = u32::from_be_bytes([0, header[3], header[4], header[5]]);
                state.message_type = header[6];
                state.message_stream_id = u32::from_le_bytes([header[7], header[8], header[9], header[10]]);
                state.extended_timestamp = extended;
            }
            1 => {
                state.timestamp_delta = time_value;
                state.timestamp = state.timestamp.wrapping_add(time_value);
                state.message_length = u32::from_be_bytes([0, header[3], header[4], header[5]]);
                state.message_type = header[6];
                state.extended_timestamp = extended;
            }
            2 => {
                state.timestamp_delta = time_value;
                state.timestamp = state.timestamp.wrapping_add(time_value);
                state.extended_timestamp = extended;
            }
            _ => {
                if !state.is_assembling() {
                    state.timestamp = state.timestamp.wrapping_add(state.timestamp_delta);
                }
            }
        }

        if !state.is_assembling() {
            if state.message_length > self.max_message_size {
                let length = state.message_length;
                state.discard();
                return Err(Error::chunk_format(format!(
                    "Message length {} on chunk stream {} exceeds limit {}",
                    length, cs_id, self.max_message_size
                )));
            }
            state.begin_message();
        }

        let take = state.remaining.min(self.chunk_size_in);
        let start = state.payload.len();
        state.payload.resize(start + take, 0);
        reader.read_exact(&mut state.payload[start..]).await?;
        state.remaining -= take;
        self.bytes_read += take as u64;

        if state.remaining > 0 {
            return Ok(None);
        }

        let header = MessageHeader::new(
            state.timestamp,
            state.message_type,
            state.message_stream_id,
            cs_id,
        );
        Ok(Some(Message::new(header, std::mem::take(&mut state.payload))))
    }

    async fn read_u8<R: AsyncRead + Unpin>(&mut self, reader: &mut R) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.read_bytes(reader, &mut byte).await?;
        Ok(byte[0])
    }

    async fn read_bytes<R: AsyncRead + Unpin>(&mut self, reader: &mut R, buf: &mut [u8]) -> Result<()> {
        reader.read_exact(buf).await?;
        self.bytes_read += buf.len() as u64;
        Ok(())
    }
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        Self::new()
    }
}
