use crate::{BytesWriteExt, Error, Result, DEFAULT_CHUNK_SIZE, EXTENDED_TIMESTAMP_MARKER};
use crate::chunk::encode_basic_header;
use crate::chunk::stream::ChunkStreamState;
use crate::protocol::Message;
use std::collections::HashMap;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Splits outbound messages into chunks.
///
/// Headers are compressed against the previous message on the same chunk
/// stream: type 2 when only the timestamp moved, type 1 when the message
/// stream id is unchanged, type 0 otherwise. A new message never goes out as
/// type 3.
pub struct ChunkEncoder {
    /// Last header sent on each chunk stream
    chunk_streams: HashMap<u32, ChunkStreamState>,

    /// Current chunk size for writing
    chunk_size_out: usize,

    compress_headers: bool,
}

impl ChunkEncoder {
    pub fn new() -> Self {
        ChunkEncoder {
            chunk_streams: HashMap::new(),
            chunk_size_out: DEFAULT_CHUNK_SIZE as usize,
            compress_headers: true,
        }
    }

    /// Set outgoing chunk size
    pub fn set_chunk_size(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::chunk_format("Chunk size must be at least 1"));
        }
        self.chunk_size_out = size;
        Ok(())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size_out
    }

    /// Always emit type 0 headers when disabled
    pub fn set_header_compression(&mut self, enabled: bool) {
        self.compress_headers = enabled;
    }

    /// Encode and write one message, then flush
    pub async fn write_message<W: AsyncWrite + Unpin>(
        &mut self,
        message: &Message,
        writer: &mut W,
    ) -> Result<()> {
        let bytes = self.encode(message)?;
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Encode one message into its chunk sequence
    pub fn encode(&mut self, message: &Message) -> Result<Vec<u8>> {
        let header = &message.header;
        let cs_id = header.chunk_stream_id;
        let length = message.payload.len();
        if length > 0xFF_FFFF {
            return Err(Error::chunk_format(format!("Message of {} bytes is too large to chunk", length)));
        }
        let length = length as u32;

        let fmt = match self.chunk_streams.get(&cs_id) {
            Some(prev)
                if self.compress_headers
                    && prev.message_stream_id == header.message_stream_id
                    && header.timestamp >= prev.timestamp =>
            {
                if prev.message_type == header.message_type && prev.message_length == length {
                    2
                } else {
                    1
                }
            }
            _ => 0,
        };

        let time_field = match self.chunk_streams.get(&cs_id) {
            Some(prev) if fmt != 0 => header.timestamp - prev.timestamp,
            _ => header.timestamp,
        };
        let extended = time_field >= EXTENDED_TIMESTAMP_MARKER;

        let chunk_count = (length as usize).div_ceil(self.chunk_size_out).max(1);
        let mut out = Vec::with_capacity(length as usize + 18 + chunk_count * 5);

        encode_basic_header(fmt, cs_id, &mut out)?;
        out.put_u24_be(if extended { EXTENDED_TIMESTAMP_MARKER } else { time_field });
        if fmt <= 1 {
            out.put_u24_be(length);
            out.put_u8(header.message_type);
        }
        if fmt == 0 {
            out.put_u32_le(header.message_stream_id);
        }
        if extended {
            out.put_u32_be(time_field);
        }

        for (index, chunk) in message.payload.chunks(self.chunk_size_out).enumerate() {
            if index > 0 {
                encode_basic_header(3, cs_id, &mut out)?;
                if extended {
                    out.put_u32_be(time_field);
                }
            }
            out.extend_from_slice(chunk);
        }

        let state = self.chunk_streams.entry(cs_id).or_default();
        state.timestamp = header.timestamp;
        state.timestamp_delta = time_field;
        state.message_length = length;
        state.message_type = header.message_type;
        state.message_stream_id = header.message_stream_id;
        state.extended_timestamp = extended;

        Ok(out)
    }
}

impl Default for ChunkEncoder {
    fn default() -> Self {
        Self::new()
    }
}
