/// Per chunk stream bookkeeping, one table per direction.
///
/// An entry only exists after a type 0 header was seen (read side) or sent
/// (write side); that is what makes the compressed header forms resolvable.
#[derive(Debug, Clone, Default)]
pub struct ChunkStreamState {
    /// Absolute timestamp of the current/last message
    pub timestamp: u32,

    /// Delta reused by a type 3 chunk that starts a new message
    pub timestamp_delta: u32,

    pub message_length: u32,

    pub message_type: u8,

    pub message_stream_id: u32,

    /// Whether the last message header carried an extended timestamp;
    /// type 3 chunks on this stream then repeat it
    pub extended_timestamp: bool,

    /// Payload assembled so far (read side)
    pub payload: Vec<u8>,

    /// Bytes still expected for the in-flight message (read side)
    pub remaining: usize,
}

impl ChunkStreamState {
    pub fn is_assembling(&self) -> bool {
        self.remaining > 0
    }

    /// Prepare for a new message of the current length
    pub fn begin_message(&mut self) {
        self.remaining = self.message_length as usize;
        self.payload.clear();
        self.payload.reserve(self.message_length as usize);
    }

    /// Drop a partially received message
    pub fn discard(&mut self) {
        self.remaining = 0;
        self.payload.clear();
    }
}
