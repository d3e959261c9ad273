/// Which flavour of handshake the client performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakeMode {
    /// Plain echo handshake, version field zero
    #[default]
    Simple,

    /// Flash Player style handshake with HMAC-SHA256 digests in C1/C2,
    /// validating the server digest in S1
    Digest,
}

/// Position of the 32-byte digest inside a 1536-byte handshake packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestSchema {
    /// Key block first, digest block at byte 764
    Schema0,

    /// Digest block at byte 8, key block after it
    Schema1,
}

impl DigestSchema {
    /// Offset of the digest within `packet`
    pub fn digest_offset(self, packet: &[u8]) -> usize {
        let base = match self {
            DigestSchema::Schema0 => 772,
            DigestSchema::Schema1 => 8,
        };
        let sum: usize = packet[base..base + 4].iter().map(|b| *b as usize).sum();
        sum % 728 + base + 4
    }
}
