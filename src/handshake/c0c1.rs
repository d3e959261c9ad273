use crate::BytesWriteExt;
use crate::handshake::state::{DigestSchema, HandshakeMode};
use crate::handshake::{digest_of, FP_KEY, HANDSHAKE_SIZE, RTMP_VERSION};
use crate::utils::{generate_random_bytes, hmac_sha256};

/// Flash Player version advertised in a digest C1
pub const CLIENT_VERSION: [u8; 4] = [9, 0, 124, 2];

/// Client opening packet (C0 + C1)
#[derive(Debug, Clone)]
pub struct C0C1 {
    /// RTMP version (C0)
    pub version: u8,

    /// The 1536 byte C1 block
    pub c1: Vec<u8>,
}

impl C0C1 {
    /// Build C0+C1 for `mode` with `timestamp` as the C1 time field
    pub fn create(mode: HandshakeMode, timestamp: u32) -> Self {
        let mut c1 = Vec::with_capacity(HANDSHAKE_SIZE);
        c1.put_u32_be(timestamp);
        match mode {
            HandshakeMode::Simple => c1.put_u32_be(0),
            HandshakeMode::Digest => c1.extend_from_slice(&CLIENT_VERSION),
        }
        c1.extend_from_slice(&generate_random_bytes(HANDSHAKE_SIZE - 8));

        if mode == HandshakeMode::Digest {
            let offset = DigestSchema::Schema1.digest_offset(&c1);
            let digest = digest_of(&c1, offset, &FP_KEY[..30]);
            c1[offset..offset + 32].copy_from_slice(&digest);
        }

        C0C1 { version: RTMP_VERSION, c1 }
    }

    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.c1[0], self.c1[1], self.c1[2], self.c1[3]])
    }

    /// Encode to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(1 + HANDSHAKE_SIZE);
        result.push(self.version);
        result.extend_from_slice(&self.c1);
        result
    }
}

/// Client closing packet
#[derive(Debug, Clone)]
pub struct C2 {
    pub data: Vec<u8>,
}

impl C2 {
    /// Echo S1 back, with our own time in the second field
    pub fn echo(s1: &[u8], timestamp2: u32) -> Self {
        let mut data = Vec::with_capacity(HANDSHAKE_SIZE);
        data.extend_from_slice(&s1[0..4]);
        data.put_u32_be(timestamp2);
        data.extend_from_slice(&s1[8..HANDSHAKE_SIZE]);
        C2 { data }
    }

    /// Random block signed with a key derived from the server's S1 digest
    pub fn signed(s1_digest: &[u8]) -> Self {
        let mut data = generate_random_bytes(HANDSHAKE_SIZE);
        let key = hmac_sha256(&FP_KEY, &[s1_digest]);
        let signature = hmac_sha256(&key, &[&data[..HANDSHAKE_SIZE - 32]]);
        data[HANDSHAKE_SIZE - 32..].copy_from_slice(&signature);
        C2 { data }
    }

    pub fn encode(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_c0c1() {
        let c0c1 = C0C1::create(HandshakeMode::Simple, 1234);
        let bytes = c0c1.encode();

        assert_eq!(bytes.len(), 1537);
        assert_eq!(bytes[0], RTMP_VERSION);
        assert_eq!(c0c1.timestamp(), 1234);
        assert_eq!(&bytes[5..9], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_digest_c1_is_self_consistent() {
        let c0c1 = C0C1::create(HandshakeMode::Digest, 0);
        assert_eq!(&c0c1.c1[4..8], &CLIENT_VERSION);

        let offset = DigestSchema::Schema1.digest_offset(&c0c1.c1);
        let expected = digest_of(&c0c1.c1, offset, &FP_KEY[..30]);
        assert_eq!(&c0c1.c1[offset..offset + 32], &expected);
    }

    #[test]
    fn test_c2_echo() {
        let s1: Vec<u8> = (0..HANDSHAKE_SIZE).map(|i| i as u8).collect();
        let c2 = C2::echo(&s1, 99);

        assert_eq!(&c2.data[0..4], &s1[0..4]);
        assert_eq!(&c2.data[4..8], &99u32.to_be_bytes());
        assert_eq!(&c2.data[8..], &s1[8..]);
    }

    #[test]
    fn test_signed_c2_trailer() {
        let s1_digest = [7u8; 32];
        let c2 = C2::signed(&s1_digest);
        let key = hmac_sha256(&FP_KEY, &[&s1_digest]);
        let expected = hmac_sha256(&key, &[&c2.data[..HANDSHAKE_SIZE - 32]]);
        assert_eq!(&c2.data[HANDSHAKE_SIZE - 32..], &expected);
    }
}
