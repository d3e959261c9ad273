use crate::{Error, Result};
use crate::handshake::state::DigestSchema;
use crate::handshake::{digest_of, FMS_KEY, HANDSHAKE_SIZE, RTMP_VERSION};

/// Server reply (S0 + S1 + S2) as read off the wire
#[derive(Debug, Clone)]
pub struct S0S1S2 {
    /// RTMP version (S0)
    pub version: u8,

    pub s1: Vec<u8>,

    pub s2: Vec<u8>,
}

impl S0S1S2 {
    /// Parse S0+S1+S2 from bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 1 + HANDSHAKE_SIZE * 2 {
            return Err(Error::handshake(format!(
                "S0+S1+S2 too short: {} bytes",
                data.len()
            )));
        }

        let version = data[0];
        if version != RTMP_VERSION {
            return Err(Error::handshake(format!(
                "Unsupported server version: {}, expected {}",
                version, RTMP_VERSION
            )));
        }

        Ok(S0S1S2 {
            version,
            s1: data[1..1 + HANDSHAKE_SIZE].to_vec(),
            s2: data[1 + HANDSHAKE_SIZE..1 + HANDSHAKE_SIZE * 2].to_vec(),
        })
    }

    pub fn s1_timestamp(&self) -> u32 {
        u32::from_be_bytes([self.s1[0], self.s1[1], self.s1[2], self.s1[3]])
    }

    /// Locate and verify the server digest in S1, trying schema 1 first
    pub fn validate_s1_digest(&self) -> Result<[u8; 32]> {
        for schema in [DigestSchema::Schema1, DigestSchema::Schema0] {
            let offset = schema.digest_offset(&self.s1);
            let expected = digest_of(&self.s1, offset, &FMS_KEY[..36]);
            if self.s1[offset..offset + 32] == expected {
                return Ok(expected);
            }
        }
        Err(Error::handshake("S1 digest does not match either schema"))
    }
}
