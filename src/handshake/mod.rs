mod state;
mod c0c1;
mod s0s1s2;

pub use state::*;
pub use c0c1::*;
pub use s0s1s2::*;

use std::time::Duration;
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use crate::{Epoch, Error, Result};
use crate::utils::{hmac_sha256, with_timeout};

/// RTMP version
pub const RTMP_VERSION: u8 = 3;

/// Handshake packet size (C1/S1/C2/S2)
pub const HANDSHAKE_SIZE: usize = 1536;

const KEY_TAIL: [u8; 32] = [
    0xF0, 0xEE, 0xC2, 0x4A, 0x80, 0x68, 0xBE, 0xE8, 0x2E, 0x00, 0xD0, 0xD1, 0x02, 0x9E, 0x7E, 0x57,
    0x6E, 0xEC, 0x5D, 0x2D, 0x29, 0x80, 0x6F, 0xAB, 0x93, 0xB8, 0xE6, 0x36, 0xCF, 0xEB, 0x31, 0xAE,
];

const fn concat_key<const N: usize>(prefix: &[u8]) -> [u8; N] {
    let mut key = [0u8; N];
    let mut i = 0;
    while i < prefix.len() {
        key[i] = prefix[i];
        i += 1;
    }
    let mut j = 0;
    while j < KEY_TAIL.len() {
        key[i + j] = KEY_TAIL[j];
        j += 1;
    }
    key
}

/// Flash Player key; the first 30 bytes sign C1
pub const FP_KEY: [u8; 62] = concat_key(b"Genuine Adobe Flash Player 001");

/// Flash Media Server key; the first 36 bytes sign S1
pub const FMS_KEY: [u8; 68] = concat_key(b"Genuine Adobe Flash Media Server 001");

/// HMAC over `packet` with the 32 digest bytes at `offset` left out
pub(crate) fn digest_of(packet: &[u8], offset: usize, key: &[u8]) -> [u8; 32] {
    hmac_sha256(key, &[&packet[..offset], &packet[offset + 32..]])
}

/// Perform the client side of the handshake on `stream`.
///
/// Sends C0+C1, reads S0+S1+S2 and answers with C2. Every read and write
/// is bounded by the given timeouts; a short read fails the handshake.
pub async fn client_handshake<S>(
    stream: &mut S,
    mode: HandshakeMode,
    epoch: &Epoch,
    read_timeout: Duration,
    write_timeout: Duration,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let c0c1 = C0C1::create(mode, epoch.elapsed_ms());
    with_timeout(write_timeout, "Handshake C0+C1 write", async {
        write_packet(stream, &c0c1.encode())
            .await
            .map_err(|e| Error::handshake(format!("Failed to write C0+C1: {}", e)))
    })
    .await?;
    debug!("Sent C0+C1 ({:?} handshake)", mode);

    let mut reply = vec![0u8; 1 + HANDSHAKE_SIZE * 2];
    with_timeout(read_timeout, "Handshake S0+S1+S2 read", async {
        stream
            .read_exact(&mut reply)
            .await
            .map_err(|e| Error::handshake(format!("Failed to read S0+S1+S2: {}", e)))?;
        Ok(())
    })
    .await?;
    let s0s1s2 = S0S1S2::parse(&reply)?;
    debug!("Received S0+S1+S2, server time {}", s0s1s2.s1_timestamp());

    let c2 = match mode {
        HandshakeMode::Simple => C2::echo(&s0s1s2.s1, epoch.elapsed_ms()),
        HandshakeMode::Digest => {
            let s1_digest = s0s1s2.validate_s1_digest()?;
            C2::signed(&s1_digest)
        }
    };

    with_timeout(write_timeout, "Handshake C2 write", async {
        write_packet(stream, c2.encode())
            .await
            .map_err(|e| Error::handshake(format!("Failed to write C2: {}", e)))
    })
    .await?;
    debug!("Sent C2, handshake complete");

    Ok(())
}

async fn write_packet<S>(stream: &mut S, packet: &[u8]) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(packet).await?;
    stream.flush().await
}
