// RTMP Push Example
//
// Publishes 30 seconds of synthetic audio/video to a remote server.
//
// Usage:
//   cargo run --example push_client -- rtmp://localhost/live/mystream

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info};
use rtmp::{Amf0Value, ClientConfig, MediaPump, MediaSender, Result, RtmpPusher, StopSignal};

/// 25 fps of fake H.264 frames plus AAC packets
struct TestPattern {
    duration_ms: u32,
}

#[async_trait]
impl MediaPump for TestPattern {
    async fn pump(&mut self, sender: MediaSender, mut stop: StopSignal) -> Result<()> {
        let mut metadata = HashMap::new();
        metadata.insert("width".to_string(), Amf0Value::Number(1920.0));
        metadata.insert("height".to_string(), Amf0Value::Number(1080.0));
        metadata.insert("videocodecid".to_string(), Amf0Value::Number(7.0)); // H.264
        metadata.insert("audiocodecid".to_string(), Amf0Value::Number(10.0)); // AAC
        metadata.insert("framerate".to_string(), Amf0Value::Number(25.0));
        sender.send_metadata(metadata).await?;

        let frame_duration_ms = 40;
        let mut ticker = tokio::time::interval(Duration::from_millis(frame_duration_ms as u64));
        let mut timestamp = 0u32;

        while timestamp < self.duration_ms {
            tokio::select! {
                _ = stop.stopped() => break,
                _ = ticker.tick() => {}
            }

            let keyframe = timestamp % 2000 == 0;
            let mut video = vec![if keyframe { 0x17 } else { 0x27 }, 0x01, 0x00, 0x00, 0x00];
            video.extend_from_slice(&[0u8; 512]);
            sender.send_video(timestamp, video).await?;

            let mut audio = vec![0xAF, 0x01];
            audio.extend_from_slice(&[0u8; 128]);
            sender.send_audio(timestamp, audio).await?;

            timestamp += frame_duration_ms;
        }

        info!("Test pattern finished at {} ms", timestamp);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <rtmp://host/app/stream>", args[0]);
        std::process::exit(1);
    }

    let config = ClientConfig::builder()
        .chunk_size(4096)
        .build()?;

    let mut pusher = RtmpPusher::new(&args[1], config);

    let stop = pusher.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C, stopping");
            stop.stop();
        }
    });

    pusher.connect().await?;
    if let Err(e) = pusher.push(TestPattern { duration_ms: 30_000 }).await {
        error!("Push failed: {}", e);
        return Err(e);
    }

    Ok(())
}
