// RTMP Pull Example
//
// Plays a remote stream and logs what arrives.
//
// Usage:
//   cargo run --example pull_client -- rtmp://localhost/live/mystream

use std::env;

use async_trait::async_trait;
use log::{error, info};
use rtmp::{ClientConfig, MediaSink, Message, Result, RtmpData, RtmpPuller};

#[derive(Default)]
struct Stats {
    audio: u64,
    video: u64,
    bytes: u64,
}

#[async_trait]
impl MediaSink for Stats {
    async fn receive_audio(&mut self, message: Message) -> Result<()> {
        self.audio += 1;
        self.bytes += message.len() as u64;
        Ok(())
    }

    async fn receive_video(&mut self, message: Message) -> Result<()> {
        self.video += 1;
        self.bytes += message.len() as u64;
        if message.payload.first().map(|b| b >> 4) == Some(1) {
            info!(
                "Keyframe at {} ms ({} audio, {} video, {} bytes so far)",
                message.timestamp(),
                self.audio,
                self.video,
                self.bytes
            );
        }
        Ok(())
    }

    async fn receive_data(&mut self, message: Message) -> Result<()> {
        let data = RtmpData::decode(&message.payload)?;
        if let Some(metadata) = data.metadata() {
            info!("Metadata: {:?}", metadata);
        }
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
        .buffer_time(1000)
        .build()?;

    let mut puller = RtmpPuller::new(&args[1], config);

    let stop = puller.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C, stopping");
            stop.stop();
        }
    });

    let mut stats = Stats::default();
    puller.connect().await?;
    if let Err(e) = puller.pull(&mut stats).await {
        error!("Pull failed: {}", e);
        return Err(e);
    }

    info!("Received {} audio and {} video messages", stats.audio, stats.video);
    Ok(())
}
