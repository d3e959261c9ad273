mod config;
mod connector;
mod media;
mod puller;
mod pusher;
mod state;
mod url;

pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_FLASH_VER};
pub use connector::SessionConnector;
pub use media::{MediaPump, MediaSender, MediaSink, NoHooks, SessionHooks, StopHandle, StopSignal};
pub use puller::RtmpPuller;
pub use pusher::RtmpPusher;
pub use state::SessionState;
pub use self::url::RtmpUrl;
