mod connection;
mod context;
mod sender;

pub use connection::Connection;
pub use context::ConnectionInfo;
pub use sender::MessageSender;
