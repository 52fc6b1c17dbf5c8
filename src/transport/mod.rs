//! Event channel between a running app and the remote debugging UI.

pub mod channel;
pub mod loopback;
pub mod socket;

pub use channel::{Channel, Frame, InboundHandler, CONNECT_EVENT, DISCONNECT_EVENT};
pub use loopback::LoopbackChannel;
pub use socket::SocketChannel;
