//! Wire protocol and WebSocket transport

pub mod connection;
pub mod frame;
pub mod handler;
pub mod protocol;

pub use connection::Connection;
pub use frame::{Frame, MessageTag, ProtocolError};
