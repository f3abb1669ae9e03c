//! Network layer
//!
//! The TCP server, the length-prefixed binary protocol codec, and
//! connection accounting.

pub mod connection;
pub mod protocol;
pub mod server;

pub use connection::{ConnectionInfo, ConnectionPool, ConnectionPoolStats};
pub use protocol::FrameError;
pub use server::TcpServer;
