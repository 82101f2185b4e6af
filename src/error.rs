//! Crate-level error taxonomy, re-exported from [`crate`].
//!
//! Construction/configuration failures ([`ClientError`], [`ServerError`])
//! surface synchronously to the caller. Steady-state failures
//! ([`DisconnectReason`]) never cross a task boundary as a `Result`; they
//! are reported exactly once through the registered disconnect callback.

use std::fmt;
use std::io;

use thiserror::Error;

pub use crate::codec::FramingError;
pub use crate::serializer::SerializeError;

/// Why a connection was torn down. Passed to the disconnect callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The local side called `disconnect`/`stop`.
    Stop,
    /// The peer sent an explicit disconnect packet.
    PeerDisconnected,
    /// A `recv` returned zero bytes: the peer closed the socket.
    PeerClosed,
    /// A `send` or `recv` failed.
    Io,
    /// The framing layer rejected the stream (bad magic, bad length, or an
    /// oversized packet).
    Framing(FramingError),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Stop => write!(f, "local stop"),
            DisconnectReason::PeerDisconnected => write!(f, "peer sent disconnect"),
            DisconnectReason::PeerClosed => write!(f, "peer closed the connection"),
            DisconnectReason::Io => write!(f, "I/O error"),
            DisconnectReason::Framing(e) => write!(f, "framing error: {e}"),
        }
    }
}

/// Errors raised synchronously from [`crate::client::ClientBuilder`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("already connected")]
    AlreadyConnected,
    #[error("no packet handler registered before connect")]
    NoCallback,
    #[error("address resolution failed: {0}")]
    AddressResolution(#[source] io::Error),
    #[error("failed to create socket: {0}")]
    SocketCreate(#[source] io::Error),
    #[error("failed to connect: {0}")]
    Connect(#[source] io::Error),
    #[error("handshake failed")]
    HandshakeFailed,
    #[error("handshake timed out")]
    HandshakeTimedOut,
}

/// Returned by `send_packet` on either endpoint when there is no live
/// connection to write the frame to: an unbound client, or a connection id
/// the server has never seen.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    #[error("not connected")]
    NotConnected,
    #[error("no connection with that id")]
    UnknownConnection,
}

/// Errors raised synchronously from [`crate::server::ServerBuilder`].
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("already running")]
    AlreadyRunning,
    #[error("no packet handler registered before start")]
    NoCallback,
    #[error("address resolution failed: {0}")]
    AddressResolution(#[source] io::Error),
    #[error("failed to create socket: {0}")]
    SocketCreate(#[source] io::Error),
    #[error("failed to bind: {0}")]
    Bind(#[source] io::Error),
    #[error("failed to listen: {0}")]
    Listen(#[source] io::Error),
}
