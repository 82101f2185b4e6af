// ABOUTME: Per-socket connection plumbing covering handshake, framed read/write, and teardown
// ABOUTME: Also provides the address-family-aware socket constructor shared by the client and server

//! Per-socket connection plumbing: handshake, framed read/write, teardown.
//!
//! A struct owning a `TcpStream` plus a `BytesMut` reassembly buffer, with
//! a `read_frame` loop that drains complete frames as they become
//! available. The handshake exchange runs under a `tokio::time::timeout`
//! so a stalled peer fails the handshake instead of blocking forever.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};

use crate::codec::{decode_frame, encode_frame, FramingError};
use crate::error::ClientError;
use crate::header::{flags, ids, Header, HEADER_SIZE, PACKET_MAGIC};

/// Creates an unbound `TcpSocket` matching `addr`'s address family. Kept
/// separate from bind/listen/connect so each step can fail with its own
/// error kind.
pub fn new_socket_for(addr: SocketAddr) -> io::Result<TcpSocket> {
    match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }
}

/// Observable lifecycle of a single connection, either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Handshaking,
    Open,
    Closing,
    Closed,
}

/// Failure modes surfaced from [`Connection::read_frame`].
#[derive(Debug, Error)]
pub enum ReadFrameError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Framing(#[from] FramingError),
    #[error("peer closed the connection mid-frame")]
    ResetMidFrame,
}

/// A socket decorated with the reassembly buffer and framing rules shared
/// by the client and server endpoints.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    buffer: BytesMut,
    max_packet_bytes: u32,
}

impl Connection {
    pub fn new(stream: TcpStream, max_packet_bytes: u32) -> Self {
        Connection {
            stream,
            buffer: BytesMut::with_capacity(crate::header::RECV_CHUNK_BYTES),
            max_packet_bytes,
        }
    }

    /// Reads from the socket, appending to the reassembly buffer, until one
    /// complete frame can be sliced off the front. Returns `Ok(None)` only
    /// on a clean end-of-stream with no partial frame pending.
    ///
    /// Cancel-safe: the reassembly buffer lives on `self`, not on the
    /// stack of this future, so a `tokio::select!` branch that drops this
    /// future mid-poll loses no bytes already read from the socket.
    pub async fn read_frame(&mut self) -> Result<Option<(Header, Bytes)>, ReadFrameError> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buffer, self.max_packet_bytes)? {
                return Ok(Some(frame));
            }

            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(ReadFrameError::ResetMidFrame)
                };
            }
        }
    }

    /// Encodes and writes one packet. Loops internally (via
    /// `AsyncWriteExt::write_all`) until every byte is on the wire.
    pub async fn write_frame(&mut self, id: u16, bit_flags: u16, payload: &[u8]) -> io::Result<()> {
        let frame = encode_frame(id, bit_flags, payload);
        self.stream.write_all(&frame).await
    }

    /// Writes an already-encoded frame verbatim (used by endpoints whose
    /// send path serializes off the connection task, e.g. across an mpsc
    /// channel).
    pub async fn write_raw(&mut self, frame: &[u8]) -> io::Result<()> {
        self.stream.write_all(frame).await
    }

    /// Shuts down both halves of the socket. Idempotent: a second call
    /// simply observes the already-shut-down state and returns quietly.
    pub async fn shutdown(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}

fn handshake_header_ok(header: &Header, expect_id: u16, expect_flags: u16) -> bool {
    header.magic == PACKET_MAGIC
        && header.id == expect_id
        && header.flags == expect_flags
        && header.length == HEADER_SIZE as u32
}

/// Client-side handshake: send the client hello, then block for the
/// server's reply header.
pub async fn perform_client_handshake(
    stream: &mut TcpStream,
    timeout: Duration,
) -> Result<(), ClientError> {
    let exchange = async {
        let hello = Header::header_only(ids::ID_HANDSHAKE, flags::FL_HANDSHAKE_CLIENT);
        stream.write_all(&hello.to_bytes()).await?;

        let mut reply_bytes = [0u8; HEADER_SIZE];
        stream.read_exact(&mut reply_bytes).await?;
        Ok::<Header, io::Error>(Header::from_bytes(&reply_bytes))
    };

    match tokio::time::timeout(timeout, exchange).await {
        Err(_elapsed) => Err(ClientError::HandshakeTimedOut),
        Ok(Err(_io)) => Err(ClientError::HandshakeFailed),
        Ok(Ok(reply)) => {
            if handshake_header_ok(&reply, ids::ID_HANDSHAKE, flags::FL_HANDSHAKE_SERVER) {
                Ok(())
            } else {
                Err(ClientError::HandshakeFailed)
            }
        }
    }
}

/// Server-side handshake: send the server hello, then block for the
/// client's reply header. Failure here is never surfaced to the caller of
/// `start` — the acceptor just drops the new socket silently, so the
/// result carries no error payload beyond "did it succeed".
pub async fn perform_server_handshake(stream: &mut TcpStream, timeout: Duration) -> bool {
    let exchange = async {
        let hello = Header::header_only(ids::ID_HANDSHAKE, flags::FL_HANDSHAKE_SERVER);
        stream.write_all(&hello.to_bytes()).await?;

        let mut reply_bytes = [0u8; HEADER_SIZE];
        stream.read_exact(&mut reply_bytes).await?;
        Ok::<Header, io::Error>(Header::from_bytes(&reply_bytes))
    };

    match tokio::time::timeout(timeout, exchange).await {
        Err(_elapsed) => false,
        Ok(Err(_io)) => false,
        Ok(Ok(reply)) => handshake_header_ok(&reply, ids::ID_HANDSHAKE, flags::FL_HANDSHAKE_CLIENT),
    }
}
