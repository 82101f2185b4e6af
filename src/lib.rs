//! A small, self-contained asynchronous TCP messaging framework: a
//! symmetric client/server pair exchanging length-delimited, typed binary
//! packets over a single stream connection, with a framed handshake,
//! periodic liveness probes, and pluggable per-packet dispatch.
//!
//! The three load-bearing pieces, leaves first:
//! - [`serializer`]: the deterministic little-endian encoding for scalars,
//!   arrays, strings, and string arrays.
//! - [`codec`] and [`header`]: the wire header and the framing rules that
//!   turn a byte stream into `(header, payload)` pairs.
//! - [`connection`], [`client`], [`server`]: the per-socket state machine
//!   and the concurrent pipelines that drive it on each side.
//!
//! # Example
//!
//! ```rust,no_run
//! use async_connect::client::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .on_packet(|_conn, id, _ser| println!("got packet {id}"))
//!         .build()?;
//!
//!     client.connect("127.0.0.1:9000").await?;
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod callback;
pub mod client;
pub mod codec;
pub mod connection;
pub mod error;
pub mod header;
pub mod packet;
pub mod serializer;
pub mod server;

pub use callback::{ConnectHandler, DisconnectHandler, PacketHandler, StopHandler};
pub use client::{Client, ClientBuilder, ClientHandle};
pub use codec::{decode_frame, encode_frame, FramingError};
pub use connection::{Connection, ConnectionState};
pub use error::{ClientError, DisconnectReason, SendError, ServerError};
pub use header::{flags, ids, Header, DEFAULT_MAX_PACKET_BYTES, HEADER_SIZE, PACKET_MAGIC};
pub use packet::Packet;
pub use serializer::{Scalar, SerializeError, Serializer};
pub use server::{ConnId, Server, ServerBuilder, ServerConnHandle};
