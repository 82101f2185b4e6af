//! User callback plane: a value carrying a callable, invoked synchronously
//! from the dispatcher.
//!
//! Registration happens only through [`crate::client::ClientBuilder`] /
//! [`crate::server::ServerBuilder`], which are consumed by `connect`/
//! `start`; there is no setter on the running endpoint, so re-registration
//! after start is a compile-time impossibility rather than a runtime
//! rejection.

use std::sync::Arc;

use crate::error::DisconnectReason;
use crate::serializer::Serializer;

/// Invoked synchronously from the dispatcher for every packet whose id is
/// greater than [`crate::header::ids::NUM_PRESET_IDS`]. `ser` is
/// positioned at the start of the packet's payload.
pub type PacketHandler<Conn> = Arc<dyn Fn(&Conn, u16, &mut Serializer) + Send + Sync>;

/// Invoked exactly once per connection when it tears down, for any reason.
pub type DisconnectHandler<Conn> = Arc<dyn Fn(&Conn, DisconnectReason) + Send + Sync>;

/// Server-only: invoked once a new connection completes its handshake and
/// is admitted to the connection set.
pub type ConnectHandler<Conn> = Arc<dyn Fn(&Conn) + Send + Sync>;

/// Server-only: invoked once when `stop()` tears the listener down.
pub type StopHandler = Arc<dyn Fn() + Send + Sync>;
