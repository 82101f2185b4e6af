// ABOUTME: Client endpoint owning one outbound connection with a receive/reassemble/dispatch pipeline
// ABOUTME: Resolves the target address, builds the socket, and drives the handshake before handing off to the connection task

//! Client endpoint: one outbound connection with a receive/reassemble/
//! dispatch pipeline.
//!
//! One task per connection owns the socket exclusively and
//! `tokio::select!`s between inbound bytes and an outbound command queue,
//! so sends never interleave and dispatch stays FIFO with wire order.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{lookup_host, ToSocketAddrs};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::callback::{DisconnectHandler, PacketHandler};
use crate::codec::encode_frame;
use crate::connection::{new_socket_for, perform_client_handshake, Connection, ConnectionState, ReadFrameError};
use crate::error::{ClientError, DisconnectReason, FramingError, SendError};
use crate::header::{flags, ids, DEFAULT_MAX_PACKET_BYTES};
use crate::packet::Packet;
use crate::serializer::Serializer;

/// A handle callbacks and callers share to the one connection a [`Client`]
/// owns. Cheap to clone; every clone refers to the same underlying socket
/// task.
#[derive(Clone)]
pub struct ClientHandle {
    cmd_tx: mpsc::UnboundedSender<ConnCommand>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl ClientHandle {
    pub fn is_connected(&self) -> bool {
        *self.state_rx.borrow() == ConnectionState::Open
    }
}

enum ConnCommand {
    Send(Vec<u8>),
    Close(DisconnectReason),
}

/// Configures and produces a [`Client`]. Callbacks are registered here and
/// are immutable for the client's lifetime — re-registration after `build`
/// is a compile error, not a runtime check.
pub struct ClientBuilder {
    packet_handler: Option<PacketHandler<ClientHandle>>,
    disconnect_handler: Option<DisconnectHandler<ClientHandle>>,
    max_packet_bytes: u32,
    handshake_timeout: Duration,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        ClientBuilder {
            packet_handler: None,
            disconnect_handler: None,
            max_packet_bytes: DEFAULT_MAX_PACKET_BYTES,
            handshake_timeout: Duration::from_secs(5),
        }
    }

    /// Required before `build`; mirrors `register_callback`.
    pub fn on_packet(
        mut self,
        handler: impl Fn(&ClientHandle, u16, &mut Serializer) + Send + Sync + 'static,
    ) -> Self {
        self.packet_handler = Some(Arc::new(handler));
        self
    }

    /// Optional; mirrors `register_disconnect_callback`.
    pub fn on_disconnect(
        mut self,
        handler: impl Fn(&ClientHandle, DisconnectReason) + Send + Sync + 'static,
    ) -> Self {
        self.disconnect_handler = Some(Arc::new(handler));
        self
    }

    pub fn max_packet_bytes(mut self, max: u32) -> Self {
        self.max_packet_bytes = max;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Client, ClientError> {
        let packet_handler = self.packet_handler.ok_or(ClientError::NoCallback)?;
        Ok(Client {
            packet_handler,
            disconnect_handler: self.disconnect_handler,
            max_packet_bytes: self.max_packet_bytes,
            handshake_timeout: self.handshake_timeout,
            active: Mutex::new(None),
        })
    }
}

struct ActiveConnection {
    cmd_tx: mpsc::UnboundedSender<ConnCommand>,
    state_rx: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

/// One outbound TCP connection, driven by a single background task per
/// `connect` call.
pub struct Client {
    packet_handler: PacketHandler<ClientHandle>,
    disconnect_handler: Option<DisconnectHandler<ClientHandle>>,
    max_packet_bytes: u32,
    handshake_timeout: Duration,
    active: Mutex<Option<ActiveConnection>>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Resolves `addr`, connects, and runs the client handshake. On
    /// success the receive/dispatch task is running and the connection is
    /// `open`. Returns `already_connected` if a connection is already
    /// active.
    pub async fn connect(&self, addr: impl ToSocketAddrs) -> Result<(), ClientError> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(ClientError::AlreadyConnected);
        }

        let resolved = lookup_host(addr)
            .await
            .map_err(ClientError::AddressResolution)?
            .next()
            .ok_or_else(|| {
                ClientError::AddressResolution(io::Error::new(
                    io::ErrorKind::NotFound,
                    "address resolved to no candidates",
                ))
            })?;

        let socket = new_socket_for(resolved).map_err(ClientError::SocketCreate)?;
        let mut stream = socket.connect(resolved).await.map_err(ClientError::Connect)?;
        perform_client_handshake(&mut stream, self.handshake_timeout).await?;
        debug!("client handshake complete");

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Open);
        let handle = ClientHandle {
            cmd_tx: cmd_tx.clone(),
            state_rx: state_rx.clone(),
        };

        let conn = Connection::new(stream, self.max_packet_bytes);
        let packet_handler = Arc::clone(&self.packet_handler);
        let disconnect_handler = self.disconnect_handler.clone();
        let task_handle = handle.clone();
        let task = tokio::spawn(async move {
            run_connection(conn, cmd_rx, state_tx, packet_handler, disconnect_handler, task_handle).await;
        });

        *active = Some(ActiveConnection {
            cmd_tx,
            state_rx,
            task,
        });
        Ok(())
    }

    /// Idempotent. In state `open`, sends a disconnect header, shuts the
    /// socket down, and waits for the connection task to finish (so the
    /// disconnect callback has fired exactly once by the time this
    /// returns).
    pub async fn disconnect(&self) {
        let mut active = self.active.lock().await;
        if let Some(conn) = active.take() {
            let _ = conn.cmd_tx.send(ConnCommand::Close(DisconnectReason::Stop));
            let _ = conn.task.await;
        }
    }

    pub async fn is_connected(&self) -> bool {
        match &*self.active.lock().await {
            Some(conn) => *conn.state_rx.borrow() == ConnectionState::Open,
            None => false,
        }
    }

    /// Serializes `packet`, frames it with `fl_none`, and queues it on the
    /// connection task's send channel — sends from concurrent callers
    /// never interleave because exactly one task ever writes to the
    /// socket.
    pub async fn send_packet<P: Packet>(&self, packet: &P) -> Result<(), SendError> {
        let active = self.active.lock().await;
        let conn = active.as_ref().ok_or(SendError::NotConnected)?;

        let mut ser = Serializer::new();
        packet.encode(&mut ser);
        let frame = encode_frame(packet.id(), flags::FL_NONE, ser.as_bytes()).to_vec();

        conn.cmd_tx
            .send(ConnCommand::Send(frame))
            .map_err(|_| SendError::NotConnected)
    }
}

async fn run_connection(
    mut conn: Connection,
    mut cmd_rx: mpsc::UnboundedReceiver<ConnCommand>,
    state_tx: watch::Sender<ConnectionState>,
    packet_handler: PacketHandler<ClientHandle>,
    disconnect_handler: Option<DisconnectHandler<ClientHandle>>,
    handle: ClientHandle,
) {
    let mut serializer = Serializer::new();

    let reason = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ConnCommand::Send(bytes)) => {
                        if let Err(e) = conn.write_raw(&bytes).await {
                            warn!(error = %e, "client send failed");
                            break DisconnectReason::Io;
                        }
                    }
                    Some(ConnCommand::Close(reason)) => {
                        if reason == DisconnectReason::Stop {
                            let _ = conn.write_frame(ids::ID_DISCONNECT, flags::FL_DISCONNECT, &[]).await;
                        }
                        break reason;
                    }
                    None => break DisconnectReason::Stop,
                }
            }
            frame = conn.read_frame() => {
                match frame {
                    Ok(Some((header, payload))) => {
                        if header.id == ids::ID_HEARTBEAT {
                            continue;
                        }
                        if header.id == ids::ID_DISCONNECT && header.flags & flags::FL_DISCONNECT != 0 {
                            break DisconnectReason::PeerDisconnected;
                        }
                        if header.id == ids::ID_HANDSHAKE {
                            break DisconnectReason::Framing(FramingError::BadMagic);
                        }
                        if header.id > ids::NUM_PRESET_IDS {
                            serializer.assign_buffer(&payload);
                            packet_handler(&handle, header.id, &mut serializer);
                        }
                        // id == NUM_PRESET_IDS or id_none: reserved-undefined, dropped.
                    }
                    Ok(None) => break DisconnectReason::PeerClosed,
                    Err(ReadFrameError::Io(_)) | Err(ReadFrameError::ResetMidFrame) => {
                        break DisconnectReason::Io;
                    }
                    Err(ReadFrameError::Framing(e)) => break DisconnectReason::Framing(e),
                }
            }
        }
    };

    conn.shutdown().await;
    let _ = state_tx.send(ConnectionState::Closed);
    debug!(%reason, "client connection closed");

    if let Some(cb) = disconnect_handler {
        cb(&handle, reason);
    }
}
