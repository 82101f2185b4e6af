//! Server endpoint: listening socket, a set of accepted connections, and
//! the per-connection receive/reassemble/dispatch pipeline plus the
//! periodic heartbeat.
//!
//! One acceptor task runs the `TcpListener` accept loop, one heartbeat
//! task ticks on an interval, and each accepted connection gets its own
//! receive/dispatch task once its handshake succeeds. Connections are
//! keyed by a monotonically increasing [`ConnId`] rather than the raw
//! socket handle, so ids stay stable and collision-free for the life of
//! the process.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{lookup_host, TcpListener};
use tokio::sync::{mpsc, watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::callback::{ConnectHandler, DisconnectHandler, PacketHandler, StopHandler};
use crate::codec::encode_frame;
use crate::connection::{new_socket_for, perform_server_handshake, Connection, ConnectionState, ReadFrameError};
use crate::error::{DisconnectReason, FramingError, SendError, ServerError};
use crate::header::{flags, ids, DEFAULT_MAX_PACKET_BYTES};
use crate::packet::Packet;
use crate::serializer::Serializer;

/// Backlog passed to `TcpSocket::listen`, matching the OS default most
/// platforms use for `listen(2)` when no explicit value is given.
const LISTEN_BACKLOG: u32 = 1024;

/// Stable identity for an accepted connection, assigned in acceptance
/// order. Deliberately not the OS socket handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

enum ConnCommand {
    Send(Vec<u8>),
    Close(DisconnectReason),
}

/// Handed to the per-connection callbacks in place of a raw socket.
#[derive(Clone)]
pub struct ServerConnHandle {
    id: ConnId,
    cmd_tx: mpsc::UnboundedSender<ConnCommand>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl ServerConnHandle {
    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn is_connected(&self) -> bool {
        *self.state_rx.borrow() == ConnectionState::Open
    }
}

struct ConnEntry {
    cmd_tx: mpsc::UnboundedSender<ConnCommand>,
    task: JoinHandle<()>,
}

pub struct ServerBuilder {
    packet_handler: Option<PacketHandler<ServerConnHandle>>,
    connect_handler: Option<ConnectHandler<ServerConnHandle>>,
    disconnect_handler: Option<DisconnectHandler<ServerConnHandle>>,
    stop_handler: Option<StopHandler>,
    max_packet_bytes: u32,
    handshake_timeout: Duration,
    heartbeat_interval: Duration,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        ServerBuilder {
            packet_handler: None,
            connect_handler: None,
            disconnect_handler: None,
            stop_handler: None,
            max_packet_bytes: DEFAULT_MAX_PACKET_BYTES,
            handshake_timeout: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(5),
        }
    }

    /// Required before `start`.
    pub fn on_packet(
        mut self,
        handler: impl Fn(&ServerConnHandle, u16, &mut Serializer) + Send + Sync + 'static,
    ) -> Self {
        self.packet_handler = Some(Arc::new(handler));
        self
    }

    pub fn on_connect(mut self, handler: impl Fn(&ServerConnHandle) + Send + Sync + 'static) -> Self {
        self.connect_handler = Some(Arc::new(handler));
        self
    }

    pub fn on_disconnect(
        mut self,
        handler: impl Fn(&ServerConnHandle, DisconnectReason) + Send + Sync + 'static,
    ) -> Self {
        self.disconnect_handler = Some(Arc::new(handler));
        self
    }

    pub fn on_stop(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.stop_handler = Some(Arc::new(handler));
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

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn build(self) -> Result<Server, ServerError> {
        let packet_handler = self.packet_handler.ok_or(ServerError::NoCallback)?;
        Ok(Server {
            packet_handler,
            connect_handler: self.connect_handler,
            disconnect_handler: self.disconnect_handler,
            stop_handler: self.stop_handler,
            max_packet_bytes: self.max_packet_bytes,
            handshake_timeout: self.handshake_timeout,
            heartbeat_interval: self.heartbeat_interval,
            running: Mutex::new(None),
        })
    }
}

struct RunningServer {
    connections: Arc<Mutex<HashMap<ConnId, ConnEntry>>>,
    shutdown: Arc<Notify>,
    acceptor: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

/// A listening endpoint serving any number of concurrent clients.
pub struct Server {
    packet_handler: PacketHandler<ServerConnHandle>,
    connect_handler: Option<ConnectHandler<ServerConnHandle>>,
    disconnect_handler: Option<DisconnectHandler<ServerConnHandle>>,
    stop_handler: Option<StopHandler>,
    max_packet_bytes: u32,
    handshake_timeout: Duration,
    heartbeat_interval: Duration,
    running: Mutex<Option<RunningServer>>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds and listens on `port` across all interfaces, then starts the
    /// acceptor and heartbeat tasks. Each accepted connection gets its own
    /// receive/dispatch task once its handshake succeeds.
    pub async fn start(&self, port: u16) -> Result<(), ServerError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let bind_addr: SocketAddr = lookup_host(("0.0.0.0", port))
            .await
            .map_err(ServerError::AddressResolution)?
            .next()
            .unwrap_or(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));

        let socket = new_socket_for(bind_addr).map_err(ServerError::SocketCreate)?;
        socket.bind(bind_addr).map_err(ServerError::Bind)?;
        let listener = socket.listen(LISTEN_BACKLOG).map_err(ServerError::Listen)?;
        info!(port, "server listening");

        let connections: Arc<Mutex<HashMap<ConnId, ConnEntry>>> = Arc::new(Mutex::new(HashMap::new()));
        let shutdown = Arc::new(Notify::new());
        let next_id = Arc::new(AtomicU64::new(1));

        let acceptor = tokio::spawn(accept_loop(
            listener,
            shutdown.clone(),
            connections.clone(),
            next_id,
            self.max_packet_bytes,
            self.handshake_timeout,
            Arc::clone(&self.packet_handler),
            self.connect_handler.clone(),
            self.disconnect_handler.clone(),
        ));

        let heartbeat = tokio::spawn(heartbeat_loop(
            connections.clone(),
            shutdown.clone(),
            self.heartbeat_interval,
        ));

        *running = Some(RunningServer {
            connections,
            shutdown,
            acceptor,
            heartbeat,
        });
        Ok(())
    }

    /// Idempotent. Shuts down the listening socket, stops the acceptor and
    /// heartbeat tasks, disconnects every open connection, then fires the
    /// stop callback exactly once.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let Some(server) = running.take() else {
            return;
        };

        server.shutdown.notify_waiters();
        let _ = server.acceptor.await;
        let _ = server.heartbeat.await;

        let entries: Vec<ConnEntry> = server.connections.lock().await.drain().map(|(_, e)| e).collect();
        for entry in &entries {
            let _ = entry.cmd_tx.send(ConnCommand::Close(DisconnectReason::Stop));
        }
        for entry in entries {
            let _ = entry.task.await;
        }

        if let Some(cb) = &self.stop_handler {
            cb();
        }
        debug!("server stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Closes a specific connection. Idempotent; unknown ids are silently
    /// ignored.
    pub async fn disconnect_client(&self, id: ConnId) {
        let running = self.running.lock().await;
        let Some(server) = running.as_ref() else {
            return;
        };
        let cmd_tx = server.connections.lock().await.get(&id).map(|e| e.cmd_tx.clone());
        if let Some(cmd_tx) = cmd_tx {
            let _ = cmd_tx.send(ConnCommand::Close(DisconnectReason::Stop));
        }
    }

    /// Same contract as [`crate::client::Client::send_packet`], targeted
    /// at one connection by id.
    pub async fn send_packet<P: Packet>(&self, to: ConnId, packet: &P) -> Result<(), SendError> {
        let running = self.running.lock().await;
        let server = running.as_ref().ok_or(SendError::NotConnected)?;
        let cmd_tx = server
            .connections
            .lock()
            .await
            .get(&to)
            .map(|e| e.cmd_tx.clone())
            .ok_or(SendError::UnknownConnection)?;

        let mut ser = Serializer::new();
        packet.encode(&mut ser);
        let frame = encode_frame(packet.id(), flags::FL_NONE, ser.as_bytes()).to_vec();

        cmd_tx
            .send(ConnCommand::Send(frame))
            .map_err(|_| SendError::UnknownConnection)
    }
}

#[allow(clippy::too_many_arguments)]
async fn accept_loop(
    listener: TcpListener,
    shutdown: Arc<Notify>,
    connections: Arc<Mutex<HashMap<ConnId, ConnEntry>>>,
    next_id: Arc<AtomicU64>,
    max_packet_bytes: u32,
    handshake_timeout: Duration,
    packet_handler: PacketHandler<ServerConnHandle>,
    connect_handler: Option<ConnectHandler<ServerConnHandle>>,
    disconnect_handler: Option<DisconnectHandler<ServerConnHandle>>,
) {
    loop {
        let (mut stream, _peer) = tokio::select! {
            _ = shutdown.notified() => break,
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
        };

        if !perform_server_handshake(&mut stream, handshake_timeout).await {
            debug!("inbound handshake failed, dropping connection");
            continue;
        }

        let id = ConnId(next_id.fetch_add(1, Ordering::Relaxed));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Open);
        let handle = ServerConnHandle {
            id,
            cmd_tx: cmd_tx.clone(),
            state_rx,
        };

        connections.lock().await.insert(
            id,
            ConnEntry {
                cmd_tx: cmd_tx.clone(),
                task: tokio::spawn(run_server_connection(
                    id,
                    Connection::new(stream, max_packet_bytes),
                    cmd_rx,
                    state_tx,
                    connections.clone(),
                    Arc::clone(&packet_handler),
                    disconnect_handler.clone(),
                    handle.clone(),
                )),
            },
        );

        if let Some(cb) = &connect_handler {
            cb(&handle);
        }
    }
}

async fn heartbeat_loop(
    connections: Arc<Mutex<HashMap<ConnId, ConnEntry>>>,
    shutdown: Arc<Notify>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await; // first tick fires immediately; the interval itself is the wait.

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = ticker.tick() => {
                let frame = encode_frame(ids::ID_HEARTBEAT, flags::FL_HEARTBEAT, &[]).to_vec();
                let targets: Vec<mpsc::UnboundedSender<ConnCommand>> = connections
                    .lock()
                    .await
                    .values()
                    .map(|e| e.cmd_tx.clone())
                    .collect();
                for cmd_tx in targets {
                    let _ = cmd_tx.send(ConnCommand::Send(frame.clone()));
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_server_connection(
    id: ConnId,
    mut conn: Connection,
    mut cmd_rx: mpsc::UnboundedReceiver<ConnCommand>,
    state_tx: watch::Sender<ConnectionState>,
    connections: Arc<Mutex<HashMap<ConnId, ConnEntry>>>,
    packet_handler: PacketHandler<ServerConnHandle>,
    disconnect_handler: Option<DisconnectHandler<ServerConnHandle>>,
    handle: ServerConnHandle,
) {
    let mut serializer = Serializer::new();

    let reason = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ConnCommand::Send(bytes)) => {
                        if let Err(e) = conn.write_raw(&bytes).await {
                            warn!(error = %e, "server send failed");
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

    connections.lock().await.remove(&id);
    conn.shutdown().await;
    let _ = state_tx.send(ConnectionState::Closed);
    debug!(id = id.0, %reason, "server connection closed");

    if let Some(cb) = disconnect_handler {
        cb(&handle, reason);
    }
}
