//! Handshake success and handshake mismatch, from both the client's and
//! the server's point of view.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_connect::header::{flags, ids, Header, HEADER_SIZE};
use async_connect::{Client, ClientError, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[tokio::test]
async fn handshake_success_both_sides_report_open() {
    let server = Server::builder().on_packet(|_, _, _| {}).build().unwrap();
    server.start(18201).await.unwrap();

    let client = Client::builder().on_packet(|_, _, _| {}).build().unwrap();
    client.connect("127.0.0.1:18201").await.unwrap();

    assert!(client.is_connected().await);
    assert!(server.is_running().await);

    client.disconnect().await;
    server.stop().await;
}

#[tokio::test]
async fn client_rejects_server_with_wrong_handshake_flags() {
    // A bare listener standing in for a misbehaving server: it reads the
    // client's hello, then replies with the wrong flag bit.
    let listener = TcpListener::bind("127.0.0.1:18202").await.unwrap();
    let fake_server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut hello = [0u8; HEADER_SIZE];
        stream.read_exact(&mut hello).await.unwrap();

        let bad_reply = Header::header_only(ids::ID_HANDSHAKE, flags::FL_HEARTBEAT);
        stream.write_all(&bad_reply.to_bytes()).await.unwrap();
    });

    let client = Client::builder().on_packet(|_, _, _| {}).build().unwrap();
    let result = client.connect("127.0.0.1:18202").await;

    assert!(matches!(result, Err(ClientError::HandshakeFailed)));
    assert!(!client.is_connected().await);
    fake_server.await.unwrap();
}

#[tokio::test]
async fn server_silently_drops_client_with_wrong_handshake_flags() {
    let connected = Arc::new(AtomicBool::new(false));
    let connected_cb = connected.clone();

    let server = Server::builder()
        .on_packet(|_, _, _| {})
        .on_connect(move |_| connected_cb.store(true, Ordering::SeqCst))
        .build()
        .unwrap();
    server.start(18203).await.unwrap();

    let mut stream = TcpStream::connect("127.0.0.1:18203").await.unwrap();
    let mut server_hello = [0u8; HEADER_SIZE];
    stream.read_exact(&mut server_hello).await.unwrap();

    // Reply with the server's own flag instead of the client's.
    let bad_reply = Header::header_only(ids::ID_HANDSHAKE, flags::FL_HANDSHAKE_SERVER);
    stream.write_all(&bad_reply.to_bytes()).await.unwrap();

    // Give the acceptor a moment to evaluate and drop the socket.
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(!connected.load(Ordering::SeqCst));

    // The socket should now be closed from the server's side.
    let mut buf = [0u8; 1];
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(n, 0);

    server.stop().await;
}
