//! A client-initiated disconnect is observed by the server as an explicit
//! disconnect packet, firing the per-client disconnect callback exactly
//! once with the correct connection id.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_connect::{Client, DisconnectReason, Server};

#[tokio::test]
async fn clean_disconnect_fires_server_callback_exactly_once() {
    let events: Arc<Mutex<Vec<DisconnectReason>>> = Arc::new(Mutex::new(Vec::new()));
    let events_cb = events.clone();
    let connected_id = Arc::new(Mutex::new(None));
    let connected_id_cb = connected_id.clone();

    let server = Server::builder()
        .on_packet(|_, _, _| {})
        .on_connect(move |conn| *connected_id_cb.lock().unwrap() = Some(conn.id()))
        .on_disconnect(move |conn, reason| {
            assert_eq!(Some(conn.id()), *connected_id.lock().unwrap());
            events_cb.lock().unwrap().push(reason);
        })
        .build()
        .unwrap();
    server.start(18231).await.unwrap();

    let client = Client::builder().on_packet(|_, _, _| {}).build().unwrap();
    client.connect("127.0.0.1:18231").await.unwrap();

    client.disconnect().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0], DisconnectReason::PeerDisconnected);

    server.stop().await;
}

#[tokio::test]
async fn repeated_local_disconnect_calls_are_idempotent() {
    let server = Server::builder().on_packet(|_, _, _| {}).build().unwrap();
    server.start(18232).await.unwrap();

    let client = Client::builder().on_packet(|_, _, _| {}).build().unwrap();
    client.connect("127.0.0.1:18232").await.unwrap();

    client.disconnect().await;
    client.disconnect().await;
    client.disconnect().await;

    assert!(!client.is_connected().await);

    server.stop().await;
}
