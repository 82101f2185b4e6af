//! Example-packet round trip and in-order dispatch, driven through a real
//! client/server pair rather than the codec unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_connect::{Client, Packet, SerializeError, Serializer, Server};

#[derive(Debug, Clone, PartialEq, Eq)]
struct TestPacket {
    id: u16,
    some_short: u16,
    some_array: Vec<u8>,
    some_string_array: Vec<String>,
}

impl Packet for TestPacket {
    fn id(&self) -> u16 {
        self.id
    }

    fn encode(&self, ser: &mut Serializer) {
        ser.write_scalar(self.some_short);
        ser.write_array(&self.some_array);
        ser.write_str_array(&self.some_string_array);
    }

    fn decode(ser: &mut Serializer) -> Result<Self, SerializeError> {
        Ok(TestPacket {
            id: 0,
            some_short: ser.read_scalar()?,
            some_array: ser.read_array()?,
            some_string_array: ser.read_string_array()?,
        })
    }
}

#[tokio::test]
async fn example_packet_round_trips_over_the_wire() {
    let received: Arc<Mutex<Vec<TestPacket>>> = Arc::new(Mutex::new(Vec::new()));
    let received_cb = received.clone();

    let server = Server::builder()
        .on_packet(move |_conn, id, ser| {
            let mut pkt = TestPacket::decode(ser).unwrap();
            pkt.id = id;
            received_cb.lock().unwrap().push(pkt);
        })
        .build()
        .unwrap();
    server.start(18211).await.unwrap();

    let client = Client::builder().on_packet(|_, _, _| {}).build().unwrap();
    client.connect("127.0.0.1:18211").await.unwrap();

    let packet = TestPacket {
        id: 5,
        some_short: 128,
        some_array: vec![1, 2, 3, 4, 5],
        some_string_array: vec!["Hello".into(), "from".into(), "client!".into()],
    };
    client.send_packet(&packet).await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let received = received.lock().unwrap();
    assert_eq!(received.as_slice(), &[packet]);

    client.disconnect().await;
    server.stop().await;
}

#[tokio::test]
async fn packets_from_one_peer_dispatch_in_wire_order() {
    let order: Arc<Mutex<Vec<u16>>> = Arc::new(Mutex::new(Vec::new()));
    let order_cb = order.clone();

    let server = Server::builder()
        .on_packet(move |_conn, id, _ser| order_cb.lock().unwrap().push(id))
        .build()
        .unwrap();
    server.start(18212).await.unwrap();

    let client = Client::builder().on_packet(|_, _, _| {}).build().unwrap();
    client.connect("127.0.0.1:18212").await.unwrap();

    for id in 5..25u16 {
        let packet = TestPacket {
            id,
            some_short: id,
            some_array: vec![id as u8],
            some_string_array: vec![],
        };
        client.send_packet(&packet).await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(300)).await;

    let order = order.lock().unwrap();
    let expected: Vec<u16> = (5..25).collect();
    assert_eq!(order.as_slice(), expected.as_slice());

    client.disconnect().await;
    server.stop().await;
}

#[tokio::test]
async fn zero_byte_payload_is_accepted_and_dispatched() {
    let count = Arc::new(Mutex::new(0u32));
    let count_cb = count.clone();

    let server = Server::builder()
        .on_packet(move |_conn, _id, ser| {
            assert!(ser.is_empty());
            *count_cb.lock().unwrap() += 1;
        })
        .build()
        .unwrap();
    server.start(18213).await.unwrap();

    #[derive(Debug)]
    struct Empty;
    impl Packet for Empty {
        fn id(&self) -> u16 {
            10
        }
        fn encode(&self, _ser: &mut Serializer) {}
        fn decode(_ser: &mut Serializer) -> Result<Self, SerializeError> {
            Ok(Empty)
        }
    }

    let client = Client::builder().on_packet(|_, _, _| {}).build().unwrap();
    client.connect("127.0.0.1:18213").await.unwrap();
    client.send_packet(&Empty).await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(*count.lock().unwrap(), 1);

    client.disconnect().await;
    server.stop().await;
}
