//! Demo client: connects, sends one [`ExamplePacket`], prints whatever
//! comes back, then disconnects. Illustrative wrapper, not part of the
//! library.

#[path = "packet.rs"]
mod packet;

use std::error::Error;

use argh::FromArgs;
use async_connect::{Client, Packet};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use packet::ExamplePacket;

/// Connect to a running demo server and send one example packet.
#[derive(FromArgs)]
struct CliArgs {
    /// server address to connect to
    #[argh(option, short = 'a', default = "\"127.0.0.1:9000\".to_string()")]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let client = Client::builder()
        .on_packet(|_conn, id, ser| {
            let reply = ExamplePacket::decode(ser).expect("demo packet decodes");
            info!(id, ?reply, "received packet");
        })
        .on_disconnect(|_conn, reason| info!(%reason, "disconnected"))
        .build()?;

    client.connect(&cli_args.addr).await?;
    info!(addr = %cli_args.addr, "connected");

    let packet = ExamplePacket {
        some_short: 128,
        some_array: vec![1, 2, 3, 4, 5],
        some_string_array: vec!["Hello".into(), "from".into(), "client!".into()],
    };
    client.send_packet(&packet).await?;
    info!("sent example packet");

    tokio::time::sleep(std::time::Duration::from_secs(1)).await;

    client.disconnect().await;
    Ok(())
}
