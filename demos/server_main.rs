//! Demo server: accepts connections, echoes every [`ExamplePacket`] it
//! receives back to the sender, and logs connects/disconnects/stop.
//! Illustrative wrapper, not part of the library.

#[path = "packet.rs"]
mod packet;

use std::error::Error;
use std::sync::{Arc, OnceLock};

use argh::FromArgs;
use async_connect::{Packet, Server};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use packet::ExamplePacket;

/// Run a demo server that echoes example packets back to their sender.
#[derive(FromArgs)]
struct CliArgs {
    /// port to listen on
    #[argh(option, short = 'p', default = "9000")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    // The echo handler needs to call back into the `Server` it's registered
    // on, but the builder runs before that `Server` exists. This cell is
    // populated right after `build()` so the closure can reach it.
    let server_cell: Arc<OnceLock<Server>> = Arc::new(OnceLock::new());
    let echo_cell = server_cell.clone();

    let server = Server::builder()
        .on_connect(|conn| info!(id = ?conn.id(), "client connected"))
        .on_disconnect(|conn, reason| info!(id = ?conn.id(), %reason, "client disconnected"))
        .on_stop(|| info!("server stopped"))
        .on_packet(move |conn, id, ser| {
            let received = ExamplePacket::decode(ser).expect("demo packet decodes");
            info!(id, client = ?conn.id(), ?received, "received packet, echoing back");

            let server_cell = echo_cell.clone();
            let to = conn.id();
            tokio::spawn(async move {
                if let Some(server) = server_cell.get() {
                    if let Err(e) = server.send_packet(to, &received).await {
                        info!(client = ?to, error = %e, "echo send failed");
                    }
                }
            });
        })
        .build()?;

    server.start(cli_args.port).await?;
    info!(port = cli_args.port, "server listening");
    server_cell.set(server).ok().expect("server cell set exactly once");

    tokio::signal::ctrl_c().await?;
    server_cell.get().expect("server already set").stop().await;
    Ok(())
}
