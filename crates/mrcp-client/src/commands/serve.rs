//! Serve command: runs the demo server in the foreground until SIGTERM/SIGINT.

use std::net::SocketAddr;

use tracing::info;

use mrcp_protocol::ChannelIdentifier;
use mrcp_server::{MrcpServer, ServerConfig, ShutdownHandle, demo_handlers};

use crate::error::{ClientError, ClientResult};

pub async fn run(bind: SocketAddr, channels: &[String], max_connections: usize) -> ClientResult<()> {
    let config = ServerConfig::new(bind).with_max_connections(max_connections);
    let server = MrcpServer::bind(config).await?;

    for channel in channels {
        let id = ChannelIdentifier::parse(channel)
            .map_err(|e| ClientError::Usage(format!("invalid channel {channel:?}: {e}")))?;
        let resource = id.resource_type();
        server.open(id, demo_handlers(resource))?;
    }

    let addr = server.local_addr()?;
    println!("listening on {addr} with {} channel(s)", server.channel_count());

    let shutdown = ShutdownHandle::new();
    shutdown.listen_for_signals();
    server.run_until_shutdown(shutdown.wait()).await?;

    info!("Server stopped");
    Ok(())
}
