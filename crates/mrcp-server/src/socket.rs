//! TCP listener for MRCPv2 control connections.

use std::net::SocketAddr;
use std::sync::Arc;

use mrcp_protocol::{ChannelIdentifier, ChannelTable, ConnectionHandle, MrcpConnection};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::dispatcher::{ResourceHandlers, ServerChannel, unrouted_hook};
use crate::error::{ServerError, ServerResult};

/// Accepts control connections and serves the channels opened on it.
///
/// Channels are shared by every connection: a request on any connection
/// whose `Channel-Identifier` names an open channel reaches that channel's
/// handlers.
pub struct MrcpServer {
    config: ServerConfig,
    listener: TcpListener,
    connection_semaphore: Arc<Semaphore>,
    channels: ChannelTable,
}

impl MrcpServer {
    /// Binds to `config.bind_addr`. Port 0 picks a free port; see
    /// [`local_addr`](Self::local_addr).
    pub async fn bind(config: ServerConfig) -> ServerResult<Self> {
        if config.max_connections == 0 {
            return Err(ServerError::config("max_connections must be at least 1"));
        }

        let listener = TcpListener::bind(config.bind_addr).await?;
        let local = listener.local_addr()?;
        info!(addr = %local, "MRCP server listening");

        let connection_semaphore = Arc::new(Semaphore::new(config.max_connections));

        Ok(Self {
            config,
            listener,
            connection_semaphore,
            channels: ChannelTable::new(),
        })
    }

    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Opens a pre-agreed channel given as `<channel-id>@<resource-type>`.
    pub fn open_channel(
        &self,
        channel: &str,
        handlers: ResourceHandlers,
    ) -> ServerResult<ChannelIdentifier> {
        let id = ChannelIdentifier::parse(channel)
            .map_err(|err| ServerError::invalid_channel(channel, err))?;
        self.open(id, handlers)
    }

    /// Like [`open_channel`](Self::open_channel), with the parts given
    /// separately.
    pub fn open(
        &self,
        channel: ChannelIdentifier,
        handlers: ResourceHandlers,
    ) -> ServerResult<ChannelIdentifier> {
        if handlers.resource_type() != channel.resource_type() {
            return Err(ServerError::ResourceMismatch {
                channel: channel.to_string(),
                handlers: handlers.resource_type().to_string(),
            });
        }
        if self.channels.contains(channel.key()) {
            return Err(ServerError::ChannelInUse {
                channel: channel.to_string(),
            });
        }

        let sink = Arc::new(ServerChannel::new(channel.clone(), handlers));
        self.channels.register(&channel, sink);
        info!(channel = %channel, "channel opened");
        Ok(channel)
    }

    /// Closes a channel. Later requests for it are answered with `405`.
    pub fn close_channel(&self, channel_id: &str) -> bool {
        let removed = self.channels.unregister(channel_id).is_some();
        if removed {
            info!(channel = channel_id.trim(), "channel closed");
        }
        removed
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Accepts one connection and starts serving it.
    ///
    /// Waits for a connection slot when `max_connections` are in use.
    pub async fn accept(&self) -> ServerResult<ConnectionHandle> {
        let permit = self
            .connection_semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ServerError::config("connection limiter closed"))?;

        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        debug!(peer = %peer, "accepted connection");

        let handle = MrcpConnection::spawn(
            stream,
            peer.to_string(),
            self.channels.clone(),
            unrouted_hook(),
            &self.config.connection_config(),
        );

        let watcher = handle.clone();
        tokio::spawn(async move {
            watcher.closed().await;
            drop(permit);
        });

        Ok(handle)
    }

    /// Accepts connections forever. Accept errors are logged and skipped.
    pub async fn run(&self) -> ServerResult<()> {
        loop {
            if let Err(e) = self.accept().await {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }

    /// Runs the accept loop until `shutdown` completes.
    pub async fn run_until_shutdown<S>(&self, shutdown: S) -> ServerResult<()>
    where
        S: std::future::Future<Output = ()> + Send,
    {
        tokio::select! {
            result = self.run() => result,
            _ = shutdown => {
                info!("Shutdown signal received");
                Ok(())
            }
        }
    }
}
